//! Normalizer.
//!
//! Repairs one problem per pass until none remain:
//!
//! 1. Core shape: blocks inside text-holding nodes are unwrapped, empty rules
//!    and lists removed, void inlines emptied, and text layout restored
//!    (see [`ontask_document::layout`]).
//! 2. Attribute tokens whose text no longer matches their field are removed.
//! 3. The first [`schema`](crate::schema) violation is repaired with its
//!    rule's policy.
//!
//! Every repair is an ordinary operation on the transaction, so it is undone
//! together with the edit that caused it.

use crate::errors::{OpResult, OperationError};
use crate::schema::{self, BoundaryRepair, ChildRepair, ParentRepair, Violation, ViolationCode, CATCH_ALL_LABEL};
use crate::transaction::Transaction;
use ontask_document::layout::{find_layout_issue, LayoutIssue};
use ontask_document::{keys, Block, BlockKind, Data, Document, InlineKind, Node, Path, Text};
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
enum Issue {
    /// A block inside a text-holding node; its children take its place.
    NestedBlock(Path),
    /// An empty rule or list.
    EmptyContainer(Path),
    VoidWithChildren(Path),
    Layout(Path, LayoutIssue),
    BrokenToken(Path),
    Schema(Violation),
}

/// Repair `tx` until it is valid or `max_passes` repairs have been made.
/// Returns the number of repairs.
#[instrument(skip(tx), fields(ops = tx.operations().len()))]
pub fn normalize(tx: &mut Transaction, max_passes: usize) -> OpResult<usize> {
    let mut passes = 0;
    while let Some(issue) = find_issue(tx.document()) {
        if passes >= max_passes {
            warn!(passes, ?issue, "Normalization pass limit reached; document left unrepaired");
            break;
        }
        debug!(?issue, "Repairing");
        repair(tx, issue)?;
        passes += 1;
    }
    if passes > 0 {
        debug!(passes, "Normalized document");
    }
    Ok(passes)
}

/// True when the document needs no repair.
pub fn is_normalized(doc: &Document) -> bool {
    find_issue(doc).is_none()
}

fn holds_text(node: &Node) -> bool {
    match node {
        Node::Block(block) => !block.kind.holds_blocks(),
        Node::Inline(inline) => !inline.kind.is_void(),
        Node::Text(_) => false,
    }
}

fn find_issue(doc: &Document) -> Option<Issue> {
    let descendants = doc.descendants();

    for (path, node) in &descendants {
        let Some(children) = node.children() else {
            continue;
        };
        if holds_text(node) {
            if let Some(index) = children.iter().position(Node::is_block) {
                return Some(Issue::NestedBlock(path.child(index)));
            }
            if let Some(issue) = find_layout_issue(children) {
                return Some(Issue::Layout(path.clone(), issue));
            }
        }
        match node {
            Node::Block(block) if children.is_empty() && (block.kind.is_list() || block.kind == BlockKind::Rule) => {
                return Some(Issue::EmptyContainer(path.clone()));
            }
            Node::Inline(inline) if inline.kind.is_void() && !children.is_empty() => {
                return Some(Issue::VoidWithChildren(path.clone()));
            }
            _ => {}
        }
    }

    for (path, node) in &descendants {
        if let Node::Inline(inline) = node {
            if inline.kind == InlineKind::Attribute && node.text_content() != inline.data.get(keys::FIELD).unwrap_or("") {
                return Some(Issue::BrokenToken(path.clone()));
            }
        }
    }

    schema::validate(doc).into_iter().next().map(Issue::Schema)
}

fn repair(tx: &mut Transaction, issue: Issue) -> OpResult {
    match issue {
        Issue::NestedBlock(path) => unwrap_node(tx, path),
        Issue::EmptyContainer(path) | Issue::BrokenToken(path) => tx.remove_node(path),
        Issue::VoidWithChildren(path) => {
            for _ in 0..tx.child_count(&path) {
                tx.remove_node(path.child(0))?;
            }
            Ok(())
        }
        Issue::Layout(parent, issue) => match issue {
            LayoutIssue::MissingText(index) => tx.insert_node(parent.child(index), Text::default()),
            LayoutIssue::MergeTexts(index) => tx.merge_node(parent.child(index)),
            LayoutIssue::RedundantText(index) => tx.remove_node(parent.child(index)),
        },
        Issue::Schema(violation) => repair_violation(tx, violation),
    }
}

/// Replace the node at `path` with its children.
fn unwrap_node(tx: &mut Transaction, path: Path) -> OpResult {
    let target = tx.path_ref(path);
    loop {
        let path = tx.resolve(target)?;
        if tx.child_count(&path) == 0 {
            return tx.remove_node(path);
        }
        tx.move_node(path.child(0), path)?;
    }
}

fn repair_violation(tx: &mut Transaction, violation: Violation) -> OpResult {
    let rule = schema::rule_for(violation.node).ok_or_else(|| OperationError::NodeNotFound(violation.path.clone()))?;
    let path = violation.path;

    match violation.code {
        ViolationCode::ChildTypeInvalid => {
            let index = violation.index.unwrap_or(0);
            let child = path.child(index);
            match rule.repair.child {
                ChildRepair::Wrap(kind) => {
                    tx.insert_node(child.clone(), Block::new(kind))?;
                    tx.move_node(path.child(index + 1), child.child(0))
                }
                ChildRepair::Hoist => {
                    let after = path.next().ok_or_else(|| OperationError::ParentNotFound(path.clone()))?;
                    tx.move_node(child, after)
                }
            }
        }
        ViolationCode::FirstChildTypeInvalid => repair_boundary(tx, rule.repair.boundary, path, 0),
        ViolationCode::LastChildTypeInvalid => {
            let end = tx.child_count(&path);
            repair_boundary(tx, rule.repair.boundary, path, end)
        }
        ViolationCode::ParentTypeInvalid => match rule.repair.parent {
            ParentRepair::Retype(kind) => tx.set_block_kind(path, kind),
        },
    }
}

fn repair_boundary(tx: &mut Transaction, policy: BoundaryRepair, path: Path, at: usize) -> OpResult {
    match policy {
        BoundaryRepair::InsertParagraph => tx.insert_node(path.child(at), Block::empty_paragraph()),
        BoundaryRepair::CatchAllLast => {
            let children = tx.document().children(&path).unwrap_or(&[]);
            let count = children.len();
            let existing = children.iter().position(schema::is_catch_all);
            if let Some(index) = existing {
                return tx.move_node(path.child(index), path.child(count - 1));
            }

            let rule_id = tx
                .document()
                .node(&path)
                .and_then(Node::data)
                .and_then(|data| data.get(keys::RULE_ID))
                .map(str::to_string);
            let data = Data::new()
                .with_opt(keys::RULE_ID, rule_id)
                .with(keys::LABEL, CATCH_ALL_LABEL);
            let branch = Block::with_nodes(BlockKind::Condition, vec![Block::empty_paragraph().into()]).with_data(data);
            tx.insert_node(path.child(count), branch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use ontask_document::{deserialize, Inline};

    const PASSES: usize = 10_000;

    fn normalized(doc: Document) -> Document {
        let mut tx = Transaction::new(Value::new(doc));
        normalize(&mut tx, PASSES).unwrap();
        tx.document().clone()
    }

    #[test]
    fn test_empty_document_gets_a_paragraph() {
        assert_eq!(normalized(Document::new(Vec::new())), Document::empty());
    }

    #[test]
    fn test_rule_at_edges_gets_paragraphs() {
        let doc = normalized(deserialize(
            "<rule ruleid=\"r\"><condition conditionid=\"c\" label=\"else\"><p>x</p></condition></rule>",
        ));
        assert_eq!(doc.nodes.len(), 3);
        assert_eq!(doc.nodes[0], Block::empty_paragraph().into());
        assert_eq!(doc.nodes[1].block_kind(), Some(BlockKind::Rule));
        assert_eq!(doc.nodes[2], Block::empty_paragraph().into());
    }

    #[test]
    fn test_list_item_outside_list_becomes_paragraph() {
        let doc = normalized(deserialize("<p>a</p><li>b</li>"));
        assert_eq!(doc.nodes[1], Block::paragraph("b").into());
    }

    #[test]
    fn test_broken_token_is_removed() {
        let token = Inline::with_nodes(
            InlineKind::Attribute,
            Data::new().with(keys::FIELD, "name"),
            vec![Node::text("nam")],
        );
        let paragraph = Block::with_nodes(
            BlockKind::Paragraph,
            vec![Node::text("Hi "), token.into(), Node::text("")],
        );
        let doc = normalized(Document::new(vec![paragraph.into()]));
        assert_eq!(doc.nodes[0], Block::paragraph("Hi ").into());
    }

    #[test]
    fn test_intact_token_survives() {
        let doc = deserialize("<p>Hello <attribute>name</attribute></p>");
        assert_eq!(normalized(doc.clone()), doc);
    }

    #[test]
    fn test_missing_catch_all_is_appended() {
        let doc = normalized(deserialize(
            "<p></p><rule ruleid=\"r1\"><condition conditionid=\"c1\"><p>x</p></condition></rule><p></p>",
        ));
        let rule = doc.nodes[1].children().unwrap();
        assert_eq!(rule.len(), 2);
        let branch = rule[1].data().unwrap();
        assert_eq!(branch.get(keys::LABEL), Some(CATCH_ALL_LABEL));
        assert_eq!(branch.get(keys::RULE_ID), Some("r1"));
        assert_eq!(rule[1].children().unwrap(), &[Block::empty_paragraph().into()]);
    }

    #[test]
    fn test_catch_all_is_moved_last() {
        let doc = normalized(deserialize(
            "<p></p><rule ruleid=\"r\"><condition conditionid=\"e\" label=\"else\"><p>e</p></condition>\
             <condition conditionid=\"c\"><p>c</p></condition></rule><p></p>",
        ));
        let rule = doc.nodes[1].children().unwrap();
        assert_eq!(rule.len(), 2);
        assert_eq!(rule[0].data().unwrap().get(keys::CONDITION_ID), Some("c"));
        assert!(schema::is_catch_all(&rule[1]));
    }

    #[test]
    fn test_stray_rule_child_is_hoisted() {
        let doc = normalized(deserialize(
            "<p></p><rule ruleid=\"r\"><p>stray</p><condition label=\"else\"><p>e</p></condition></rule><p></p>",
        ));
        assert_eq!(doc.nodes.len(), 4);
        assert_eq!(doc.nodes[2], Block::paragraph("stray").into());
    }

    #[test]
    fn test_nested_block_is_unwrapped() {
        let paragraph = Block::with_nodes(
            BlockKind::Paragraph,
            vec![Node::text("a"), Block::paragraph("b").into()],
        );
        let doc = normalized(Document::new(vec![paragraph.into()]));
        assert_eq!(doc.nodes[0], Block::paragraph("ab").into());
    }

    #[test]
    fn test_list_children_are_wrapped_in_items() {
        let list = Block::with_nodes(BlockKind::BulletedList, vec![Block::paragraph("a").into()]);
        let doc = normalized(Document::new(vec![list.into()]));
        let items = doc.nodes[0].children().unwrap();
        assert_eq!(items, &[Block::text_block(BlockKind::ListItem, "a").into()]);
    }

    #[test]
    fn test_empty_containers_are_removed() {
        let doc = normalized(Document::new(vec![
            Block::paragraph("a").into(),
            Block::new(BlockKind::NumberedList).into(),
            Block::new(BlockKind::Rule).into(),
        ]));
        assert_eq!(doc, Document::new(vec![Block::paragraph("a").into()]));
    }

    #[test]
    fn test_pass_limit_stops_early() {
        let mut tx = Transaction::new(Value::new(Document::new(vec![Block::new(BlockKind::Condition).into()])));
        assert_eq!(normalize(&mut tx, 1), Ok(1));
        assert!(!is_normalized(tx.document()));
    }
}
