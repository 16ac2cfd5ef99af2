//! Normalization over malformed documents

use ontask_document::{keys, Block, Data, Inline, InlineKind, Node, Text};
use ontask_editor::{
    is_normalized, normalize, validate, BlockKind, Document, Editor, EditorConfig, NodeType, Path, Point,
    RuleContext, Selection, Transaction, Value,
};

const MAX_PASSES: usize = 10_000;

fn normalized(doc: Document) -> Document {
    let mut tx = Transaction::new(Value::new(doc));
    normalize(&mut tx, MAX_PASSES).unwrap();
    tx.into_parts().0.document
}

fn condition(id: &str, nodes: Vec<Node>) -> Node {
    let data = Data::new().with(keys::CONDITION_ID, id).with(keys::RULE_ID, "r");
    Block::with_nodes(BlockKind::Condition, nodes).with_data(data).into()
}

fn rule(nodes: Vec<Node>) -> Node {
    Block::with_nodes(BlockKind::Rule, nodes).with_data(Data::new().with(keys::RULE_ID, "r")).into()
}

fn list(kind: BlockKind, nodes: Vec<Node>) -> Node {
    Block::with_nodes(kind, nodes).into()
}

fn item(text: &str) -> Node {
    Block::text_block(BlockKind::ListItem, text).into()
}

fn paragraph(text: &str) -> Node {
    Block::paragraph(text).into()
}

fn is_branch(node: &Node) -> bool {
    matches!(node.block_kind(), Some(BlockKind::Rule | BlockKind::Condition))
}

/// Neither the document nor any condition starts or ends with a rule or a
/// condition.
fn assert_boundaries(doc: &Document) {
    let mut containers = vec![doc.nodes.as_slice()];
    for (_, node) in doc.descendants() {
        if node.block_kind() == Some(BlockKind::Condition) {
            containers.push(node.children().unwrap_or(&[]));
        }
    }
    for children in containers {
        let first = children.first().expect("container is never empty");
        let last = children.last().expect("container is never empty");
        assert!(!is_branch(first), "branch at start of {:?}", children);
        assert!(!is_branch(last), "branch at end of {:?}", children);
    }
}

fn adversarial() -> Vec<Document> {
    vec![
        Document::new(vec![]),
        Document::new(vec![rule(vec![])]),
        Document::new(vec![rule(vec![paragraph("stray"), condition("c1", vec![])])]),
        Document::new(vec![rule(vec![condition("c1", vec![Text::new("loose").into()])])]),
        Document::new(vec![condition("c1", vec![rule(vec![condition("c2", vec![paragraph("deep")])])])]),
        Document::new(vec![item("orphan"), list(BlockKind::BulletedList, vec![paragraph("p")])]),
        Document::new(vec![list(
            BlockKind::NumberedList,
            vec![item("a"), list(BlockKind::BulletedList, vec![]), Text::new("t").into()],
        )]),
        Document::new(vec![Block::with_nodes(
            BlockKind::Paragraph,
            vec![Text::new("x").into(), list(BlockKind::BulletedList, vec![item("inner")])],
        )
        .into()]),
        Document::new(vec![Block::with_nodes(BlockKind::HeadingOne, vec![]).into()]),
        Document::new(vec![Block::with_nodes(
            BlockKind::Paragraph,
            vec![
                Text::new("a").into(),
                Text::new("b").into(),
                Inline::with_nodes(InlineKind::Attribute, Data::new().with(keys::FIELD, "f"), vec![Text::new("g").into()])
                    .into(),
            ],
        )
        .into()]),
    ]
}

#[test]
fn test_normalization_reaches_a_valid_document() {
    for doc in adversarial() {
        let before = format!("{:?}", doc);
        let doc = normalized(doc);
        assert!(validate(&doc).is_empty(), "violations left for {}: {:?}", before, validate(&doc));
        assert!(is_normalized(&doc), "not normalized: {}", before);
        assert_boundaries(&doc);
    }
}

#[test]
fn test_normalization_is_idempotent() {
    for doc in adversarial() {
        let once = normalized(doc);
        let mut tx = Transaction::new(Value::new(once.clone()));
        assert_eq!(normalize(&mut tx, MAX_PASSES).unwrap(), 0);
        assert_eq!(tx.document(), &once);
    }
}

#[test]
fn test_list_items_always_have_a_list_parent() {
    for doc in adversarial() {
        let doc = normalized(doc);
        for (path, node) in doc.descendants() {
            if node.block_kind() != Some(BlockKind::ListItem) {
                continue;
            }
            let parent = path.parent().and_then(|parent| doc.block_kind(&parent));
            assert!(parent.is_some_and(BlockKind::is_list), "list item at {} outside a list", path);
        }
    }
}

#[test]
fn test_rules_end_with_catch_all() {
    for doc in adversarial() {
        let doc = normalized(doc);
        for (path, node) in doc.descendants() {
            if node.block_kind() != Some(BlockKind::Rule) {
                continue;
            }
            let children = node.children().unwrap();
            assert!(!children.is_empty(), "empty rule at {}", path);
            assert!(children.iter().all(|child| child.block_kind() == Some(BlockKind::Condition)));
            let last = children.last().and_then(Node::data);
            assert_eq!(last.and_then(|data| data.get(keys::LABEL)), Some("else"), "rule at {}", path);
        }
    }
}

#[test]
fn test_normalization_keeps_text() {
    let doc = normalized(Document::new(vec![rule(vec![paragraph("stray"), condition("c1", vec![])])]));
    assert!(doc.plain_text().contains("stray"));

    let doc = normalized(Document::new(vec![rule(vec![condition("c1", vec![Text::new("loose").into()])])]));
    assert!(doc.plain_text().contains("loose"));
}

#[test]
fn test_edited_token_is_removed() {
    let mut editor = Editor::load("<p>Hi <attribute>name</attribute></p>", EditorConfig::default(), RuleContext::default());
    editor.select(Selection::collapsed(Point::new([0, 1, 0], 2)));
    editor.type_text("x");

    let doc = editor.document();
    assert!(doc.descendants().iter().all(|(_, node)| !node.is_inline()));
    assert!(!doc.plain_text().contains("name"));
}

#[test]
fn test_untouched_tokens_survive_edits_around_them() {
    let mut editor = Editor::load("<p>Hi <attribute>name</attribute></p>", EditorConfig::default(), RuleContext::default());
    editor.select(Selection::collapsed(Point::new([0, 0], 3)));
    editor.type_text("there ");

    let token = editor.document().node(&Path::from([0, 1])).and_then(Node::as_inline).expect("token");
    assert_eq!(token.data.get(keys::FIELD), Some("name"));
    assert_eq!(editor.serialize(), "<p>Hi there <attribute>name</attribute></p>");
}

#[test]
fn test_schema_reports_parent_of_violation() {
    let doc = Document::new(vec![paragraph("a"), item("b"), paragraph("c")]);
    let violations = validate(&doc);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].path, Path::from([1]));
    assert_eq!(violations[0].node, NodeType::Block(BlockKind::ListItem));
}
