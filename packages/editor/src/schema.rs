//! Declarative structural schema.
//!
//! Each [`SchemaRule`] states what a node type may contain, what must open
//! and close it, what may contain it, and how the normalizer repairs a
//! violation. [`validate`] evaluates the table against a document; it has no
//! per-type logic of its own.

use ontask_document::{keys, BlockKind, Document, InlineKind, Node, NodeType, Path};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label carried by the catch-all branch of a rule.
pub const CATCH_ALL_LABEL: &str = "else";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCode {
    ChildTypeInvalid,
    FirstChildTypeInvalid,
    LastChildTypeInvalid,
    ParentTypeInvalid,
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViolationCode::ChildTypeInvalid => "child_type_invalid",
            ViolationCode::FirstChildTypeInvalid => "first_child_type_invalid",
            ViolationCode::LastChildTypeInvalid => "last_child_type_invalid",
            ViolationCode::ParentTypeInvalid => "parent_type_invalid",
        })
    }
}

/// A schema violation found by [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub code: ViolationCode,
    /// The node whose rule was broken.
    pub path: Path,
    /// The offending child, for child and boundary violations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub node: NodeType,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.code, self.path, self.message)
    }
}

/// Which children satisfy a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildMatch {
    Types(&'static [NodeType]),
    /// A condition labelled as the catch-all branch.
    CatchAll,
}

impl ChildMatch {
    pub fn matches(&self, node: &Node) -> bool {
        match self {
            ChildMatch::Types(types) => types.contains(&node.node_type()),
            ChildMatch::CatchAll => is_catch_all(node),
        }
    }

    fn describe(&self) -> String {
        match self {
            ChildMatch::Types(types) => types.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "),
            ChildMatch::CatchAll => format!("condition labelled \"{}\"", CATCH_ALL_LABEL),
        }
    }
}

/// Repair for an invalid child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildRepair {
    /// Wrap the child in a new block of this kind at the same index.
    Wrap(BlockKind),
    /// Move the child out, right after its parent.
    Hoist,
}

/// Repair for a missing or invalid first/last child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryRepair {
    InsertParagraph,
    /// Move the existing catch-all branch last, or append a new one.
    CatchAllLast,
}

/// Repair for a node inside the wrong parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRepair {
    Retype(BlockKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairPolicy {
    pub child: ChildRepair,
    pub boundary: BoundaryRepair,
    pub parent: ParentRepair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaRule {
    pub node: NodeType,
    pub allowed_children: Option<ChildMatch>,
    pub first_allowed: Option<ChildMatch>,
    pub last_allowed: Option<ChildMatch>,
    pub allowed_parents: Option<&'static [NodeType]>,
    pub repair: RepairPolicy,
}

const fn block(kind: BlockKind) -> NodeType {
    NodeType::Block(kind)
}

/// Every block type.
pub const BLOCKS: &[NodeType] = &[
    block(BlockKind::Paragraph),
    block(BlockKind::HeadingOne),
    block(BlockKind::HeadingTwo),
    block(BlockKind::ListItem),
    block(BlockKind::BulletedList),
    block(BlockKind::NumberedList),
    block(BlockKind::Code),
    block(BlockKind::Rule),
    block(BlockKind::Condition),
];

/// Types allowed to open and close the document and every condition.
pub const CONTENT: &[NodeType] = &[
    block(BlockKind::Paragraph),
    block(BlockKind::ListItem),
    block(BlockKind::BulletedList),
    block(BlockKind::NumberedList),
    block(BlockKind::Code),
    block(BlockKind::HeadingOne),
    block(BlockKind::HeadingTwo),
    NodeType::Inline(InlineKind::Hyperlink),
    NodeType::Inline(InlineKind::Link),
    NodeType::Inline(InlineKind::Image),
    NodeType::Inline(InlineKind::Attribute),
];

const LIST_CHILDREN: &[NodeType] = &[
    block(BlockKind::ListItem),
    block(BlockKind::BulletedList),
    block(BlockKind::NumberedList),
];

const LISTS: &[NodeType] = &[block(BlockKind::BulletedList), block(BlockKind::NumberedList)];

const CONTAINER_REPAIR: RepairPolicy = RepairPolicy {
    child: ChildRepair::Wrap(BlockKind::Paragraph),
    boundary: BoundaryRepair::InsertParagraph,
    parent: ParentRepair::Retype(BlockKind::Paragraph),
};

const LIST_REPAIR: RepairPolicy = RepairPolicy {
    child: ChildRepair::Wrap(BlockKind::ListItem),
    boundary: BoundaryRepair::InsertParagraph,
    parent: ParentRepair::Retype(BlockKind::Paragraph),
};

pub static SCHEMA: &[SchemaRule] = &[
    SchemaRule {
        node: NodeType::Document,
        allowed_children: Some(ChildMatch::Types(BLOCKS)),
        first_allowed: Some(ChildMatch::Types(CONTENT)),
        last_allowed: Some(ChildMatch::Types(CONTENT)),
        allowed_parents: None,
        repair: CONTAINER_REPAIR,
    },
    SchemaRule {
        node: block(BlockKind::Condition),
        allowed_children: Some(ChildMatch::Types(BLOCKS)),
        first_allowed: Some(ChildMatch::Types(CONTENT)),
        last_allowed: Some(ChildMatch::Types(CONTENT)),
        allowed_parents: None,
        repair: CONTAINER_REPAIR,
    },
    SchemaRule {
        node: block(BlockKind::Rule),
        allowed_children: Some(ChildMatch::Types(&[block(BlockKind::Condition)])),
        first_allowed: None,
        last_allowed: Some(ChildMatch::CatchAll),
        allowed_parents: None,
        repair: RepairPolicy {
            child: ChildRepair::Hoist,
            boundary: BoundaryRepair::CatchAllLast,
            parent: ParentRepair::Retype(BlockKind::Paragraph),
        },
    },
    SchemaRule {
        node: block(BlockKind::BulletedList),
        allowed_children: Some(ChildMatch::Types(LIST_CHILDREN)),
        first_allowed: None,
        last_allowed: None,
        allowed_parents: None,
        repair: LIST_REPAIR,
    },
    SchemaRule {
        node: block(BlockKind::NumberedList),
        allowed_children: Some(ChildMatch::Types(LIST_CHILDREN)),
        first_allowed: None,
        last_allowed: None,
        allowed_parents: None,
        repair: LIST_REPAIR,
    },
    SchemaRule {
        node: block(BlockKind::ListItem),
        allowed_children: None,
        first_allowed: None,
        last_allowed: None,
        allowed_parents: Some(LISTS),
        repair: LIST_REPAIR,
    },
];

pub fn rule_for(node: NodeType) -> Option<&'static SchemaRule> {
    SCHEMA.iter().find(|rule| rule.node == node)
}

pub fn is_catch_all(node: &Node) -> bool {
    node.block_kind() == Some(BlockKind::Condition)
        && node.data().and_then(|data| data.get(keys::LABEL)) == Some(CATCH_ALL_LABEL)
}

/// Every schema violation in `doc`, in document order.
pub fn validate(doc: &Document) -> Vec<Violation> {
    let mut violations = Vec::new();
    check_children(NodeType::Document, &Path::root(), &doc.nodes, &mut violations);

    for (path, node) in doc.descendants() {
        let node_type = node.node_type();
        if let Some(children) = node.children() {
            check_children(node_type, &path, children, &mut violations);
        }
        check_parent(doc, node_type, &path, &mut violations);
    }
    violations
}

fn check_children(node: NodeType, path: &Path, children: &[Node], out: &mut Vec<Violation>) {
    let Some(rule) = rule_for(node) else {
        return;
    };
    let violation = |code, index: Option<usize>, message: String| Violation {
        code,
        path: path.clone(),
        index,
        node,
        message,
    };

    if let Some(allowed) = rule.allowed_children {
        for (index, child) in children.iter().enumerate() {
            if !allowed.matches(child) {
                out.push(violation(
                    ViolationCode::ChildTypeInvalid,
                    Some(index),
                    format!("{} cannot contain {}", node, child.node_type()),
                ));
            }
        }
    }

    if let Some(first) = rule.first_allowed {
        if !children.first().map(|child| first.matches(child)).unwrap_or(false) {
            out.push(violation(
                ViolationCode::FirstChildTypeInvalid,
                Some(0),
                format!("{} must start with {}", node, first.describe()),
            ));
        }
    }

    if let Some(last) = rule.last_allowed {
        if !children.last().map(|child| last.matches(child)).unwrap_or(false) {
            out.push(violation(
                ViolationCode::LastChildTypeInvalid,
                Some(children.len().saturating_sub(1)),
                format!("{} must end with {}", node, last.describe()),
            ));
        }
    }
}

fn check_parent(doc: &Document, node: NodeType, path: &Path, out: &mut Vec<Violation>) {
    let Some(allowed) = rule_for(node).and_then(|rule| rule.allowed_parents) else {
        return;
    };
    let Some(parent) = path.parent().and_then(|parent| doc.node_type(&parent)) else {
        return;
    };
    if !allowed.contains(&parent) {
        out.push(Violation {
            code: ViolationCode::ParentTypeInvalid,
            path: path.clone(),
            index: None,
            node,
            message: format!("{} cannot be placed in {}", node, parent),
        });
    }
}
