//! # Operations
//!
//! The primitive, invertible edits every transform is made of.
//!
//! ## Semantics
//!
//! - Paths are evaluated against the tree the operation is applied to.
//! - `MoveNode::new_path` is evaluated after the node has been removed.
//! - `SplitNode` keeps the left half at `path` and creates the right half at
//!   `path.next()` with `properties`; `MergeNode` is its inverse and folds the
//!   node at `path` into its previous sibling, `position` being the previous
//!   sibling's length before the merge.
//! - Text offsets count characters.
//!
//! Each operation also knows how to move a path or point so that the
//! selection and tracked references follow the edit.

use crate::errors::{OpResult, OperationError};
use crate::value::Point;
use ontask_document::{Block, BlockKind, Data, Document, Inline, InlineKind, Mark, Node, Path, Text};
use serde::{Deserialize, Serialize};

/// The part of a node that `set_node` and `split_node` carry: everything but
/// its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "object", rename_all = "lowercase")]
pub enum Properties {
    Block { kind: BlockKind, data: Data },
    Inline { kind: InlineKind, data: Data },
    Text { marks: Vec<Mark> },
}

impl Properties {
    pub fn of(node: &Node) -> Self {
        match node {
            Node::Block(block) => Properties::Block { kind: block.kind, data: block.data.clone() },
            Node::Inline(inline) => Properties::Inline { kind: inline.kind, data: inline.data.clone() },
            Node::Text(text) => Properties::Text { marks: text.marks.clone() },
        }
    }

    /// A node with these properties and the given content.
    fn build(&self, children: Vec<Node>, text: String) -> Node {
        match self {
            Properties::Block { kind, data } => Block::with_nodes(*kind, children).with_data(data.clone()).into(),
            Properties::Inline { kind, data } => Inline::with_nodes(*kind, data.clone(), children).into(),
            Properties::Text { marks } => Text::with_marks(text, marks.clone()).into(),
        }
    }

    fn assign(&self, node: &mut Node, path: &Path) -> OpResult {
        match (self, node) {
            (Properties::Block { kind, data }, Node::Block(block)) => {
                block.kind = *kind;
                block.data = data.clone();
            }
            (Properties::Inline { kind, data }, Node::Inline(inline)) => {
                inline.kind = *kind;
                inline.data = data.clone();
            }
            (Properties::Text { marks }, Node::Text(text)) => {
                text.marks = marks.clone();
            }
            _ => return Err(OperationError::PropertiesMismatch(path.clone())),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    InsertNode { path: Path, node: Node },
    RemoveNode { path: Path, node: Node },
    InsertText { path: Path, offset: usize, text: String },
    RemoveText { path: Path, offset: usize, text: String },
    SetNode { path: Path, properties: Properties, previous: Properties },
    SplitNode { path: Path, position: usize, properties: Properties },
    MergeNode { path: Path, position: usize, properties: Properties },
    MoveNode { path: Path, new_path: Path },
}

impl Operation {
    pub fn path(&self) -> &Path {
        match self {
            Operation::InsertNode { path, .. }
            | Operation::RemoveNode { path, .. }
            | Operation::InsertText { path, .. }
            | Operation::RemoveText { path, .. }
            | Operation::SetNode { path, .. }
            | Operation::SplitNode { path, .. }
            | Operation::MergeNode { path, .. }
            | Operation::MoveNode { path, .. } => path,
        }
    }

    /// Apply to `doc`. On error the document is left as it was.
    pub fn apply(&self, doc: &mut Document) -> OpResult {
        match self {
            Operation::InsertNode { path, node } => {
                let (children, index, parent) = slot(doc, path)?;
                if index > children.len() {
                    return Err(OperationError::IndexOutOfBounds { parent, index });
                }
                children.insert(index, node.clone());
                Ok(())
            }

            Operation::RemoveNode { path, .. } => {
                detach(doc, path)?;
                Ok(())
            }

            Operation::InsertText { path, offset, text } => {
                let target = text_mut(doc, path)?;
                if *offset > target.len() {
                    return Err(OperationError::OffsetOutOfBounds { path: path.clone(), offset: *offset });
                }
                target.insert(*offset, text);
                Ok(())
            }

            Operation::RemoveText { path, offset, text } => {
                let target = text_mut(doc, path)?;
                let len = text.chars().count();
                if offset + len > target.len() {
                    return Err(OperationError::OffsetOutOfBounds { path: path.clone(), offset: offset + len });
                }
                target.remove(*offset, len);
                Ok(())
            }

            Operation::SetNode { path, properties, .. } => {
                let node = doc.node_mut(path).ok_or_else(|| OperationError::NodeNotFound(path.clone()))?;
                properties.assign(node, path)
            }

            Operation::SplitNode { path, position, properties } => Self::apply_split(doc, path, *position, properties),

            Operation::MergeNode { path, position, .. } => Self::apply_merge(doc, path, *position),

            Operation::MoveNode { path, new_path } => {
                let node = detach(doc, path)?;
                let inserted = match slot(doc, new_path) {
                    Ok((children, index, _)) if index <= children.len() => {
                        children.insert(index, node.clone());
                        true
                    }
                    _ => false,
                };
                if inserted {
                    return Ok(());
                }
                // Put the node back where it came from.
                let (children, index, _) = slot(doc, path)?;
                children.insert(index.min(children.len()), node);
                Err(OperationError::ParentNotFound(new_path.clone()))
            }
        }
    }

    fn apply_split(doc: &mut Document, path: &Path, position: usize, properties: &Properties) -> OpResult {
        let node = doc.node_mut(path).ok_or_else(|| OperationError::NodeNotFound(path.clone()))?;
        let right = match node {
            Node::Text(text) => {
                if position > text.len() {
                    return Err(OperationError::OffsetOutOfBounds { path: path.clone(), offset: position });
                }
                properties.build(Vec::new(), text.split_off(position))
            }
            Node::Block(Block { nodes, .. }) | Node::Inline(Inline { nodes, .. }) => {
                if position > nodes.len() {
                    return Err(OperationError::IndexOutOfBounds { parent: path.clone(), index: position });
                }
                properties.build(nodes.split_off(position), String::new())
            }
        };
        let (children, index, _) = slot(doc, path)?;
        children.insert(index + 1, right);
        Ok(())
    }

    fn apply_merge(doc: &mut Document, path: &Path, position: usize) -> OpResult {
        let (children, index, _) = slot(doc, path)?;
        if index == 0 || index >= children.len() {
            return Err(OperationError::CannotMerge(path.clone()));
        }
        let compatible = match (&children[index - 1], &children[index]) {
            (Node::Text(before), Node::Text(_)) => before.len() == position,
            (Node::Block(before), Node::Block(_)) => before.nodes.len() == position,
            (Node::Inline(before), Node::Inline(_)) => before.nodes.len() == position,
            _ => false,
        };
        if !compatible {
            return Err(OperationError::CannotMerge(path.clone()));
        }

        let node = children.remove(index);
        match (&mut children[index - 1], node) {
            (Node::Text(before), Node::Text(after)) => before.text.push_str(&after.text),
            (Node::Block(before), Node::Block(after)) => before.nodes.extend(after.nodes),
            (Node::Inline(before), Node::Inline(after)) => before.nodes.extend(after.nodes),
            _ => return Err(OperationError::CannotMerge(path.clone())),
        }
        Ok(())
    }

    /// The operation that undoes this one.
    pub fn inverse(&self) -> Operation {
        match self.clone() {
            Operation::InsertNode { path, node } => Operation::RemoveNode { path, node },
            Operation::RemoveNode { path, node } => Operation::InsertNode { path, node },
            Operation::InsertText { path, offset, text } => Operation::RemoveText { path, offset, text },
            Operation::RemoveText { path, offset, text } => Operation::InsertText { path, offset, text },
            Operation::SetNode { path, properties, previous } => {
                Operation::SetNode { path, properties: previous, previous: properties }
            }
            Operation::SplitNode { path, position, properties } => Operation::MergeNode {
                path: path.next().unwrap_or_else(|| path.clone()),
                position,
                properties,
            },
            Operation::MergeNode { path, position, properties } => Operation::SplitNode {
                path: path.previous().unwrap_or_else(|| path.clone()),
                position,
                properties,
            },
            Operation::MoveNode { path, new_path } => Operation::MoveNode { path: new_path, new_path: path },
        }
    }

    /// Where a node at `path` ends up after this operation, `None` if it was
    /// removed.
    pub fn transform_path(&self, path: &Path) -> Option<Path> {
        match self {
            Operation::InsertText { .. } | Operation::RemoveText { .. } | Operation::SetNode { .. } => {
                Some(path.clone())
            }
            Operation::InsertNode { path: at, .. } => Some(after_insert(path, at)),
            Operation::RemoveNode { path: at, .. } => after_remove(path, at),
            Operation::SplitNode { path: at, position, .. } => Some(after_split(path, at, *position)),
            Operation::MergeNode { path: at, position, .. } => Some(after_merge(path, at, *position)),
            Operation::MoveNode { path: from, new_path: to } => {
                if path.starts_with(from) {
                    return Some(path.rebase(from, to));
                }
                after_remove(path, from).map(|path| after_insert(&path, to))
            }
        }
    }

    /// Where a point ends up after this operation, `None` if its text was
    /// removed.
    pub fn transform_point(&self, point: &Point) -> Option<Point> {
        match self {
            Operation::InsertText { path, offset, text } if point.path == *path && point.offset >= *offset => {
                Some(Point { path: path.clone(), offset: point.offset + text.chars().count() })
            }
            Operation::RemoveText { path, offset, text } if point.path == *path && point.offset > *offset => {
                let len = text.chars().count();
                Some(Point { path: path.clone(), offset: point.offset.saturating_sub(len).max(*offset) })
            }
            Operation::SplitNode { path, position, .. } if point.path == *path => {
                if point.offset >= *position {
                    let next = path.next()?;
                    Some(Point { path: next, offset: point.offset - position })
                } else {
                    Some(point.clone())
                }
            }
            Operation::MergeNode { path, position, .. } if point.path == *path => {
                let previous = path.previous()?;
                Some(Point { path: previous, offset: point.offset + position })
            }
            _ => self
                .transform_path(&point.path)
                .map(|path| Point { path, offset: point.offset }),
        }
    }
}

/// Children of the parent of `path`, the index within them, and the parent path.
fn slot<'a>(doc: &'a mut Document, path: &Path) -> OpResult<(&'a mut Vec<Node>, usize, Path)> {
    let parent = path.parent().ok_or_else(|| OperationError::ParentNotFound(path.clone()))?;
    let index = path.last().unwrap_or(0);
    let children = doc
        .children_mut(&parent)
        .ok_or_else(|| OperationError::ParentNotFound(parent.clone()))?;
    Ok((children, index, parent))
}

fn detach(doc: &mut Document, path: &Path) -> OpResult<Node> {
    let (children, index, _) = slot(doc, path)?;
    if index >= children.len() {
        return Err(OperationError::NodeNotFound(path.clone()));
    }
    Ok(children.remove(index))
}

fn text_mut<'a>(doc: &'a mut Document, path: &Path) -> OpResult<&'a mut Text> {
    doc.node_mut(path)
        .ok_or_else(|| OperationError::NodeNotFound(path.clone()))?
        .as_text_mut()
        .ok_or_else(|| OperationError::NotText(path.clone()))
}

/// True when `path` lies under the parent of `at` (or is a sibling of it).
fn shares_parent(path: &Path, at: &Path) -> bool {
    let depth = at.len() - 1;
    path.len() > depth && path.indices()[..depth] == at.indices()[..depth]
}

fn after_insert(path: &Path, at: &Path) -> Path {
    if at.is_root() || !shares_parent(path, at) {
        return path.clone();
    }
    let depth = at.len() - 1;
    let index = path.indices()[depth];
    if index >= at.indices()[depth] {
        path.with_index(depth, index + 1)
    } else {
        path.clone()
    }
}

fn after_remove(path: &Path, at: &Path) -> Option<Path> {
    if path.starts_with(at) {
        return None;
    }
    if at.is_root() || !shares_parent(path, at) {
        return Some(path.clone());
    }
    let depth = at.len() - 1;
    let index = path.indices()[depth];
    if index > at.indices()[depth] {
        Some(path.with_index(depth, index - 1))
    } else {
        Some(path.clone())
    }
}

fn after_split(path: &Path, at: &Path, position: usize) -> Path {
    if at.is_root() {
        return path.clone();
    }
    let depth = at.len() - 1;
    let at_index = at.indices()[depth];
    if at.is_ancestor_of(path) {
        let child = path.indices()[depth + 1];
        if child >= position {
            return path.with_index(depth, at_index + 1).with_index(depth + 1, child - position);
        }
        return path.clone();
    }
    if shares_parent(path, at) && path.indices()[depth] > at_index {
        return path.with_index(depth, path.indices()[depth] + 1);
    }
    path.clone()
}

fn after_merge(path: &Path, at: &Path, position: usize) -> Path {
    if at.is_root() {
        return path.clone();
    }
    let depth = at.len() - 1;
    let at_index = at.indices()[depth];
    if at_index == 0 {
        return path.clone();
    }
    if path == at {
        return path.with_index(depth, at_index - 1);
    }
    if at.is_ancestor_of(path) {
        let child = path.indices()[depth + 1];
        return path.with_index(depth, at_index - 1).with_index(depth + 1, child + position);
    }
    if shares_parent(path, at) && path.indices()[depth] > at_index {
        return path.with_index(depth, path.indices()[depth] - 1);
    }
    path.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new(vec![
            Block::paragraph("one").into(),
            Block::with_nodes(
                BlockKind::BulletedList,
                vec![
                    Block::text_block(BlockKind::ListItem, "a").into(),
                    Block::text_block(BlockKind::ListItem, "b").into(),
                ],
            )
            .into(),
        ])
    }

    fn assert_inverse_restores(op: Operation) {
        let original = doc();
        let mut edited = original.clone();
        op.apply(&mut edited).unwrap();
        assert_ne!(edited, original, "{:?} changed nothing", op);
        op.inverse().apply(&mut edited).unwrap();
        assert_eq!(edited, original, "inverse of {:?}", op);
    }

    #[test]
    fn test_inverses_restore_the_document() {
        assert_inverse_restores(Operation::InsertText { path: Path::from([0, 0]), offset: 1, text: "xy".into() });
        assert_inverse_restores(Operation::RemoveText { path: Path::from([0, 0]), offset: 0, text: "on".into() });
        assert_inverse_restores(Operation::InsertNode { path: Path::from([1]), node: Block::paragraph("new").into() });
        assert_inverse_restores(Operation::RemoveNode { path: Path::from([1, 0]), node: Block::text_block(BlockKind::ListItem, "a").into() });
        assert_inverse_restores(Operation::SplitNode {
            path: Path::from([0, 0]),
            position: 1,
            properties: Properties::Text { marks: vec![] },
        });
        assert_inverse_restores(Operation::SplitNode {
            path: Path::from([1]),
            position: 1,
            properties: Properties::Block { kind: BlockKind::BulletedList, data: Data::new() },
        });
        assert_inverse_restores(Operation::MoveNode { path: Path::from([1, 1]), new_path: Path::from([0]) });
        assert_inverse_restores(Operation::SetNode {
            path: Path::from([0]),
            properties: Properties::Block { kind: BlockKind::HeadingOne, data: Data::new() },
            previous: Properties::Block { kind: BlockKind::Paragraph, data: Data::new() },
        });
    }

    #[test]
    fn test_merge_folds_into_previous_sibling() {
        let mut doc = doc();
        Operation::MergeNode {
            path: Path::from([1, 1]),
            position: 1,
            properties: Properties::Block { kind: BlockKind::ListItem, data: Data::new() },
        }
        .apply(&mut doc)
        .unwrap();
        let list = doc.node(&Path::from([1])).unwrap();
        assert_eq!(list.children().unwrap().len(), 1);
        assert_eq!(list.text_content(), "ab");
    }

    #[test]
    fn test_merge_rejects_wrong_position() {
        let mut doc = doc();
        let err = Operation::MergeNode {
            path: Path::from([1, 1]),
            position: 5,
            properties: Properties::Block { kind: BlockKind::ListItem, data: Data::new() },
        }
        .apply(&mut doc)
        .unwrap_err();
        assert_eq!(err, OperationError::CannotMerge(Path::from([1, 1])));
    }

    #[test]
    fn test_failed_move_leaves_document_intact() {
        let mut doc = doc();
        let before = doc.clone();
        let result = Operation::MoveNode { path: Path::from([0]), new_path: Path::from([7, 0]) }.apply(&mut doc);
        assert!(result.is_err());
        assert_eq!(doc, before);
    }

    #[test]
    fn test_path_transforms() {
        let insert = Operation::InsertNode { path: Path::from([1, 0]), node: Node::text("") };
        assert_eq!(insert.transform_path(&Path::from([1, 0, 0])), Some(Path::from([1, 1, 0])));
        assert_eq!(insert.transform_path(&Path::from([0, 0])), Some(Path::from([0, 0])));

        let remove = Operation::RemoveNode { path: Path::from([1]), node: Node::text("") };
        assert_eq!(remove.transform_path(&Path::from([1, 0])), None);
        assert_eq!(remove.transform_path(&Path::from([2, 3])), Some(Path::from([1, 3])));

        let split = Operation::SplitNode {
            path: Path::from([1]),
            position: 1,
            properties: Properties::Block { kind: BlockKind::BulletedList, data: Data::new() },
        };
        assert_eq!(split.transform_path(&Path::from([1, 1, 0])), Some(Path::from([2, 0, 0])));
        assert_eq!(split.transform_path(&Path::from([1, 0, 0])), Some(Path::from([1, 0, 0])));
        assert_eq!(split.transform_path(&Path::from([2])), Some(Path::from([3])));

        let merge = split.inverse();
        assert_eq!(merge.transform_path(&Path::from([2, 0, 0])), Some(Path::from([1, 1, 0])));

        // The list moves up to [0] once the paragraph is detached.
        let mv = Operation::MoveNode { path: Path::from([0]), new_path: Path::from([0, 0]) };
        assert_eq!(mv.transform_path(&Path::from([0, 0])), Some(Path::from([0, 0, 0])));
        assert_eq!(mv.transform_path(&Path::from([1, 0])), Some(Path::from([0, 1])));
    }

    #[test]
    fn test_point_transforms() {
        let point = Point::new([0, 0], 2);
        let insert = Operation::InsertText { path: Path::from([0, 0]), offset: 2, text: "abc".into() };
        assert_eq!(insert.transform_point(&point), Some(Point::new([0, 0], 5)));

        let remove = Operation::RemoveText { path: Path::from([0, 0]), offset: 0, text: "one".into() };
        assert_eq!(remove.transform_point(&point), Some(Point::new([0, 0], 0)));

        let split = Operation::SplitNode { path: Path::from([0, 0]), position: 1, properties: Properties::Text { marks: vec![] } };
        assert_eq!(split.transform_point(&point), Some(Point::new([0, 1], 1)));
        assert_eq!(split.inverse().transform_point(&Point::new([0, 1], 1)), Some(point));
    }
}
