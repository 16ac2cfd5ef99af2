//! A change in progress.
//!
//! A [`Transaction`] owns a working copy of the value and records every
//! operation applied to it. The selection and any tracked references are
//! moved through each operation as it is applied, so transforms can keep
//! addressing nodes by path while the tree changes under them.

use crate::errors::{OpResult, OperationError};
use crate::operation::{Operation, Properties};
use crate::value::{Point, Selection, Value};
use ontask_document::{Document, Mark, Node, Path};

/// Handle to a path tracked across operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathRef(usize);

/// Handle to a point tracked across operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointRef(usize);

#[derive(Debug, Clone)]
pub struct Transaction {
    value: Value,
    operations: Vec<Operation>,
    paths: Vec<Option<Path>>,
    points: Vec<Option<Point>>,
}

impl Transaction {
    pub fn new(value: Value) -> Self {
        Self { value, operations: Vec::new(), paths: Vec::new(), points: Vec::new() }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn document(&self) -> &Document {
        &self.value.document
    }

    pub fn selection(&self) -> &Selection {
        &self.value.selection
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn into_parts(self) -> (Value, Vec<Operation>) {
        (self.value, self.operations)
    }

    /// Apply one operation, moving the selection and references with it.
    pub fn apply(&mut self, op: Operation) -> OpResult {
        let selection = self.relocate_selection(&op);
        op.apply(&mut self.value.document)?;

        let marks = selection.marks.clone();
        self.value.selection = Selection {
            anchor: op.transform_point(&selection.anchor).unwrap_or_default(),
            focus: op.transform_point(&selection.focus).unwrap_or_default(),
            marks,
        };
        for path in self.paths.iter_mut() {
            *path = path.as_ref().and_then(|path| op.transform_path(path));
        }
        for point in self.points.iter_mut() {
            *point = point.as_ref().and_then(|point| op.transform_point(point));
        }
        self.operations.push(op);
        Ok(())
    }

    /// Before a node is removed, points inside it move to the nearest text
    /// outside it: the end of the previous text, else the start of the next.
    fn relocate_selection(&self, op: &Operation) -> Selection {
        let mut selection = self.value.selection.clone();
        let Operation::RemoveNode { path: removed, .. } = op else {
            return selection;
        };
        for point in [&mut selection.anchor, &mut selection.focus] {
            if point.path.starts_with(removed) {
                *point = self.point_outside(removed);
            }
        }
        selection
    }

    fn point_outside(&self, removed: &Path) -> Point {
        let texts = self.value.document.text_paths();
        if let Some(path) = texts.iter().rev().find(|path| *path < removed && !path.starts_with(removed)) {
            return Point { path: path.clone(), offset: self.value.text_len(path) };
        }
        texts
            .into_iter()
            .find(|path| path > removed && !path.starts_with(removed))
            .map(|path| Point { path, offset: 0 })
            .unwrap_or_default()
    }

    pub fn select(&mut self, selection: Selection) {
        self.value.selection = selection;
    }

    pub fn collapse_to(&mut self, point: Point) {
        self.value.selection = Selection::collapsed(point);
    }

    pub fn set_pending_marks(&mut self, marks: Option<Vec<Mark>>) {
        self.value.selection.marks = marks;
    }

    /// Put the selection back onto existing text if edits left it dangling.
    pub fn fix_selection(&mut self) {
        let marks = self.value.selection.marks.take();
        let anchor = self.valid_point(&self.value.selection.anchor);
        let focus = self.valid_point(&self.value.selection.focus);
        self.value.selection = Selection { anchor, focus, marks };
    }

    fn valid_point(&self, point: &Point) -> Point {
        if let Some(text) = self.value.text(&point.path) {
            return Point { path: point.path.clone(), offset: point.offset.min(text.len()) };
        }
        let texts = self.value.document.text_paths();
        let path = texts
            .iter()
            .rev()
            .find(|path| **path <= point.path)
            .or_else(|| texts.first())
            .cloned()
            .unwrap_or_default();
        let offset = if path < point.path { self.value.text_len(&path) } else { 0 };
        Point { path, offset }
    }

    pub fn path_ref(&mut self, path: Path) -> PathRef {
        self.paths.push(Some(path));
        PathRef(self.paths.len() - 1)
    }

    pub fn point_ref(&mut self, point: Point) -> PointRef {
        self.points.push(Some(point));
        PointRef(self.points.len() - 1)
    }

    pub fn resolve(&self, path_ref: PathRef) -> OpResult<Path> {
        self.paths
            .get(path_ref.0)
            .cloned()
            .flatten()
            .ok_or(OperationError::DanglingReference)
    }

    pub fn resolve_point(&self, point_ref: PointRef) -> OpResult<Point> {
        self.points
            .get(point_ref.0)
            .cloned()
            .flatten()
            .ok_or(OperationError::DanglingReference)
    }

    // Primitive helpers. Each reads what the operation needs to be
    // invertible from the current tree.

    fn node_at(&self, path: &Path) -> OpResult<&Node> {
        self.value
            .document
            .node(path)
            .ok_or_else(|| OperationError::NodeNotFound(path.clone()))
    }

    pub fn child_count(&self, path: &Path) -> usize {
        self.value.document.children(path).map(<[Node]>::len).unwrap_or(0)
    }

    pub fn insert_node(&mut self, path: Path, node: impl Into<Node>) -> OpResult {
        self.apply(Operation::InsertNode { path, node: node.into() })
    }

    pub fn remove_node(&mut self, path: Path) -> OpResult {
        let node = self.node_at(&path)?.clone();
        self.apply(Operation::RemoveNode { path, node })
    }

    pub fn insert_text_at(&mut self, path: Path, offset: usize, text: &str) -> OpResult {
        if text.is_empty() {
            return Ok(());
        }
        self.apply(Operation::InsertText { path, offset, text: text.to_string() })
    }

    pub fn remove_text_at(&mut self, path: Path, offset: usize, len: usize) -> OpResult {
        if len == 0 {
            return Ok(());
        }
        let text = self
            .node_at(&path)?
            .as_text()
            .ok_or_else(|| OperationError::NotText(path.clone()))?
            .slice(offset, len);
        self.apply(Operation::RemoveText { path, offset, text })
    }

    pub fn set_node(&mut self, path: Path, properties: Properties) -> OpResult {
        let previous = Properties::of(self.node_at(&path)?);
        if previous == properties {
            return Ok(());
        }
        self.apply(Operation::SetNode { path, properties, previous })
    }

    pub fn split_node(&mut self, path: Path, position: usize) -> OpResult {
        let properties = Properties::of(self.node_at(&path)?);
        self.apply(Operation::SplitNode { path, position, properties })
    }

    /// Merge the node at `path` into its previous sibling.
    pub fn merge_node(&mut self, path: Path) -> OpResult {
        let properties = Properties::of(self.node_at(&path)?);
        let previous = path.previous().ok_or_else(|| OperationError::CannotMerge(path.clone()))?;
        let position = self.node_at(&previous)?.length();
        self.apply(Operation::MergeNode { path, position, properties })
    }

    pub fn move_node(&mut self, path: Path, new_path: Path) -> OpResult {
        if path == new_path {
            return Ok(());
        }
        self.apply(Operation::MoveNode { path, new_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontask_document::{Block, BlockKind};

    fn transaction() -> Transaction {
        let doc = Document::new(vec![Block::paragraph("one").into(), Block::paragraph("two").into()]);
        let mut tx = Transaction::new(Value::new(doc));
        tx.collapse_to(Point::new([1, 0], 2));
        tx
    }

    #[test]
    fn test_selection_follows_insert() {
        let mut tx = transaction();
        tx.insert_node(Path::from([0]), Block::paragraph("zero")).unwrap();
        assert_eq!(tx.selection().anchor, Point::new([2, 0], 2));
        assert_eq!(tx.operations().len(), 1);
    }

    #[test]
    fn test_removing_the_cursor_block_moves_to_previous_text() {
        let mut tx = transaction();
        tx.remove_node(Path::from([1])).unwrap();
        assert_eq!(tx.selection().anchor, Point::new([0, 0], 3));
    }

    #[test]
    fn test_path_refs_track_and_drop() {
        let mut tx = transaction();
        let second = tx.path_ref(Path::from([1]));
        let first = tx.path_ref(Path::from([0]));
        tx.remove_node(Path::from([0])).unwrap();
        assert_eq!(tx.resolve(second), Ok(Path::from([0])));
        assert_eq!(tx.resolve(first), Err(OperationError::DanglingReference));
    }

    #[test]
    fn test_fix_selection_clamps_offsets() {
        let mut tx = transaction();
        tx.select(Selection::collapsed(Point::new([1, 0], 40)));
        tx.fix_selection();
        assert_eq!(tx.selection().anchor, Point::new([1, 0], 3));

        tx.select(Selection::collapsed(Point::new([9], 0)));
        tx.fix_selection();
        assert_eq!(tx.selection().anchor, Point::new([1, 0], 3));
    }

    #[test]
    fn test_split_and_merge_helpers() {
        let mut tx = transaction();
        tx.split_node(Path::from([1, 0]), 1).unwrap();
        tx.split_node(Path::from([1]), 1).unwrap();
        assert_eq!(tx.document().nodes.len(), 3);
        assert_eq!(tx.selection().anchor, Point::new([2, 0], 1));
        tx.merge_node(Path::from([2])).unwrap();
        tx.merge_node(Path::from([1, 1])).unwrap();
        assert_eq!(tx.document().nodes[1], Block::paragraph("two").into());
        assert_eq!(tx.selection().anchor, Point::new([1, 0], 2));
        assert_eq!(tx.document().block_kind(&Path::from([1])), Some(BlockKind::Paragraph));
    }
}
