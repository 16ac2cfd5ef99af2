//! Editor value: the document plus the selection.
//!
//! The read-only queries the toolbar and the keyboard handlers need live
//! here so they can run against a committed value without a transaction.

use ontask_document::{BlockKind, Document, Mark, MarkKind, Node, NodeType, Path, Text};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A position inside a text node, in characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: impl Into<Path>, offset: usize) -> Self {
        Self { path: path.into(), offset }
    }

    /// Document order. Text paths never nest, so comparing paths first is enough.
    pub fn compare(&self, other: &Point) -> Ordering {
        self.path.cmp(&other.path).then(self.offset.cmp(&other.offset))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
    /// Marks applied to the next inserted text, set by toggling a mark on a
    /// collapsed selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<Mark>>,
}

impl Selection {
    pub fn collapsed(point: Point) -> Self {
        Self { anchor: point.clone(), focus: point, marks: None }
    }

    pub fn range(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus, marks: None }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_backward(&self) -> bool {
        self.anchor.compare(&self.focus) == Ordering::Greater
    }

    pub fn start(&self) -> &Point {
        if self.is_backward() {
            &self.focus
        } else {
            &self.anchor
        }
    }

    pub fn end(&self) -> &Point {
        if self.is_backward() {
            &self.anchor
        } else {
            &self.focus
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Value {
    pub document: Document,
    pub selection: Selection,
}

impl Value {
    /// A value with the cursor at the start of the first text.
    pub fn new(document: Document) -> Self {
        let point = document
            .first_text(&Path::root())
            .map(|path| Point { path, offset: 0 })
            .unwrap_or_default();
        Self { document, selection: Selection::collapsed(point) }
    }

    pub fn text(&self, path: &Path) -> Option<&Text> {
        self.document.node(path).and_then(Node::as_text)
    }

    pub fn text_len(&self, path: &Path) -> usize {
        self.text(path).map(Text::len).unwrap_or(0)
    }

    pub fn anchor_block(&self) -> Option<Path> {
        self.document.closest_block(&self.selection.anchor.path)
    }

    pub fn anchor_block_kind(&self) -> Option<BlockKind> {
        self.anchor_block().and_then(|path| self.document.block_kind(&path))
    }

    /// Parent of the block holding the cursor, if it is a block.
    pub fn parent_block(&self) -> Option<Path> {
        let parent = self.anchor_block()?.parent()?;
        self.document.block_kind(&parent).map(|_| parent)
    }

    /// Type of the node that contains the anchor block.
    pub fn parent_type(&self) -> Option<NodeType> {
        let parent = self.anchor_block()?.parent()?;
        self.document.node_type(&parent)
    }

    pub fn parent_kind(&self) -> Option<BlockKind> {
        self.parent_block().and_then(|path| self.document.block_kind(&path))
    }

    /// Leaf blocks touched by the selection, in document order.
    pub fn selected_blocks(&self) -> Vec<Path> {
        let (Some(first), Some(last)) = (
            self.document.closest_block(&self.selection.start().path),
            self.document.closest_block(&self.selection.end().path),
        ) else {
            return Vec::new();
        };
        self.document
            .leaf_block_paths()
            .into_iter()
            .filter(|path| *path >= first && *path <= last)
            .collect()
    }

    /// Text nodes touched by the selection, in document order.
    pub fn selected_texts(&self) -> Vec<Path> {
        let start = &self.selection.start().path;
        let end = &self.selection.end().path;
        self.document
            .text_paths()
            .into_iter()
            .filter(|path| path >= start && path <= end)
            .collect()
    }

    pub fn has_block(&self, kind: BlockKind) -> bool {
        self.selected_blocks()
            .iter()
            .any(|path| self.document.block_kind(path) == Some(kind))
    }

    /// Marks in effect at the selection: pending marks, the marks of the
    /// text at the cursor, or the marks every selected non-empty text shares.
    pub fn active_marks(&self) -> Vec<Mark> {
        if let Some(marks) = &self.selection.marks {
            return marks.clone();
        }
        if self.selection.is_collapsed() {
            return self
                .text(&self.selection.anchor.path)
                .map(|text| text.marks.clone())
                .unwrap_or_default();
        }

        let texts: Vec<&Text> = self
            .selected_texts()
            .iter()
            .filter_map(|path| self.text(path))
            .filter(|text| !text.is_empty())
            .collect();
        let Some((first, rest)) = texts.split_first() else {
            return Vec::new();
        };
        first
            .marks
            .iter()
            .filter(|mark| rest.iter().all(|text| text.marks.contains(mark)))
            .cloned()
            .collect()
    }

    pub fn has_mark(&self, kind: MarkKind) -> bool {
        self.active_marks().iter().any(|mark| mark.kind == kind)
    }

    /// Character offset of `point` from the start of its block.
    pub fn offset_in_block(&self, point: &Point) -> usize {
        let Some(block) = self.document.closest_block(&point.path) else {
            return point.offset;
        };
        let before: usize = self
            .document
            .text_paths()
            .iter()
            .filter(|path| path.starts_with(&block) && **path < point.path)
            .map(|path| self.text_len(path))
            .sum();
        before + point.offset
    }

    /// Text of the block holding `point`, up to the point.
    pub fn text_before(&self, point: &Point) -> String {
        let Some(block) = self.document.closest_block(&point.path) else {
            return String::new();
        };
        let mut out = String::new();
        for path in self.document.text_paths() {
            if !path.starts_with(&block) || path > point.path {
                continue;
            }
            if let Some(text) = self.text(&path) {
                if path == point.path {
                    out.extend(text.text.chars().take(point.offset));
                } else {
                    out.push_str(&text.text);
                }
            }
        }
        out
    }

    /// The point `offset` characters into `block`, clamped to its end.
    pub fn point_in_block(&self, block: &Path, offset: usize) -> Option<Point> {
        let mut remaining = offset;
        let mut last = None;
        for path in self.document.text_paths() {
            if !path.starts_with(block) {
                continue;
            }
            let len = self.text_len(&path);
            if remaining <= len {
                return Some(Point { path, offset: remaining });
            }
            remaining -= len;
            last = Some(Point { path, offset: len });
        }
        last
    }

    /// Slate's previous node: the previous sibling, or the previous sibling
    /// of the nearest ancestor that has one.
    pub fn previous_node(&self, path: &Path) -> Option<Path> {
        let mut current = path.clone();
        loop {
            if let Some(previous) = current.previous() {
                return Some(previous);
            }
            current = current.parent()?;
            if current.is_root() {
                return None;
            }
        }
    }

    pub fn next_node(&self, path: &Path) -> Option<Path> {
        let mut current = path.clone();
        loop {
            let next = current.next()?;
            let parent = current.parent()?;
            let siblings = self.document.children(&parent).map(<[Node]>::len).unwrap_or(0);
            if next.last().unwrap_or(0) < siblings {
                return Some(next);
            }
            current = parent;
            if current.is_root() {
                return None;
            }
        }
    }

    /// Leaf block before/after `block` in document order.
    pub fn previous_leaf_block(&self, block: &Path) -> Option<Path> {
        self.document.leaf_block_paths().into_iter().rev().find(|path| path < block)
    }

    pub fn next_leaf_block(&self, block: &Path) -> Option<Path> {
        self.document
            .leaf_block_paths()
            .into_iter()
            .find(|path| path > block && !path.starts_with(block))
    }
}
