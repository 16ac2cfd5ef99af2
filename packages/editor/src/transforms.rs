//! Transform Layer.
//!
//! Editing commands built from primitive operations. Every command works on
//! the transaction's selection and leaves structural cleanup (empty texts,
//! emptied containers, schema repairs) to the normalizer, which the
//! controller runs once the command returns.

use crate::errors::{OpResult, OperationError};
use crate::operation::Properties;
use crate::transaction::{PathRef, Transaction};
use crate::value::{Point, Selection};
use ontask_document::{Block, BlockKind, Data, Inline, InlineKind, Node, Path, Text};
use tracing::debug;

impl Transaction {
    fn anchor(&self) -> Point {
        self.selection().anchor.clone()
    }

    fn block_of(&self, path: &Path) -> OpResult<Path> {
        self.document()
            .closest_block(path)
            .ok_or_else(|| OperationError::NodeNotFound(path.clone()))
    }

    fn next_of(path: &Path) -> OpResult<Path> {
        path.next().ok_or_else(|| OperationError::ParentNotFound(path.clone()))
    }

    fn is_void_inline(&self, path: &Path) -> bool {
        matches!(self.document().node(path), Some(Node::Inline(inline)) if inline.kind.is_void())
    }

    fn ensure_collapsed(&mut self) -> OpResult {
        if self.selection().is_collapsed() {
            Ok(())
        } else {
            self.delete_selection()
        }
    }

    /// Insert text at the cursor, replacing any selected content. Pending
    /// marks put the text into its own run.
    pub fn insert_text(&mut self, text: &str) -> OpResult {
        if text.is_empty() {
            return Ok(());
        }
        self.ensure_collapsed()?;
        let point = self.anchor();
        let current = self
            .value()
            .text(&point.path)
            .map(|text| text.marks.clone())
            .ok_or_else(|| OperationError::NotText(point.path.clone()))?;

        match self.selection().marks.clone() {
            Some(marks) if marks != current => {
                self.split_node(point.path.clone(), point.offset)?;
                self.insert_node(Self::next_of(&point.path)?, Text::with_marks(text, marks))?;
            }
            _ => self.insert_text_at(point.path, point.offset, text)?,
        }
        self.set_pending_marks(None);
        Ok(())
    }

    pub fn delete_backward(&mut self, count: usize) -> OpResult {
        if !self.selection().is_collapsed() {
            return self.delete_selection();
        }
        for _ in 0..count {
            self.delete_char_backward()?;
        }
        Ok(())
    }

    pub fn delete_forward(&mut self, count: usize) -> OpResult {
        if !self.selection().is_collapsed() {
            return self.delete_selection();
        }
        for _ in 0..count {
            self.delete_char_forward()?;
        }
        Ok(())
    }

    fn delete_char_backward(&mut self) -> OpResult {
        let point = self.anchor();
        if point.offset > 0 {
            return self.remove_text_at(point.path, point.offset - 1, 1);
        }
        if let Some(previous) = point.path.previous() {
            if self.is_void_inline(&previous) {
                return self.remove_node(previous);
            }
        }

        let block = self.block_of(&point.path)?;
        let texts = self.document().text_paths();
        let before = texts
            .iter()
            .rev()
            .filter(|path| **path < point.path)
            .take_while(|path| path.starts_with(&block));
        for path in before {
            let len = self.value().text_len(path);
            if len > 0 {
                return self.remove_text_at(path.clone(), len - 1, 1);
            }
        }

        match self.value().previous_leaf_block(&block) {
            Some(previous) => self.merge_blocks(previous, block),
            None => Ok(()),
        }
    }

    fn delete_char_forward(&mut self) -> OpResult {
        let point = self.anchor();
        if point.offset < self.value().text_len(&point.path) {
            return self.remove_text_at(point.path, point.offset, 1);
        }
        if let Some(next) = point.path.next() {
            if self.is_void_inline(&next) {
                return self.remove_node(next);
            }
        }

        let block = self.block_of(&point.path)?;
        let texts = self.document().text_paths();
        let after = texts
            .iter()
            .filter(|path| **path > point.path)
            .take_while(|path| path.starts_with(&block));
        for path in after {
            if self.value().text_len(path) > 0 {
                return self.remove_text_at(path.clone(), 0, 1);
            }
        }

        match self.value().next_leaf_block(&block) {
            Some(next) => self.merge_blocks(block, next),
            None => Ok(()),
        }
    }

    /// Move the content of `source` to the end of `target`, then remove
    /// `source` and any ancestors it leaves empty. A condition is never
    /// removed this way; the normalizer refills it.
    pub fn merge_blocks(&mut self, target: Path, source: Path) -> OpResult {
        let target_ref = self.path_ref(target);
        let source_ref = self.path_ref(source);

        let count = self.child_count(&self.resolve(source_ref)?);
        for _ in 0..count {
            let source = self.resolve(source_ref)?;
            let target = self.resolve(target_ref)?;
            let end = self.child_count(&target);
            self.move_node(source.child(0), target.child(end))?;
        }

        let mut current = self.resolve(source_ref)?;
        loop {
            let parent = current.parent();
            self.remove_node(current)?;
            match parent {
                Some(parent)
                    if !parent.is_root()
                        && self.child_count(&parent) == 0
                        && self.document().block_kind(&parent) != Some(BlockKind::Condition) =>
                {
                    current = parent
                }
                _ => return Ok(()),
            }
        }
    }

    /// Delete the selected content and collapse to its start.
    pub fn delete_selection(&mut self) -> OpResult {
        let selection = self.selection().clone();
        if selection.is_collapsed() {
            return Ok(());
        }
        let start = selection.start().clone();
        let end = selection.end().clone();

        if start.path == end.path {
            self.remove_text_at(start.path.clone(), start.offset, end.offset - start.offset)?;
            self.collapse_to(start);
            return Ok(());
        }

        let start_block = self.block_of(&start.path)?;
        let end_block = self.block_of(&end.path)?;
        let between = self.nodes_between(&start.path, &end.path);

        self.remove_text_at(end.path.clone(), 0, end.offset)?;
        let start_len = self.value().text_len(&start.path);
        self.remove_text_at(start.path.clone(), start.offset, start_len.saturating_sub(start.offset))?;

        let start_block = self.path_ref(start_block);
        let end_block = self.path_ref(end_block);
        for path in between.into_iter().rev() {
            self.remove_node(path)?;
        }
        self.collapse_to(start);

        let start_block = self.resolve(start_block)?;
        let end_block = self.resolve(end_block)?;
        if start_block != end_block {
            self.merge_blocks(start_block, end_block)?;
        }
        Ok(())
    }

    /// Nodes strictly between two text paths that contain neither, in
    /// document order. Removing them leaves only the two texts' ancestors.
    fn nodes_between(&self, start: &Path, end: &Path) -> Vec<Path> {
        let common = start.common_ancestor(end).len();
        let mut out = Vec::new();

        for level in (common + 1..start.len()).rev() {
            let parent = Path::new(start.indices()[..level].to_vec());
            for index in start.indices()[level] + 1..self.child_count(&parent) {
                out.push(parent.child(index));
            }
        }
        let shared = Path::new(start.indices()[..common].to_vec());
        for index in start.indices()[common] + 1..end.indices()[common] {
            out.push(shared.child(index));
        }
        for level in common + 1..end.len() {
            let parent = Path::new(end.indices()[..level].to_vec());
            for index in 0..end.indices()[level] {
                out.push(parent.child(index));
            }
        }
        out
    }

    /// Split the block holding the cursor at the cursor.
    pub fn split_block(&mut self) -> OpResult {
        self.ensure_collapsed()?;
        let point = self.anchor();
        let block = self.block_of(&point.path)?;
        self.split_descendants(&block, &point)
    }

    /// Split every node from the text at `point` up to and including `until`.
    pub fn split_descendants(&mut self, until: &Path, point: &Point) -> OpResult {
        let mut path = point.path.clone();
        let mut position = point.offset;
        loop {
            self.split_node(path.clone(), position)?;
            if path == *until {
                return Ok(());
            }
            position = path.last().unwrap_or(0) + 1;
            path = path.parent().ok_or_else(|| OperationError::NodeNotFound(until.clone()))?;
        }
    }

    /// Retype the leaf blocks in the selection, keeping their data.
    pub fn set_blocks(&mut self, kind: BlockKind) -> OpResult {
        for path in self.value().selected_blocks() {
            self.set_block_kind(path, kind)?;
        }
        Ok(())
    }

    pub fn set_block_kind(&mut self, path: Path, kind: BlockKind) -> OpResult {
        let data = self
            .document()
            .node(&path)
            .and_then(Node::data)
            .cloned()
            .unwrap_or_default();
        self.set_node(path, Properties::Block { kind, data })
    }

    /// Wrap the selected blocks in a new block. The wrapper goes at the
    /// level of their closest common ancestor.
    pub fn wrap_block(&mut self, kind: BlockKind, data: Data) -> OpResult {
        let blocks = self.value().selected_blocks();
        let (Some(first), Some(last)) = (blocks.first().cloned(), blocks.last().cloned()) else {
            return Ok(());
        };
        let common = if first == last {
            first.parent().ok_or_else(|| OperationError::ParentNotFound(first.clone()))?
        } else {
            first.common_ancestor(&last)
        };
        let depth = common.len();
        let from = first.indices()[depth];
        let to = last.indices()[depth];

        self.insert_node(common.child(from), Block::new(kind).with_data(data))?;
        for index in 0..=(to - from) {
            self.move_node(common.child(from + 1), common.child(from).child(index))?;
        }
        Ok(())
    }

    /// Move the selected blocks out of their closest ancestor of `kind`,
    /// splitting it when the selection covers only its middle.
    pub fn unwrap_block(&mut self, kind: BlockKind) -> OpResult {
        let blocks = self.value().selected_blocks();
        let mut wrappers: Vec<Path> = blocks
            .iter()
            .filter_map(|block| self.document().closest_ancestor_of_kind(block, kind))
            .collect();
        wrappers.sort();
        wrappers.dedup();

        let blocks: Vec<PathRef> = blocks.into_iter().map(|block| self.path_ref(block)).collect();
        let wrappers: Vec<PathRef> = wrappers.into_iter().map(|wrapper| self.path_ref(wrapper)).collect();

        for wrapper in wrappers.into_iter().rev() {
            let wrapper = self.resolve(wrapper)?;
            let depth = wrapper.len();
            let indices: Vec<usize> = blocks
                .iter()
                .filter_map(|block| self.resolve(*block).ok())
                .filter(|block| wrapper.is_ancestor_of(block))
                .map(|block| block.indices()[depth])
                .collect();
            let (Some(&first), Some(&last)) = (indices.iter().min(), indices.iter().max()) else {
                continue;
            };
            self.unwrap_children(wrapper, first, last)?;
        }
        Ok(())
    }

    fn unwrap_children(&mut self, wrapper: Path, first: usize, last: usize) -> OpResult {
        let count = self.child_count(&wrapper);
        let after = Self::next_of(&wrapper)?;

        if first == 0 {
            let mut wrapper = wrapper;
            for _ in 0..=last {
                self.move_node(wrapper.child(0), wrapper.clone())?;
                wrapper = Self::next_of(&wrapper)?;
            }
            if last + 1 == count {
                self.remove_node(wrapper)?;
            }
            return Ok(());
        }

        if last + 1 < count {
            self.split_node(wrapper.clone(), last + 1)?;
        }
        for index in (first..=last).rev() {
            self.move_node(wrapper.child(index), after.clone())?;
        }
        Ok(())
    }

    /// Insert a block next to the cursor's block: after an empty block,
    /// before a block with the cursor at its start, after one with the
    /// cursor at its end, otherwise between the halves of a split. Returns
    /// the inserted block's path.
    pub fn insert_block(&mut self, block: Block) -> OpResult<Path> {
        self.ensure_collapsed()?;
        let point = self.anchor();
        let current = self.block_of(&point.path)?;
        let node = self
            .document()
            .node(&current)
            .ok_or_else(|| OperationError::NodeNotFound(current.clone()))?;
        let len = node.text_len();
        let has_inlines = node.children().map(|children| children.iter().any(Node::is_inline)).unwrap_or(false);
        let offset = self.value().offset_in_block(&point);

        let at = if len == 0 && !has_inlines {
            Self::next_of(&current)?
        } else if offset == 0 {
            current
        } else if offset >= len {
            Self::next_of(&current)?
        } else {
            self.split_descendants(&current, &point)?;
            Self::next_of(&current)?
        };
        self.insert_node(at.clone(), block)?;
        Ok(at)
    }

    /// Insert an inline at the cursor; the cursor ends up after it.
    pub fn insert_inline(&mut self, inline: Inline) -> OpResult {
        self.ensure_collapsed()?;
        let point = self.anchor();
        self.split_node(point.path.clone(), point.offset)?;
        self.insert_node(Self::next_of(&point.path)?, inline)
    }

    /// Wrap the selected run in a new inline. The selection must start and
    /// end under the same parent; the cursor ends up after the inline.
    pub fn wrap_inline(&mut self, kind: InlineKind, data: Data) -> OpResult {
        let selection = self.selection().clone();
        if selection.is_collapsed() {
            return Ok(());
        }
        let start = selection.start().clone();
        let end = selection.end().clone();
        let parent = start.path.parent().ok_or_else(|| OperationError::ParentNotFound(start.path.clone()))?;
        if end.path.parent().as_ref() != Some(&parent) {
            debug!(start = %start.path, end = %end.path, "Selection crosses inline boundaries; not wrapping");
            return Ok(());
        }
        let first = start.path.last().unwrap_or(0);
        let last = end.path.last().unwrap_or(0);

        self.split_node(end.path.clone(), end.offset)?;
        self.split_node(start.path.clone(), start.offset)?;
        self.insert_node(parent.child(first + 1), Inline::new(kind, data))?;
        for index in 0..=(last - first) {
            self.move_node(parent.child(first + 2), parent.child(first + 1).child(index))?;
        }
        self.collapse_to(Point { path: parent.child(first + 2), offset: 0 });
        Ok(())
    }

    /// Splice imported blocks in at the cursor. A single text block merges
    /// into the current block; anything else goes in as blocks.
    pub fn insert_fragment(&mut self, nodes: Vec<Node>) -> OpResult {
        self.ensure_collapsed()?;
        let inline_content = match nodes.as_slice() {
            [Node::Block(block)] if !block.kind.holds_blocks() && !block.nodes.iter().any(Node::is_block) => {
                Some(block.nodes.clone())
            }
            _ => None,
        };

        let point = self.anchor();
        if let Some(children) = inline_content {
            self.split_node(point.path.clone(), point.offset)?;
            let mut at = Self::next_of(&point.path)?;
            for child in children {
                self.insert_node(at.clone(), child)?;
                at = Self::next_of(&at)?;
            }
            return Ok(());
        }
        if nodes.is_empty() {
            return Ok(());
        }

        let current = self.block_of(&point.path)?;
        let len = self.document().node(&current).map(Node::text_len).unwrap_or(0);
        let offset = self.value().offset_in_block(&point);
        let mut at = if offset == 0 && len > 0 {
            current
        } else if offset >= len {
            Self::next_of(&current)?
        } else {
            self.split_descendants(&current, &point)?;
            Self::next_of(&current)?
        };
        for node in nodes {
            self.insert_node(at.clone(), node)?;
            at = Self::next_of(&at)?;
        }
        if let Some(last) = at.previous() {
            self.move_to_end_of_node(&last)?;
        }
        Ok(())
    }

    pub fn move_to(&mut self, point: Point) {
        self.collapse_to(point);
    }

    pub fn move_to_start_of_node(&mut self, path: &Path) -> OpResult {
        let text = self
            .document()
            .first_text(path)
            .ok_or_else(|| OperationError::NodeNotFound(path.clone()))?;
        self.collapse_to(Point { path: text, offset: 0 });
        Ok(())
    }

    pub fn move_to_end_of_node(&mut self, path: &Path) -> OpResult {
        let text = self
            .document()
            .last_text(path)
            .ok_or_else(|| OperationError::NodeNotFound(path.clone()))?;
        let offset = self.value().text_len(&text);
        self.collapse_to(Point { path: text, offset });
        Ok(())
    }

    /// Place the cursor at `offset` in its current text.
    pub fn move_to_offset(&mut self, offset: usize) {
        let path = self.anchor().path;
        let offset = offset.min(self.value().text_len(&path));
        self.collapse_to(Point { path, offset });
    }

    /// Move the cursor `count` characters back. A block boundary counts as
    /// one character; an inline boundary does not.
    pub fn move_backward(&mut self, count: usize) {
        let mut point = self.selection().start().clone();
        for _ in 0..count {
            point = self.step_backward(point);
        }
        self.select(Selection::collapsed(point));
    }

    pub fn move_forward(&mut self, count: usize) {
        let mut point = self.selection().end().clone();
        for _ in 0..count {
            point = self.step_forward(point);
        }
        self.select(Selection::collapsed(point));
    }

    fn step_backward(&self, point: Point) -> Point {
        if point.offset > 0 {
            return Point { path: point.path, offset: point.offset - 1 };
        }
        let block = self.document().closest_block(&point.path);
        let texts = self.document().text_paths();
        let Some(previous) = texts.iter().rev().find(|path| **path < point.path) else {
            return point;
        };
        let len = self.value().text_len(previous);
        let same_block = block.as_ref().map(|block| previous.starts_with(block)).unwrap_or(false);
        let offset = if same_block { len.saturating_sub(1) } else { len };
        Point { path: previous.clone(), offset }
    }

    fn step_forward(&self, point: Point) -> Point {
        let len = self.value().text_len(&point.path);
        if point.offset < len {
            return Point { path: point.path, offset: point.offset + 1 };
        }
        let block = self.document().closest_block(&point.path);
        let texts = self.document().text_paths();
        let Some(next) = texts.into_iter().find(|path| *path > point.path) else {
            return point;
        };
        let same_block = block.as_ref().map(|block| next.starts_with(block)).unwrap_or(false);
        let offset = if same_block && self.value().text_len(&next) > 0 { 1 } else { 0 };
        Point { path: next, offset }
    }
}
