//! # Undo/Redo History
//!
//! Each committed change is one [`Batch`]: the operations it applied
//! (normalizer repairs included) and the selection before and after.
//!
//! - Undo applies the inverses in reverse order and restores the selection
//!   from before the change
//! - Redo reapplies the operations
//! - A new change clears the redo stack
//! - Consecutive typing in the same text collapses into one batch
//!
//! Undo and redo work on a copy of the document and only commit it when
//! every operation applied, so a failure leaves the value untouched.

use crate::errors::OpResult;
use crate::operation::Operation;
use crate::value::{Selection, Value};
use ontask_document::Path;
use tracing::debug;

/// Operations of one committed change.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub operations: Vec<Operation>,
    pub before: Selection,
    pub after: Selection,
}

impl Batch {
    pub fn new(operations: Vec<Operation>, before: Selection, after: Selection) -> Self {
        Self { operations, before, after }
    }

    /// The text and end offset of a batch made only of typing into one text.
    fn typing_run(&self) -> Option<(&Path, usize)> {
        let mut run: Option<(&Path, usize)> = None;
        for op in &self.operations {
            let Operation::InsertText { path, offset, text } = op else {
                return None;
            };
            match run {
                Some((current, end)) if current != path || end != *offset => return None,
                _ => run = Some((path, offset + text.chars().count())),
            }
        }
        run
    }

    /// True when `next` continues typing where this batch stopped.
    fn continued_by(&self, next: &Batch) -> bool {
        let (Some((path, end)), [Operation::InsertText { path: next_path, offset, .. }]) =
            (self.typing_run(), next.operations.as_slice())
        else {
            return false;
        };
        path == next_path && end == *offset
    }
}

#[derive(Debug)]
pub struct History {
    undo_stack: Vec<Batch>,
    redo_stack: Vec<Batch>,
    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,
}

impl History {
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self { undo_stack: Vec::new(), redo_stack: Vec::new(), max_levels }
    }

    /// Record a committed change.
    pub fn push(&mut self, batch: Batch) {
        if batch.operations.is_empty() {
            return;
        }

        if self.redo_stack.is_empty() {
            if let Some(last) = self.undo_stack.last_mut() {
                if last.continued_by(&batch) {
                    last.operations.extend(batch.operations);
                    last.after = batch.after;
                    return;
                }
            }
        }

        self.undo_stack.push(batch);
        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Undo the most recent change. Returns false when there is none.
    pub fn undo(&mut self, value: &mut Value) -> OpResult<bool> {
        let Some(batch) = self.undo_stack.pop() else {
            return Ok(false);
        };

        let mut document = value.document.clone();
        let result = batch
            .operations
            .iter()
            .rev()
            .try_for_each(|op| op.inverse().apply(&mut document));
        if let Err(err) = result {
            self.undo_stack.push(batch);
            return Err(err);
        }

        debug!(operations = batch.operations.len(), "Undo");
        value.document = document;
        value.selection = batch.before.clone();
        self.redo_stack.push(batch);
        Ok(true)
    }

    /// Redo the most recently undone change. Returns false when there is none.
    pub fn redo(&mut self, value: &mut Value) -> OpResult<bool> {
        let Some(batch) = self.redo_stack.pop() else {
            return Ok(false);
        };

        let mut document = value.document.clone();
        if let Err(err) = batch.operations.iter().try_for_each(|op| op.apply(&mut document)) {
            self.redo_stack.push(batch);
            return Err(err);
        }

        debug!(operations = batch.operations.len(), "Redo");
        value.document = document;
        value.selection = batch.after.clone();
        self.undo_stack.push(batch);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
