//! Block toolbar commands.

use crate::errors::OpResult;
use crate::transaction::Transaction;
use crate::value::Value;
use ontask_document::{BlockKind, Data};

impl Value {
    /// Whether the toolbar button for `kind` shows as active. List buttons
    /// are active for list items whose parent list has that type.
    pub fn is_block_active(&self, kind: BlockKind) -> bool {
        if kind.is_list() {
            self.has_block(BlockKind::ListItem) && self.parent_kind() == Some(kind)
        } else {
            self.has_block(kind)
        }
    }
}

impl Transaction {
    /// Toggle the selected blocks to `kind`. Every path pairs a retype with
    /// a wrap or unwrap, so list items never end up outside a list.
    pub fn toggle_block(&mut self, kind: BlockKind) -> OpResult {
        let value = self.value();
        let active = value.has_block(kind);
        let in_list = value.has_block(BlockKind::ListItem);
        let parent = value.parent_block().zip(value.parent_kind());

        if !kind.is_list() {
            self.set_blocks(if active { BlockKind::Paragraph } else { kind })?;
            match parent {
                Some((_, list)) if in_list && list.is_list() => self.unwrap_block(list)?,
                _ => {}
            }
            return Ok(());
        }

        match parent {
            Some((_, parent_kind)) if in_list && parent_kind == kind => {
                self.set_blocks(BlockKind::Paragraph)?;
                self.unwrap_block(kind)
            }
            Some((parent_path, parent_kind)) if in_list && parent_kind.is_list() => {
                self.set_block_kind(parent_path, kind)
            }
            _ => {
                self.wrap_block(kind, Data::new())?;
                self.set_blocks(BlockKind::ListItem)
            }
        }
    }
}
