//! Keyboard-Intent Dispatcher.
//!
//! Key presses go through an ordered list of named handlers; the first one
//! that returns [`Intent::Handled`] wins. A key nobody handles gets its
//! [`default_action`]. Key releases only drive the list shortcut
//! (`* `, `- `, `+ `, `1. ` at the start of a paragraph).

use crate::errors::OpResult;
use crate::transaction::Transaction;
use ontask_document::{BlockKind, Data, MarkKind, Node, NodeType, Path};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

static LIST_SHORTCUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([*+-]|\d+\.)\s$").expect("valid list shortcut regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Key {
    Tab,
    Backspace,
    Delete,
    Enter,
    Space,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: Key,
    #[serde(default)]
    pub shift: bool,
    /// Ctrl, or Cmd on macOS
    #[serde(default)]
    pub modifier: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self { key, shift: false, modifier: false }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_modifier(mut self) -> Self {
        self.modifier = true;
        self
    }

    fn is(&self, key: Key) -> bool {
        self.key == key && !self.modifier
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Handled,
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Undo,
    Redo,
}

/// mod+z undoes; mod+shift+z and mod+y redo.
pub fn history_hotkey(event: &KeyEvent) -> Option<HistoryAction> {
    if !event.modifier {
        return None;
    }
    match (event.key, event.shift) {
        (Key::Char('z'), false) => Some(HistoryAction::Undo),
        (Key::Char('z'), true) | (Key::Char('y'), false) => Some(HistoryAction::Redo),
        _ => None,
    }
}

type Handle = fn(&mut Transaction, &KeyEvent) -> OpResult<Intent>;

pub struct IntentHandler {
    pub name: &'static str,
    pub handle: Handle,
}

pub static HANDLERS: &[IntentHandler] = &[
    IntentHandler { name: "mark-hotkeys", handle: mark_hotkeys },
    IntentHandler { name: "tab", handle: tab },
    IntentHandler { name: "list-backspace", handle: list_backspace },
    IntentHandler { name: "condition-backspace", handle: condition_backspace },
    IntentHandler { name: "condition-delete", handle: condition_delete },
    IntentHandler { name: "arrow-up", handle: arrow_up },
    IntentHandler { name: "arrow-down", handle: arrow_down },
    IntentHandler { name: "soft-break", handle: soft_break },
    IntentHandler { name: "heading-enter", handle: heading_enter },
    IntentHandler { name: "list-enter", handle: list_enter },
    IntentHandler { name: "condition-enter", handle: condition_enter },
    IntentHandler { name: "code-enter", handle: code_enter },
];

/// Run the handlers in order. Returns the name of the one that handled the
/// key, or `None` when the default action should run.
pub fn dispatch(tx: &mut Transaction, event: &KeyEvent) -> OpResult<Option<&'static str>> {
    for handler in HANDLERS {
        if (handler.handle)(tx, event)? == Intent::Handled {
            debug!(handler = handler.name, key = ?event.key, "Key handled");
            return Ok(Some(handler.name));
        }
    }
    Ok(None)
}

/// What a key does when no handler claims it.
pub fn default_action(tx: &mut Transaction, event: &KeyEvent) -> OpResult {
    if event.modifier {
        return Ok(());
    }
    match event.key {
        Key::Char(ch) => tx.insert_text(ch.encode_utf8(&mut [0; 4])),
        Key::Space => tx.insert_text(" "),
        Key::Tab => tx.insert_text("\t"),
        Key::Enter => tx.split_block(),
        Key::Backspace => tx.delete_backward(1),
        Key::Delete => tx.delete_forward(1),
        Key::ArrowLeft => {
            tx.move_backward(1);
            Ok(())
        }
        Key::ArrowRight => {
            tx.move_forward(1);
            Ok(())
        }
        Key::ArrowUp | Key::ArrowDown => {
            let value = tx.value();
            let Some(block) = value.anchor_block() else {
                return Ok(());
            };
            let column = value.offset_in_block(&value.selection.anchor);
            let target = if event.key == Key::ArrowUp {
                value.previous_leaf_block(&block)
            } else {
                value.next_leaf_block(&block)
            };
            if let Some(point) = target.and_then(|target| value.point_in_block(&target, column)) {
                tx.move_to(point);
            }
            Ok(())
        }
    }
}

/// Key release: turn a typed list marker into a list.
pub fn on_key_up(tx: &mut Transaction, event: &KeyEvent) -> OpResult<Intent> {
    if !event.is(Key::Space) || !tx.selection().is_collapsed() {
        return Ok(Intent::Continue);
    }
    let value = tx.value();
    if value.anchor_block_kind() != Some(BlockKind::Paragraph) {
        return Ok(Intent::Continue);
    }
    let before = value.text_before(&value.selection.anchor);
    let Some(captures) = LIST_SHORTCUT.captures(&before) else {
        return Ok(Intent::Continue);
    };
    let marker_len = captures[0].chars().count();
    let kind = if captures[1].starts_with(|ch: char| ch.is_ascii_digit()) {
        BlockKind::NumberedList
    } else {
        BlockKind::BulletedList
    };

    debug!(marker = &captures[1], list = %kind, "List shortcut");
    tx.delete_backward(marker_len)?;
    tx.wrap_block(kind, Data::new())?;
    tx.set_blocks(BlockKind::ListItem)?;
    Ok(Intent::Handled)
}

/// Cursor context shared by the handlers.
struct Context {
    block: Path,
    kind: Option<BlockKind>,
    parent_kind: Option<BlockKind>,
    parent_type: Option<NodeType>,
    offset: usize,
    empty: bool,
}

impl Context {
    fn of(tx: &Transaction) -> Option<Self> {
        let value = tx.value();
        if !value.selection.is_collapsed() {
            return None;
        }
        let block = value.anchor_block()?;
        let node = value.document.node(&block)?;
        let empty = node.text_len() == 0 && !node.children().unwrap_or(&[]).iter().any(Node::is_inline);
        Some(Self {
            kind: node.block_kind(),
            parent_kind: value.parent_kind(),
            parent_type: value.parent_type(),
            offset: value.offset_in_block(&value.selection.anchor),
            empty,
            block,
        })
    }

    fn list(&self) -> Option<BlockKind> {
        self.parent_kind.filter(|kind| kind.is_list())
    }
}

fn mark_hotkeys(tx: &mut Transaction, event: &KeyEvent) -> OpResult<Intent> {
    if !event.modifier || event.shift {
        return Ok(Intent::Continue);
    }
    let kind = match event.key {
        Key::Char('b') => MarkKind::Bold,
        Key::Char('i') => MarkKind::Italic,
        Key::Char('u') => MarkKind::Underlined,
        Key::Char('`') => MarkKind::Code,
        _ => return Ok(Intent::Continue),
    };
    tx.toggle_mark(kind)?;
    Ok(Intent::Handled)
}

/// Tab indents a list item one level, Shift+Tab outdents it. Outside a
/// list Tab is a literal tab.
fn tab(tx: &mut Transaction, event: &KeyEvent) -> OpResult<Intent> {
    if !event.is(Key::Tab) {
        return Ok(Intent::Continue);
    }
    match Context::of(tx).and_then(|context| context.list()) {
        Some(list) if event.shift => tx.unwrap_block(list)?,
        Some(list) => {
            tx.set_blocks(BlockKind::ListItem)?;
            tx.wrap_block(list, Data::new())?;
        }
        None if event.shift => {}
        None => tx.insert_text("\t")?,
    }
    Ok(Intent::Handled)
}

/// Backspace at the start of a block inside a list lifts it out of the
/// list, unless it is a list item with siblings.
fn list_backspace(tx: &mut Transaction, event: &KeyEvent) -> OpResult<Intent> {
    if !event.is(Key::Backspace) {
        return Ok(Intent::Continue);
    }
    let Some(context) = Context::of(tx) else {
        return Ok(Intent::Continue);
    };
    let Some(list) = context.list() else {
        return Ok(Intent::Continue);
    };
    let parent = context.block.parent().unwrap_or_default();
    let only_child = tx.child_count(&parent) == 1;
    if context.offset != 0 || (context.kind == Some(BlockKind::ListItem) && !only_child) {
        return Ok(Intent::Continue);
    }
    tx.unwrap_block(list)?;
    Ok(Intent::Handled)
}

/// Backspace at the start of a block next to a condition boundary moves the
/// cursor instead of merging content across branches.
fn condition_backspace(tx: &mut Transaction, event: &KeyEvent) -> OpResult<Intent> {
    if !event.is(Key::Backspace) {
        return Ok(Intent::Continue);
    }
    let Some(context) = Context::of(tx) else {
        return Ok(Intent::Continue);
    };
    if context.offset != 0 && !context.empty {
        return Ok(Intent::Continue);
    }

    let value = tx.value();
    let crossing = match value.previous_node(&context.block) {
        None => true,
        Some(previous) => {
            matches!(value.document.block_kind(&previous), Some(BlockKind::Rule | BlockKind::Condition))
                || (context.parent_type == Some(NodeType::Block(BlockKind::Condition))
                    && previous.parent() != context.block.parent())
        }
    };
    if !crossing {
        return Ok(Intent::Continue);
    }
    tx.move_backward(1);
    Ok(Intent::Handled)
}

/// Delete at the end of a block next to a condition boundary moves the
/// cursor forward instead of pulling the next branch's content in.
fn condition_delete(tx: &mut Transaction, event: &KeyEvent) -> OpResult<Intent> {
    if !event.is(Key::Delete) {
        return Ok(Intent::Continue);
    }
    let Some(context) = Context::of(tx) else {
        return Ok(Intent::Continue);
    };
    let value = tx.value();
    let len = value.document.node(&context.block).map(Node::text_len).unwrap_or(0);
    if context.offset < len {
        return Ok(Intent::Continue);
    }
    let Some(next) = value.next_node(&context.block) else {
        return Ok(Intent::Continue);
    };
    let crossing = matches!(value.document.block_kind(&next), Some(BlockKind::Rule | BlockKind::Condition))
        || (context.parent_type == Some(NodeType::Block(BlockKind::Condition)) && next.parent() != context.block.parent());
    if !crossing {
        return Ok(Intent::Continue);
    }
    tx.move_forward(1);
    Ok(Intent::Handled)
}

/// ArrowUp from a block with no previous sibling jumps to the end of the
/// nearest leaf block above, even when it is nested deeper.
fn arrow_up(tx: &mut Transaction, event: &KeyEvent) -> OpResult<Intent> {
    if !event.is(Key::ArrowUp) {
        return Ok(Intent::Continue);
    }
    let Some(context) = Context::of(tx) else {
        return Ok(Intent::Continue);
    };
    if context.block.previous().is_some() {
        return Ok(Intent::Continue);
    }
    match tx.value().previous_leaf_block(&context.block) {
        Some(target) => {
            tx.move_to_end_of_node(&target)?;
            Ok(Intent::Handled)
        }
        None => Ok(Intent::Continue),
    }
}

fn arrow_down(tx: &mut Transaction, event: &KeyEvent) -> OpResult<Intent> {
    if !event.is(Key::ArrowDown) {
        return Ok(Intent::Continue);
    }
    let Some(context) = Context::of(tx) else {
        return Ok(Intent::Continue);
    };
    let parent = context.block.parent().unwrap_or_default();
    let index = context.block.last().unwrap_or(0);
    if index + 1 < tx.child_count(&parent) {
        return Ok(Intent::Continue);
    }
    match tx.value().next_leaf_block(&context.block) {
        Some(target) => {
            tx.move_to_end_of_node(&target)?;
            Ok(Intent::Handled)
        }
        None => Ok(Intent::Continue),
    }
}

fn soft_break(tx: &mut Transaction, event: &KeyEvent) -> OpResult<Intent> {
    if !event.is(Key::Enter) || !event.shift {
        return Ok(Intent::Continue);
    }
    tx.insert_text("\n")?;
    Ok(Intent::Handled)
}

/// Headings are single line: Enter continues with a paragraph.
fn heading_enter(tx: &mut Transaction, event: &KeyEvent) -> OpResult<Intent> {
    if !event.is(Key::Enter) {
        return Ok(Intent::Continue);
    }
    let Some(context) = Context::of(tx) else {
        return Ok(Intent::Continue);
    };
    if !matches!(context.kind, Some(BlockKind::HeadingOne | BlockKind::HeadingTwo)) {
        return Ok(Intent::Continue);
    }
    tx.split_block()?;
    tx.set_blocks(BlockKind::Paragraph)?;
    Ok(Intent::Handled)
}

/// Enter on an empty list item leaves the list.
fn list_enter(tx: &mut Transaction, event: &KeyEvent) -> OpResult<Intent> {
    if !event.is(Key::Enter) {
        return Ok(Intent::Continue);
    }
    let Some(context) = Context::of(tx) else {
        return Ok(Intent::Continue);
    };
    match context.list() {
        Some(list) if context.kind == Some(BlockKind::ListItem) && context.empty => {
            tx.unwrap_block(list)?;
            Ok(Intent::Handled)
        }
        _ => Ok(Intent::Continue),
    }
}

/// Enter on an empty paragraph inside a condition moves on instead of
/// stacking blank lines.
fn condition_enter(tx: &mut Transaction, event: &KeyEvent) -> OpResult<Intent> {
    if !event.is(Key::Enter) {
        return Ok(Intent::Continue);
    }
    let Some(context) = Context::of(tx) else {
        return Ok(Intent::Continue);
    };
    if context.kind != Some(BlockKind::Paragraph)
        || !context.empty
        || context.parent_type != Some(NodeType::Block(BlockKind::Condition))
    {
        return Ok(Intent::Continue);
    }
    tx.move_forward(1);
    Ok(Intent::Handled)
}

/// Enter inside a code block stays in the block.
fn code_enter(tx: &mut Transaction, event: &KeyEvent) -> OpResult<Intent> {
    if !event.is(Key::Enter) {
        return Ok(Intent::Continue);
    }
    match Context::of(tx) {
        Some(context) if context.kind == Some(BlockKind::Code) => {
            tx.insert_text("\n")?;
            Ok(Intent::Handled)
        }
        _ => Ok(Intent::Continue),
    }
}
