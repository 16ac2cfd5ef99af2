//! # Editor Controller
//!
//! Owns the current value and runs every command as one change:
//!
//! ```text
//! command ──▶ Transaction ──▶ normalize ──▶ fix selection ──▶ history
//!                 │
//!          OperationError ──▶ warn! + discard (value untouched)
//! ```
//!
//! Save and preview go through a [`ContentCollaborator`]. Requests carry
//! increasing ids; only the response to the latest request of each kind is
//! applied.

use crate::config::EditorConfig;
use crate::errors::{OpResult, TransportError};
use crate::history::{Batch, History};
use crate::keyboard::{self, HistoryAction, Intent, KeyEvent};
use crate::normalizer::normalize;
use crate::rules::{condition_heading, condition_headings, ConditionHeading, Rule, RuleContext};
use crate::transaction::Transaction;
use crate::value::{Selection, Value};
use ontask_document::{deserialize, sanitize_fragment, BlockKind, Document, Mark, MarkKind, NodeType, Path, Serializer};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Screen rectangle of the editor surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub html: String,
}

/// A save or preview request handed to the collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub content: Content,
}

/// The content store. Implementations send the request and later report
/// the outcome through [`Editor::resolve`].
pub trait ContentCollaborator {
    fn update(&mut self, request: Request);
    fn preview(&mut self, request: Request);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationGuard {
    Allow,
    Confirm(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pending {
    id: u64,
    html: String,
}

pub struct Editor {
    config: EditorConfig,
    context: RuleContext,
    value: Value,
    history: History,
    serializer: Serializer,
    /// Markup as last saved
    reference: String,
    next_request: u64,
    saving: Option<Pending>,
    previewing: Option<u64>,
    last_error: Option<TransportError>,
    pointer_inside: bool,
}

impl Editor {
    /// Load `markup`. Empty markup starts with one empty paragraph.
    pub fn load(markup: &str, config: EditorConfig, context: RuleContext) -> Self {
        let mut editor = Self {
            history: History::with_max_levels(config.history_depth),
            serializer: Serializer::with_fonts(config.font_table()),
            config,
            context,
            value: Value::default(),
            reference: String::new(),
            next_request: 0,
            saving: None,
            previewing: None,
            last_error: None,
            pointer_inside: false,
        };
        editor.reset(markup);
        editor
    }

    fn reset(&mut self, markup: &str) {
        let mut document = deserialize(markup);
        if document.nodes.is_empty() {
            document = Document::empty();
        }
        let mut tx = Transaction::new(Value::new(document));
        if let Err(err) = normalize(&mut tx, self.config.max_normalize_passes) {
            warn!(error = %err, "Could not normalize loaded content");
        }
        tx.fix_selection();
        self.value = tx.into_parts().0;
        self.reference = self.serialize();
        self.history.clear();
        info!(blocks = self.value.document.nodes.len(), "Loaded content");
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

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn context(&self) -> &RuleContext {
        &self.context
    }

    pub fn set_context(&mut self, context: RuleContext) {
        self.context = context;
    }

    pub fn serialize(&self) -> String {
        self.serializer.serialize(&self.value.document)
    }

    /// Run `command` as one change. A command that fails leaves the value
    /// as it was and returns `None`.
    pub fn change<R>(&mut self, command: impl FnOnce(&mut Transaction) -> OpResult<R>) -> Option<R> {
        let before = self.value.selection.clone();
        let passes = self.config.max_normalize_passes;
        let mut tx = Transaction::new(self.value.clone());

        let result = command(&mut tx).and_then(|output| normalize(&mut tx, passes).map(|_| output));
        match result {
            Ok(output) => {
                tx.fix_selection();
                let (value, operations) = tx.into_parts();
                self.history.push(Batch::new(operations, before, value.selection.clone()));
                self.value = value;
                Some(output)
            }
            Err(err) => {
                warn!(error = %err, "Discarded change");
                None
            }
        }
    }

    pub fn select(&mut self, selection: Selection) {
        self.change(|tx| {
            tx.select(selection);
            Ok(())
        });
    }

    /// Key press. Returns the name of the handler that claimed it; `None`
    /// when the default action ran.
    pub fn on_key_down(&mut self, event: KeyEvent) -> Option<&'static str> {
        if let Some(action) = keyboard::history_hotkey(&event) {
            match action {
                HistoryAction::Undo => self.undo(),
                HistoryAction::Redo => self.redo(),
            };
            return Some("history");
        }
        self.change(|tx| {
            let handled = keyboard::dispatch(tx, &event)?;
            if handled.is_none() {
                keyboard::default_action(tx, &event)?;
            }
            Ok(handled)
        })
        .flatten()
    }

    pub fn on_key_up(&mut self, event: KeyEvent) -> bool {
        self.change(|tx| keyboard::on_key_up(tx, &event)) == Some(Intent::Handled)
    }

    /// Type `text` one key at a time.
    pub fn type_text(&mut self, text: &str) {
        for ch in text.chars() {
            let key = if ch == ' ' { keyboard::Key::Space } else { keyboard::Key::Char(ch) };
            self.on_key_down(KeyEvent::new(key));
            self.on_key_up(KeyEvent::new(key));
        }
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.value).unwrap_or_else(|err| {
            warn!(error = %err, "Undo failed");
            false
        })
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.value).unwrap_or_else(|err| {
            warn!(error = %err, "Redo failed");
            false
        })
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // Toolbar

    pub fn toggle_mark(&mut self, kind: MarkKind) {
        self.change(|tx| tx.toggle_mark(kind));
    }

    pub fn add_mark(&mut self, mark: Mark) {
        self.change(|tx| tx.add_mark(mark));
    }

    pub fn set_color(&mut self, hex: &str) {
        self.change(|tx| tx.set_color(hex));
    }

    pub fn set_font(&mut self, font: &str) {
        self.change(|tx| tx.set_font(font));
    }

    pub fn has_mark(&self, kind: MarkKind) -> bool {
        self.value.has_mark(kind)
    }

    pub fn on_click_block(&mut self, kind: BlockKind) {
        self.change(|tx| tx.toggle_block(kind));
    }

    pub fn has_block(&self, kind: BlockKind) -> bool {
        self.value.has_block(kind)
    }

    pub fn is_block_active(&self, kind: BlockKind) -> bool {
        self.value.is_block_active(kind)
    }

    pub fn parent_type(&self) -> Option<NodeType> {
        self.value.parent_type()
    }

    pub fn insert_attribute(&mut self, field: &str) {
        self.change(|tx| tx.insert_attribute(field));
    }

    pub fn insert_hyperlink(&mut self, label: &str, href: &str, params: &[(String, String)]) {
        self.change(|tx| tx.insert_hyperlink(label, href, params));
    }

    pub fn insert_image(&mut self, src: &str, alt: Option<&str>) {
        self.change(|tx| tx.insert_image(src, alt));
    }

    /// Paste external markup at the cursor after sanitizing it.
    pub fn paste_html(&mut self, html: &str) {
        let nodes = sanitize_fragment(html);
        debug!(nodes = nodes.len(), "Pasting");
        self.change(|tx| tx.insert_fragment(nodes));
    }

    // Rules

    /// Insert `rule` at the cursor. Returns where the rule ended up once
    /// the change is normalized.
    pub fn insert_rule(&mut self, rule: &Rule) -> Option<Path> {
        let passes = self.config.max_normalize_passes;
        self.change(|tx| {
            let path = tx.insert_rule(rule)?;
            let rule_ref = tx.path_ref(path);
            normalize(tx, passes)?;
            tx.resolve(rule_ref)
        })
    }

    pub fn pointer_moved(&mut self, x: f64, y: f64, surface: Rect) {
        self.pointer_inside = surface.contains(x, y);
    }

    /// Drop a dragged rule. It is inserted only when the pointer is over the
    /// editor surface.
    pub fn drop_rule(&mut self, rule: &Rule) -> Option<Path> {
        if !std::mem::take(&mut self.pointer_inside) {
            debug!(rule_id = %rule.rule_id, "Rule dropped outside the editor");
            return None;
        }
        self.insert_rule(rule)
    }

    pub fn condition_heading(&self, path: &Path) -> Option<ConditionHeading> {
        let node = self.value.document.node(path)?;
        condition_heading(node, &self.context)
    }

    pub fn condition_headings(&self) -> Vec<(Path, ConditionHeading)> {
        condition_headings(&self.value.document, &self.context)
    }

    /// Remove a condition branch; the catch-all branch is refused.
    pub fn remove_condition(&mut self, path: Path) -> bool {
        let removed = self.change(|tx| tx.remove_condition(path.clone())).unwrap_or(false);
        if !removed {
            debug!(path = %path, "Condition not removed");
        }
        removed
    }

    // Save / preview

    fn next_request(&mut self) -> Request {
        self.next_request += 1;
        Request { id: self.next_request, content: Content { html: self.serialize() } }
    }

    pub fn save(&mut self, collaborator: &mut dyn ContentCollaborator) -> u64 {
        let request = self.next_request();
        let id = request.id;
        self.saving = Some(Pending { id, html: request.content.html.clone() });
        info!(id, "Saving content");
        collaborator.update(request);
        id
    }

    pub fn preview(&mut self, collaborator: &mut dyn ContentCollaborator) -> u64 {
        let request = self.next_request();
        let id = request.id;
        self.previewing = Some(id);
        info!(id, "Previewing content");
        collaborator.preview(request);
        id
    }

    /// Complete request `id`. Returns false when the response is stale.
    pub fn resolve(&mut self, id: u64, result: Result<(), TransportError>) -> bool {
        if self.saving.as_ref().map(|pending| pending.id) == Some(id) {
            if let Some(pending) = self.saving.take() {
                match result {
                    Ok(()) => {
                        info!(id, "Saved content");
                        self.reference = pending.html;
                        self.last_error = None;
                    }
                    Err(err) => self.fail(id, err),
                }
            }
            return true;
        }
        if self.previewing == Some(id) {
            self.previewing = None;
            match result {
                Ok(()) => self.last_error = None,
                Err(err) => self.fail(id, err),
            }
            return true;
        }
        debug!(id, "Ignoring stale response");
        false
    }

    fn fail(&mut self, id: u64, err: TransportError) {
        warn!(id, error = %err, "Request failed; content kept");
        self.last_error = Some(err);
    }

    pub fn is_saving(&self) -> bool {
        self.saving.is_some()
    }

    pub fn is_previewing(&self) -> bool {
        self.previewing.is_some()
    }

    pub fn last_error(&self) -> Option<&TransportError> {
        self.last_error.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.serialize() != self.reference
    }

    pub fn navigation_guard(&self) -> NavigationGuard {
        if self.is_dirty() {
            NavigationGuard::Confirm(self.config.navigation_prompt.clone())
        } else {
            NavigationGuard::Allow
        }
    }

    /// Replace the content after an external round trip (e.g. an import).
    /// Resets the saved reference and the history.
    pub fn replace_content(&mut self, markup: &str) {
        self.reset(markup);
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor(markup: &str) -> Editor {
        Editor::load(markup, EditorConfig::default(), RuleContext::default())
    }

    #[test]
    fn test_load_normalizes() {
        let editor = editor("");
        assert_eq!(editor.document(), &Document::empty());
        assert!(!editor.is_dirty());

        let editor = self::editor("<li>a</li>");
        assert_eq!(editor.serialize(), "<p>a</p>");
    }

    #[test]
    fn test_failed_change_is_discarded() {
        let mut editor = editor("<p>a</p>");
        let result = editor.change(|tx| {
            tx.insert_text("b")?;
            tx.remove_node(Path::from([7]))
        });
        assert_eq!(result, None);
        assert_eq!(editor.serialize(), "<p>a</p>");
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_rect_contains() {
        let surface = Rect::new(10.0, 10.0, 100.0, 50.0);
        assert!(surface.contains(10.0, 60.0));
        assert!(!surface.contains(9.0, 20.0));
    }
}
