//! # OnTask Editor
//!
//! Editing engine for OnTask email and page content.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ document: markup ⇄ node tree                │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: value + transactions                │
//! │  - Primitive operations, commands           │
//! │  - Schema validation and normalization      │
//! │  - Keyboard intents, toolbar, rules         │
//! │  - Undo history, save/preview protocol      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ collaborator: stores and previews markup    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Operations are the only mutation**: every command lowers to
//!    invertible primitive operations
//! 2. **Normalized after every change**: no committed value violates the schema
//! 3. **Failed changes vanish**: an operation error discards the whole change
//! 4. **Labels are derived**: condition headings come from rule definitions
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ontask_editor::{Editor, EditorConfig, RuleContext, Key, KeyEvent};
//!
//! let mut editor = Editor::load("<p>Hello</p>", EditorConfig::default(), RuleContext::default());
//! editor.on_key_down(KeyEvent::new(Key::Char('!')));
//! editor.save(&mut collaborator);
//! ```

mod blocks;
mod config;
mod controller;
mod errors;
mod history;
mod inlines;
mod marks;
mod normalizer;
mod operation;
mod rules;
mod schema;
mod transaction;
mod transforms;
mod value;

pub mod keyboard;

pub use config::{EditorConfig, DEFAULT_NAVIGATION_PROMPT};
pub use controller::{Content, ContentCollaborator, Editor, NavigationGuard, Rect, Request};
pub use errors::{EditorError, OpResult, OperationError, TransportError};
pub use history::{Batch, History};
pub use inlines::hyperlink_target;
pub use keyboard::{Intent, Key, KeyEvent};
pub use normalizer::{is_normalized, normalize};
pub use operation::{Operation, Properties};
pub use rules::{
    condition_heading, condition_headings, generate_label, rule_block, ConditionHeading, Formula,
    Rule, RuleCondition, RuleContext, MISSING_CONDITION, MISSING_RULE,
};
pub use schema::{is_catch_all, rule_for, validate, Violation, ViolationCode, CATCH_ALL_LABEL, SCHEMA};
pub use transaction::{PathRef, PointRef, Transaction};
pub use value::{Point, Selection, Value};

// Re-export common types for convenience
pub use ontask_document::{BlockKind, Document, InlineKind, Mark, MarkKind, NodeType, Path};
