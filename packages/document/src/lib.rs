//! # OnTask Document
//!
//! The document model behind the email content editor, and its markup
//! format.
//!
//! ```text
//! markup ──tokenizer──▶ tokens ──parser──▶ element tree ──deserializer──▶ Document
//!                                              │                             │
//!                                          sanitizer (paste)             serializer ──▶ markup
//! ```
//!
//! The markup is the only persisted form of a document: the content store
//! keeps it and the rules engine renders it per recipient.

pub mod deserializer;
pub mod error;
pub mod layout;
pub mod markup;
pub mod node;
pub mod parser;
pub mod sanitizer;
pub mod serializer;
pub mod style;
pub mod tokenizer;

#[cfg(test)]
mod tests_serializer;

pub use deserializer::{deserialize, deserialize_fragment};
pub use error::{format_errors, ParseError, ParseErrors, ParseResult};
pub use node::{
    keys, Block, BlockKind, Data, Document, Inline, InlineKind, Mark, MarkKind, Node, NodeType, Path, Text,
};
pub use parser::{parse_markup, parse_markup_strict, Parser};
pub use sanitizer::{sanitize, sanitize_fragment};
pub use serializer::{serialize, Serializer};
pub use style::FontTable;
