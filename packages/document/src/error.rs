//! Error types for strict markup parsing.
//!
//! The editor loads markup leniently and never fails; strict parsing is what
//! `ontask-content check` uses to point at malformed input.

use std::ops::Range;
use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseErrors>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Element <{tag}> is never closed")]
    UnclosedElement { tag: String, span: Range<usize> },

    #[error("Closing tag </{tag}> has no matching opening tag")]
    UnmatchedClose { tag: String, span: Range<usize> },

    #[error("Stray '<' is not part of a tag")]
    StrayAngle { span: Range<usize> },
}

impl ParseError {
    pub fn unclosed(tag: impl Into<String>, span: Range<usize>) -> Self {
        Self::UnclosedElement { tag: tag.into(), span }
    }

    pub fn unmatched(tag: impl Into<String>, span: Range<usize>) -> Self {
        Self::UnmatchedClose { tag: tag.into(), span }
    }

    pub fn span(&self) -> Range<usize> {
        match self {
            ParseError::UnclosedElement { span, .. }
            | ParseError::UnmatchedClose { span, .. }
            | ParseError::StrayAngle { span } => span.clone(),
        }
    }
}

/// Every problem found in one strict parse.
#[derive(Error, Debug, Default, Clone, PartialEq, Eq)]
#[error("{} markup error(s)", errors.len())]
pub struct ParseErrors {
    pub errors: Vec<ParseError>,
}

impl ParseErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn push(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }
}

/// Pretty-print errors with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_errors(source: &str, filename: &str, errors: &ParseErrors) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let mut output = Vec::new();

    for error in &errors.errors {
        let span = error.span();
        let label = match error {
            ParseError::UnclosedElement { .. } => "opened here",
            ParseError::UnmatchedClose { .. } => "closes nothing",
            ParseError::StrayAngle { .. } => "escape as &lt;",
        };

        let report = Report::build(ReportKind::Error, filename, span.start)
            .with_message(error.to_string())
            .with_label(
                Label::new((filename, span))
                    .with_color(Color::Red)
                    .with_message(label),
            )
            .finish();

        // Writing into a Vec cannot fail.
        let _ = report.write((filename, Source::from(source)), &mut output);
    }

    String::from_utf8_lossy(&output).into_owned()
}

#[cfg(not(feature = "pretty-errors"))]
pub fn format_errors(_source: &str, filename: &str, errors: &ParseErrors) -> String {
    errors
        .errors
        .iter()
        .map(|error| format!("{}:{:?}: {}\n", filename, error.span(), error))
        .collect()
}
