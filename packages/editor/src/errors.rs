//! Error types for the editor

use ontask_document::Path;
use thiserror::Error;

/// An operation addressed a node that does not exist or has the wrong shape.
///
/// Never leaves the editor: the controller logs it and discards the
/// transaction that produced it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    #[error("Node not found: {0}")]
    NodeNotFound(Path),

    #[error("Parent not found: {0}")]
    ParentNotFound(Path),

    #[error("Index {index} out of bounds under {parent}")]
    IndexOutOfBounds { parent: Path, index: usize },

    #[error("Node is not text: {0}")]
    NotText(Path),

    #[error("Offset {offset} out of bounds in {path}")]
    OffsetOutOfBounds { path: Path, offset: usize },

    #[error("Cannot merge {0} into its previous sibling")]
    CannotMerge(Path),

    #[error("Properties do not match the node at {0}")]
    PropertiesMismatch(Path),

    #[error("Path reference was removed")]
    DanglingReference,
}

pub type OpResult<T = ()> = Result<T, OperationError>;

/// Save/preview failure reported by the content collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Failed(String),

    #[error("Request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation error: {0}")]
    Operation(#[from] OperationError),
}
