//! Store errors

use std::path::PathBuf;

use thiserror::Error;

use crate::format::FormatError;
use crate::record::{RecordId, ValidationError};
use crate::storage::IoError;

/// No bookmark has the requested id
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Bookmark not found: {id}")]
pub struct NotFoundError {
    pub id: RecordId,
}

/// Errors returned by `Store` operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// File could not be read or written
    #[error(transparent)]
    Io(#[from] IoError),

    /// File content is unusable
    #[error("Invalid bookmark file '{path}': {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    /// Bad user input
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// The highest possible id is already taken
    #[error("No bookmark ids left: id {last} is already in use")]
    IdsExhausted { last: RecordId },
}

impl StoreError {
    /// True for errors the caller can fix by changing its input
    pub fn is_user_error(&self) -> bool {
        matches!(self, StoreError::Validation(_) | StoreError::NotFound(_))
    }

    /// What the user can do about this error, if anything
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::Io(e) => e.recovery_suggestion(),
            StoreError::Format {
                source: FormatError::DuplicateId { .. },
                ..
            } => Some("Give one of the entries an unused id in a text editor, then run `pmark check`."),
            _ => None,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
