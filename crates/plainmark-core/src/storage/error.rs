//! File I/O errors
//!
//! Classifies `std::io::Error`s by what went wrong, with descriptive
//! messages and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reading or writing the bookmark file
#[derive(Error, Debug)]
pub enum IoError {
    /// Failed to create the directory holding the file
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read file
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write file
    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Atomic write failed during rename
    #[error("Atomic write failed: could not rename '{from}' to '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl IoError {
    /// Classify an error that happened while reading `path`
    pub fn reading(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => IoError::PermissionDenied {
                path,
                source: error,
            },
            _ => IoError::Read {
                path,
                source: error,
            },
        }
    }

    /// Classify an error that happened while writing `path`
    pub fn writing(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => IoError::PermissionDenied {
                path,
                source: error,
            },
            _ if is_disk_full_error(&error) => IoError::DiskFull {
                path,
                source: error,
            },
            _ => IoError::Write {
                path,
                source: error,
            },
        }
    }

    /// Path the failed operation was working on
    pub fn path(&self) -> &PathBuf {
        match self {
            IoError::CreateDirectory { path, .. }
            | IoError::PermissionDenied { path, .. }
            | IoError::DiskFull { path, .. }
            | IoError::Read { path, .. }
            | IoError::Write { path, .. } => path,
            IoError::AtomicWriteFailed { to, .. } => to,
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            IoError::DiskFull { .. } => Some("Free up disk space and try again."),
            IoError::PermissionDenied { .. } => {
                Some("Check file and directory permissions. You may need to change ownership of the bookmark file.")
            }
            IoError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            IoError::AtomicWriteFailed { .. } => {
                Some("The bookmark file was not changed. Check that the temporary file's directory is on the same filesystem.")
            }
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}
