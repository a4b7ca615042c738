//! Plaintext bookmark format
//!
//! Version 1 of the on-disk format looks like this:
//!
//! ```text
//! # plainmark v1
//!
//! [1] https://example.com/
//! title: Example Domain
//! tags: reference, web
//! added: 2026-10-18T09:30:00Z
//! notes:
//!     First paragraph of notes.
//!
//!     Second paragraph.
//! ```
//!
//! - An entry starts at a header line `[<id>] <url>` and runs until a blank
//!   line, a `#` comment, the next header, or end of input.
//! - Field lines are `key: value`. Known keys are `title`, `tags`
//!   (comma-separated), `added` (RFC 3339) and `notes`; other keys are kept
//!   as extra fields. Each key may appear once per entry.
//! - `notes:` is followed by lines indented by four spaces. Blank lines
//!   inside notes are allowed as long as an indented line follows.
//! - Blank lines and `#` comments outside entries are kept verbatim. So is
//!   anything that fails to parse, with a warning.
//!
//! Loaded entries that are never modified are written back byte for byte.

mod parse;
mod render;

use thiserror::Error;

use crate::record::RecordId;

pub use parse::parse;
pub use render::{render, render_record};

/// Newest format version this crate reads and writes
pub const FORMAT_VERSION: u32 = 1;

/// Prefix of the version comment at the top of a file
pub const VERSION_PREFIX: &str = "# plainmark v";

/// Indentation written before each notes line
pub const NOTES_INDENT: &str = "    ";

/// The comment line written at the top of new files
pub fn version_header() -> String {
    format!("{}{}", VERSION_PREFIX, FORMAT_VERSION)
}

/// Errors that make a whole file unusable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Two entries share an id, usually from a bad manual edit or merge
    #[error("Duplicate bookmark id {id} on line {line} (first used on line {first_line})")]
    DuplicateId {
        id: RecordId,
        line: usize,
        first_line: usize,
    },

    /// File was written by a newer version of the format
    #[error("Unsupported format version v{found} (newest supported is v{supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// File content is not UTF-8
    #[error("File is not valid UTF-8 (first invalid byte at offset {offset})")]
    InvalidEncoding { offset: usize },
}

/// Why an entry was kept as passthrough
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Header line is not `[<id>] <url>`
    BadHeader,
    /// Line inside an entry is neither a field nor a notes line
    UnrecognizedLine,
    /// Same field given twice in one entry
    DuplicateField,
    /// Field value failed validation
    InvalidField,
    /// Text outside any entry that is not blank or a comment
    StrayLine,
}

/// A non-fatal problem found while parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// 1-based line number
    pub line: usize,
    pub kind: WarningKind,
    pub message: String,
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Result of a successful parse
#[derive(Debug, Clone, Default)]
pub struct Parsed {
    pub document: crate::document::Document,
    pub warnings: Vec<ParseWarning>,
    /// Highest id named by an entry that was kept as passthrough
    ///
    /// That entry still owns its id, so new records must not take it.
    pub reserved_max_id: Option<RecordId>,
}
