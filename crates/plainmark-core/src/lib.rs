//! plainmark Core Library
//!
//! This crate provides the store engine for plainmark, a plaintext bookmark
//! manager. Bookmarks live in a human-editable text file that can be kept
//! in version control and edited by hand.
//!
//! # Architecture
//!
//! - **Text file**: Source of truth, rewritten atomically on save
//! - **Document**: Parsed records plus the comments and unparseable text
//!   around them, in file order
//! - **Index**: In-memory lookups by id, tag, URL and text, rebuilt on
//!   every change
//!
//! # Quick Start
//!
//! ```text
//! let mut store = Store::open(&Config::load()?)?;
//!
//! // Add a bookmark
//! let added = store.add(Draft::new("https://example.com").with_tags(["web"]))?;
//!
//! // Query bookmarks
//! let web = store.query(&Filter::tag("web"));
//!
//! store.save()?;
//! ```
//!
//! # Modules
//!
//! - `store`: Load, query, mutate and save a bookmark file (main entry point)
//! - `record`: Bookmark records and validation
//! - `format`: The on-disk text format
//! - `document`: Records and passthrough text in file order
//! - `index`: Derived lookup tables
//! - `query`: Composable filters
//! - `storage`: File reads and atomic writes
//! - `config`: Application configuration

pub mod config;
pub mod document;
pub mod error;
pub mod format;
pub mod index;
pub mod query;
pub mod record;
pub mod storage;
pub mod store;

pub use config::Config;
pub use document::{Document, Passthrough, Unit};
pub use error::{NotFoundError, StoreError, StoreResult};
pub use format::{FormatError, ParseWarning, WarningKind};
pub use index::Index;
pub use query::Filter;
pub use record::{Draft, ExtraField, Record, RecordId, RecordPatch, Tags, ValidationError};
pub use storage::{FilePersistence, IoError};
pub use store::{Added, Store, StoreState};
