//! Storage layer
//!
//! Reads the bookmark file and writes it back with an atomic
//! write-to-temp-then-rename, so no partially written file is ever visible.
//!
//! There is no file locking: if two processes load, edit and save the same
//! file, the last save wins.

pub mod error;
pub mod persistence;

pub use error::IoError;
pub use persistence::FilePersistence;
