//! Bookmark store
//!
//! The `Store` owns one bookmark file. It holds the parsed document as the
//! single source of truth and keeps an index derived from it:
//!
//! - the document is loaded once and rewritten in full on `save()`
//! - the index is rebuilt after every mutation
//! - records nobody touched are written back exactly as they were read
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::load("bookmarks.txt")?;
//!
//! let added = store.add(Draft::new("https://a.com").with_tags(["x"]))?;
//! let tagged = store.query(&Filter::tag("x"));
//!
//! store.save()?;
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{SubsecRound, Utc};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::document::Document;
use crate::error::{NotFoundError, StoreError, StoreResult};
use crate::format::{self, FormatError, ParseWarning};
use crate::index::Index;
use crate::query::Filter;
use crate::record::{validate, Draft, Record, RecordId, RecordPatch};
use crate::storage::FilePersistence;

/// Whether the in-memory document matches the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Nothing changed since the last load or save
    Loaded,
    /// Unsaved changes
    Dirty,
}

/// Result of adding a bookmark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Added {
    pub id: RecordId,
    /// Existing bookmarks with the same normalized URL
    pub duplicates: BTreeSet<RecordId>,
}

/// A bookmark file loaded into memory
#[derive(Debug)]
pub struct Store {
    persistence: FilePersistence,
    doc: Document,
    index: Index,
    state: StoreState,
    /// Highest id ever seen or handed out, including ids of unreadable entries
    last_id: Option<RecordId>,
    warnings: Vec<ParseWarning>,
}

impl Store {
    /// Open the bookmark file named by the configuration
    pub fn open(config: &Config) -> StoreResult<Self> {
        Self::load(config.bookmarks_path())
    }

    /// Load a bookmark file
    ///
    /// A missing file is an empty store; the file is created on the first
    /// save. Malformed entries do not fail the load, they are kept as-is
    /// and reported through `warnings()`.
    pub fn load(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let persistence = FilePersistence::new(path);

        let parsed = match persistence.load()? {
            Some(bytes) => {
                let text = String::from_utf8(bytes).map_err(|e| StoreError::Format {
                    path: persistence.path().to_path_buf(),
                    source: FormatError::InvalidEncoding {
                        offset: e.utf8_error().valid_up_to(),
                    },
                })?;
                format::parse(&text).map_err(|source| StoreError::Format {
                    path: persistence.path().to_path_buf(),
                    source,
                })?
            }
            None => {
                debug!("No bookmark file at {:?}, starting empty", persistence.path());
                format::Parsed::default()
            }
        };

        for warning in &parsed.warnings {
            warn!("{:?} {}", persistence.path(), warning);
        }

        let doc = parsed.document;
        let index = Index::build(&doc);
        let last_id = doc.max_id().max(parsed.reserved_max_id);
        debug!(
            "Loaded {} bookmarks from {:?}",
            index.len(),
            persistence.path()
        );

        Ok(Self {
            persistence,
            doc,
            index,
            state: StoreState::Loaded,
            last_id,
            warnings: parsed.warnings,
        })
    }

    /// Add a bookmark and return its id
    ///
    /// Duplicate URLs are reported but never rejected.
    pub fn add(&mut self, draft: Draft) -> StoreResult<Added> {
        let id = match self.last_id {
            Some(last) => last.next().ok_or(StoreError::IdsExhausted { last })?,
            None => RecordId(1),
        };
        let mut record = validate(draft, id)?;
        record.added = Some(Utc::now().trunc_subsecs(0));

        let duplicates = self.index.duplicates_of(&record.url);
        if !duplicates.is_empty() {
            warn!(
                "{} is already bookmarked as {}",
                record.url,
                join_ids(&duplicates)
            );
        }

        if self.doc.is_empty() {
            self.doc
                .push_passthrough(&format!("{}\n\n", format::version_header()));
        } else {
            self.doc.push_separator();
        }
        info!("Added bookmark {}: {}", id, record.url);
        self.doc.push_record(record);
        self.last_id = Some(id);
        self.touch();

        Ok(Added { id, duplicates })
    }

    /// Remove a bookmark
    pub fn remove(&mut self, id: RecordId) -> StoreResult<Record> {
        let position = self.position(id)?;
        let record = self
            .doc
            .remove_record(position)
            .ok_or(NotFoundError { id })?;

        info!("Removed bookmark {}: {}", id, record.url);
        self.touch();
        Ok(record)
    }

    /// Apply a patch to a bookmark, keeping its place in the file
    ///
    /// A patch that changes nothing leaves the record's text and the store
    /// state alone.
    pub fn update(&mut self, id: RecordId, patch: &RecordPatch) -> StoreResult<Record> {
        let position = self.position(id)?;
        let current = self.doc.record_at(position).ok_or(NotFoundError { id })?;

        if patch.is_empty() {
            return Ok(current.clone());
        }
        let updated = current.apply(patch)?;
        if &updated == current {
            debug!("Update of bookmark {} changed nothing", id);
            return Ok(current.clone());
        }

        self.doc.replace_record(position, updated.clone());
        info!("Updated bookmark {}", id);
        self.touch();
        Ok(updated)
    }

    /// Records matching a filter, in file order
    pub fn query(&self, filter: &Filter) -> Vec<&Record> {
        let ids = filter.matching(&self.index);
        self.doc.records().filter(|r| ids.contains(&r.id)).collect()
    }

    /// Write the document back to disk atomically
    pub fn save(&mut self) -> StoreResult<()> {
        let text = format::render(&self.doc);
        self.persistence.save(text.as_bytes())?;
        self.state = StoreState::Loaded;
        info!(
            "Saved {} bookmarks to {:?}",
            self.index.len(),
            self.persistence.path()
        );
        Ok(())
    }

    /// Look up a bookmark by id
    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.index
            .by_id(id)
            .and_then(|position| self.doc.record_at(position))
    }

    /// All bookmarks in file order
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.doc.records()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state == StoreState::Dirty
    }

    /// Path of the bookmark file
    pub fn path(&self) -> &Path {
        self.persistence.path()
    }

    /// Problems found while loading
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    /// Every tag with the number of bookmarks carrying it, sorted by tag
    pub fn tags_with_counts(&self) -> Vec<(String, usize)> {
        self.index.tags_with_counts()
    }

    /// Bookmarks whose URL normalizes to the same form as `url`
    pub fn duplicates_of(&self, url: &str) -> BTreeSet<RecordId> {
        self.index.duplicates_of(url)
    }

    /// The underlying document
    pub fn document(&self) -> &Document {
        &self.doc
    }

    fn position(&self, id: RecordId) -> StoreResult<usize> {
        self.index
            .by_id(id)
            .ok_or_else(|| NotFoundError { id }.into())
    }

    /// Mark dirty and rebuild the index after a mutation
    fn touch(&mut self) {
        self.state = StoreState::Dirty;
        self.index = Index::build(&self.doc);
        debug!("Rebuilt index: {} bookmarks", self.index.len());
    }
}

fn join_ids(ids: &BTreeSet<RecordId>) -> String {
    ids.iter()
        .map(|id| format!("[{}]", id))
        .collect::<Vec<_>>()
        .join(", ")
}
