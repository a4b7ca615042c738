//! Bookmark records
//!
//! Defines the validated `Record` type, the unvalidated `Draft` and
//! `RecordPatch` inputs, and the normalization rules for tags and URLs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::{Position, Url};

/// Errors raised when user input cannot become a valid record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("URL must not be empty")]
    EmptyUrl,

    #[error("Invalid URL '{0}': URLs cannot contain whitespace or control characters")]
    InvalidUrl(String),

    #[error("Title must be a single line")]
    MultilineTitle,

    #[error("Invalid tag '{0}': tags cannot contain commas or line breaks")]
    InvalidTag(String),

    #[error("Invalid field name '{0}'")]
    InvalidFieldName(String),

    #[error("Value of field '{0}' must be a single line")]
    MultilineField(String),

    #[error("Field '{0}' is given more than once")]
    DuplicateField(String),
}

/// Field names the entry format gives a meaning of its own
const RESERVED_FIELDS: [&str; 4] = ["title", "tags", "added", "notes"];

/// Stable identifier of a bookmark within one store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    /// The id following this one, or `None` once the id space is used up
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A normalized set of tags
///
/// Equality ignores order; iteration yields tags in the order they were
/// first added.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<String>);

impl Tags {
    /// Normalize raw tags: trim, lowercase, drop empties, dedupe
    pub fn normalize<I, S>(raw: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tags = Self::default();
        for tag in raw {
            let tag = tag.as_ref();
            if tag.contains([',', '\n', '\r']) {
                return Err(ValidationError::InvalidTag(tag.to_string()));
            }
            tags.insert(tag);
        }
        Ok(tags)
    }

    /// Insert a tag, returning false if it was empty or already present
    fn insert(&mut self, tag: &str) -> bool {
        let tag = normalize_tag(tag);
        if tag.is_empty() || self.0.contains(&tag) {
            return false;
        }
        self.0.push(tag);
        true
    }

    pub fn contains(&self, tag: &str) -> bool {
        let tag = normalize_tag(tag);
        self.0.iter().any(|t| *t == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tags joined with ", " as written in the `tags:` field
    pub fn joined(&self) -> String {
        self.0.join(", ")
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }
}

impl PartialEq for Tags {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().all(|t| other.0.contains(t))
    }
}

impl Eq for Tags {}

/// An unrecognized `key: value` line kept from the source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraField {
    pub key: String,
    pub value: String,
}

/// The text region a record was parsed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSpan {
    /// First line of the entry (1-based)
    pub start_line: usize,
    /// Last line of the entry (1-based, inclusive)
    pub end_line: usize,
    /// The verbatim text, including line terminators
    pub text: String,
}

/// A validated bookmark
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub url: String,
    pub title: Option<String>,
    pub tags: Tags,
    pub notes: Option<String>,
    /// When the bookmark was added
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<DateTime<Utc>>,
    /// Fields this version does not know about
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<ExtraField>,
    /// Source text for records loaded from disk and not modified since
    #[serde(skip)]
    pub raw_span: Option<RawSpan>,
}

// Equality is about bookmark content, not where it came from.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.url == other.url
            && self.title == other.title
            && self.tags == other.tags
            && self.notes == other.notes
            && self.added == other.added
            && self.extra == other.extra
    }
}

impl Eq for Record {}

impl Record {
    /// Title if present, otherwise the URL
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }

    /// Convert back into an editable draft
    pub fn to_draft(&self) -> Draft {
        Draft {
            url: self.url.clone(),
            title: self.title.clone(),
            tags: self.tags.to_vec(),
            notes: self.notes.clone(),
            extra: self.extra.clone(),
        }
    }

    /// Merge a patch into this record and re-validate
    ///
    /// The result keeps the id, `added` timestamp and extra fields but
    /// loses the raw span, so it renders in canonical form.
    pub fn apply(&self, patch: &RecordPatch) -> Result<Record, ValidationError> {
        let mut draft = self.to_draft();

        if let Some(url) = &patch.url {
            draft.url = url.clone();
        }
        if let Some(title) = &patch.title {
            draft.title = title.clone();
        }
        if let Some(tags) = &patch.tags {
            draft.tags = tags.clone();
        }
        if !patch.remove_tags.is_empty() {
            let removed: Vec<String> = patch.remove_tags.iter().map(|t| normalize_tag(t)).collect();
            draft.tags.retain(|t| !removed.contains(&normalize_tag(t)));
        }
        draft.tags.extend(patch.add_tags.iter().cloned());
        if let Some(notes) = &patch.notes {
            draft.notes = notes.clone();
        }

        let mut record = validate(draft, self.id)?;
        record.added = self.added;
        Ok(record)
    }
}

/// Unvalidated bookmark input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub url: String,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    /// Additional `key: value` fields, written after the known ones
    pub extra: Vec<ExtraField>,
}

impl Draft {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push(ExtraField {
            key: key.into(),
            value: value.into(),
        });
        self
    }
}

/// Changes to apply to an existing record
///
/// `None` leaves a field alone. For `title` and `notes`, `Some(None)`
/// clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub url: Option<String>,
    pub title: Option<Option<String>>,
    /// Replaces the whole tag set
    pub tags: Option<Vec<String>>,
    pub add_tags: Vec<String>,
    pub remove_tags: Vec<String>,
    pub notes: Option<Option<String>>,
}

impl RecordPatch {
    /// True if applying this patch cannot change anything
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Validate a draft into a record with the given id
pub fn validate(draft: Draft, id: RecordId) -> Result<Record, ValidationError> {
    let url = draft.url.trim();
    if url.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }
    if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::InvalidUrl(url.to_string()));
    }

    let title = match draft.title.as_deref().map(str::trim) {
        Some(t) if t.contains(['\n', '\r']) => return Err(ValidationError::MultilineTitle),
        Some(t) if !t.is_empty() => Some(t.to_string()),
        _ => None,
    };

    let mut extra: Vec<ExtraField> = Vec::with_capacity(draft.extra.len());
    for field in &draft.extra {
        if RESERVED_FIELDS.contains(&field.key.as_str()) {
            return Err(ValidationError::InvalidFieldName(field.key.clone()));
        }
        if extra.iter().any(|f| f.key == field.key) {
            return Err(ValidationError::DuplicateField(field.key.clone()));
        }
        extra.push(validate_extra(&field.key, &field.value)?);
    }

    Ok(Record {
        id,
        url: url.to_string(),
        title,
        tags: Tags::normalize(&draft.tags)?,
        notes: draft.notes.as_deref().and_then(normalize_notes),
        added: None,
        extra,
        raw_span: None,
    })
}

/// Validate an extra field read from text
pub fn validate_extra(key: &str, value: &str) -> Result<ExtraField, ValidationError> {
    if !is_field_name(key) {
        return Err(ValidationError::InvalidFieldName(key.to_string()));
    }
    if value.contains(['\n', '\r']) {
        return Err(ValidationError::MultilineField(key.to_string()));
    }
    Ok(ExtraField {
        key: key.to_string(),
        value: value.trim().to_string(),
    })
}

/// Field names are non-empty lowercase ASCII alphanumerics, `_` and `-`
pub fn is_field_name(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
}

/// Normalize a single tag: trim and lowercase
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Normalize notes text
///
/// Every line break becomes `\n`, whitespace-only lines become empty and
/// blank lines at either end are dropped, so notes always survive a trip
/// through the indented format.
fn normalize_notes(notes: &str) -> Option<String> {
    let notes = notes.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = notes
        .split('\n')
        .map(|l| if l.trim().is_empty() { "" } else { l })
        .collect();

    let start = lines.iter().position(|l| !l.is_empty())?;
    let end = lines.iter().rposition(|l| !l.is_empty())?;
    Some(lines[start..=end].join("\n"))
}

/// Normalize a URL for duplicate detection
///
/// URLs that parse have their scheme and host lowercased by the parser and
/// trailing slashes stripped from the path. Anything else is trimmed and
/// loses its trailing slashes, so the function works on any string.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    match Url::parse(url) {
        Ok(parsed) => {
            let mut normalized = parsed[..Position::BeforePath].to_string();
            normalized.push_str(parsed.path().trim_end_matches('/'));
            normalized.push_str(&parsed[Position::AfterPath..]);
            normalized
        }
        Err(_) => url.trim_end_matches('/').to_string(),
    }
}
