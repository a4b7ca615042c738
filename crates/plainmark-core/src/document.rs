//! In-memory form of a bookmark file
//!
//! A `Document` is the ordered list of everything in the file: parsed
//! records and the passthrough text around them (comments, blank lines,
//! entries that failed to parse). Keeping both in order is what lets a save
//! reproduce the parts of the file nobody touched.

use crate::record::{Record, RecordId};

/// Opaque text kept verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passthrough {
    pub text: String,
}

impl Passthrough {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// True if every line is blank
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    fn ends_with_blank_line(&self) -> bool {
        self.text.lines().last().is_some_and(|l| l.trim().is_empty())
    }

    fn starts_with_blank_line(&self) -> bool {
        self.text.lines().next().is_some_and(|l| l.trim().is_empty())
    }

    /// Drop the first line, terminator included
    fn drop_first_line(&mut self) {
        let cut = self.text.find('\n').map_or(self.text.len(), |i| i + 1);
        self.text.drain(..cut);
    }
}

/// One unit of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    Record(Record),
    Passthrough(Passthrough),
}

impl Unit {
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Unit::Record(record) => Some(record),
            Unit::Passthrough(_) => None,
        }
    }
}

/// Ordered records and passthrough blocks for one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    units: Vec<Unit>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Iterate over records in file order
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.units.iter().filter_map(Unit::as_record)
    }

    pub fn record_at(&self, position: usize) -> Option<&Record> {
        self.units.get(position).and_then(Unit::as_record)
    }

    /// Append a record
    pub fn push_record(&mut self, record: Record) {
        self.units.push(Unit::Record(record));
    }

    /// Append passthrough text, merging with a passthrough block at the end
    pub fn push_passthrough(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.units.last_mut() {
            Some(Unit::Passthrough(block)) => block.text.push_str(text),
            _ => self.units.push(Unit::Passthrough(Passthrough::new(text))),
        }
    }

    /// True if the rendered file would end with a blank line
    pub fn ends_with_blank_line(&self) -> bool {
        match self.units.last() {
            Some(Unit::Passthrough(block)) => block.ends_with_blank_line(),
            _ => false,
        }
    }

    /// Append a blank separator line unless the document is empty or
    /// already ends with one
    pub fn push_separator(&mut self) {
        if self.is_empty() || self.ends_with_blank_line() {
            return;
        }
        match self.units.last() {
            Some(Unit::Passthrough(block)) if !block.text.ends_with('\n') => {
                self.push_passthrough("\n\n")
            }
            _ => self.push_passthrough("\n"),
        }
    }

    /// Replace the record at a position
    pub fn replace_record(&mut self, position: usize, record: Record) -> Option<Record> {
        match self.units.get_mut(position) {
            Some(Unit::Record(existing)) => Some(std::mem::replace(existing, record)),
            _ => None,
        }
    }

    /// Remove the record at a position
    ///
    /// The blank separator that used to sit between the removed entry and
    /// its neighbours is collapsed so repeated removals do not pile up
    /// empty lines.
    pub fn remove_record(&mut self, position: usize) -> Option<Record> {
        if !matches!(self.units.get(position), Some(Unit::Record(_))) {
            return None;
        }
        let Unit::Record(record) = self.units.remove(position) else {
            return None;
        };

        if position > 0 && position < self.units.len() {
            self.merge_passthrough_seam(position);
        } else if position == self.units.len() && position > 0 {
            // Removed the last unit; drop a trailing separator left behind.
            if matches!(&self.units[position - 1], Unit::Passthrough(p) if p.is_blank())
                && position >= 2
                && matches!(self.units[position - 2], Unit::Record(_))
            {
                self.units.pop();
            }
        } else if position == 0 {
            if let Some(Unit::Passthrough(next)) = self.units.first_mut() {
                if next.is_blank() {
                    self.units.remove(0);
                }
            }
        }

        Some(record)
    }

    /// Merge two passthrough blocks that became adjacent at `position`
    fn merge_passthrough_seam(&mut self, position: usize) {
        let (Unit::Passthrough(_), Unit::Passthrough(_)) =
            (&self.units[position - 1], &self.units[position])
        else {
            return;
        };
        let Unit::Passthrough(mut next) = self.units.remove(position) else {
            return;
        };
        if let Unit::Passthrough(prev) = &mut self.units[position - 1] {
            if prev.ends_with_blank_line() && next.starts_with_blank_line() {
                next.drop_first_line();
            }
            prev.text.push_str(&next.text);
        }
    }

    /// Largest id in the document
    pub fn max_id(&self) -> Option<RecordId> {
        self.records().map(|r| r.id).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{validate, Draft};

    fn record(id: u64) -> Record {
        validate(Draft::new(format!("https://{}.example", id)), RecordId(id)).unwrap()
    }

    fn doc_with_separators() -> Document {
        let mut doc = Document::new();
        doc.push_passthrough("# header\n\n");
        doc.push_record(record(1));
        doc.push_passthrough("\n");
        doc.push_record(record(2));
        doc.push_passthrough("\n");
        doc.push_record(record(3));
        doc
    }

    #[test]
    fn test_push_passthrough_merges() {
        let mut doc = Document::new();
        doc.push_passthrough("# a\n");
        doc.push_passthrough("\n");
        assert_eq!(doc.units().len(), 1);
        assert!(doc.ends_with_blank_line());

        doc.push_record(record(1));
        doc.push_passthrough("# b\n");
        assert_eq!(doc.units().len(), 3);
        assert!(!doc.ends_with_blank_line());
    }

    #[test]
    fn test_push_separator() {
        let mut doc = Document::new();
        doc.push_separator();
        assert!(doc.is_empty());

        doc.push_record(record(1));
        doc.push_separator();
        assert_eq!(doc.units()[1], Unit::Passthrough(Passthrough::new("\n")));

        // Already blank, nothing added
        doc.push_separator();
        assert_eq!(doc.units().len(), 2);

        let mut doc = Document::new();
        doc.push_passthrough("# no newline");
        doc.push_separator();
        assert_eq!(
            doc.units()[0],
            Unit::Passthrough(Passthrough::new("# no newline\n\n"))
        );
    }

    #[test]
    fn test_remove_middle_collapses_separator() {
        let mut doc = doc_with_separators();
        let removed = doc.remove_record(3).unwrap();
        assert_eq!(removed.id, RecordId(2));

        assert_eq!(doc.units().len(), 4);
        assert_eq!(
            doc.units()[2],
            Unit::Passthrough(Passthrough::new("\n"))
        );
    }

    #[test]
    fn test_remove_last_drops_trailing_separator() {
        let mut doc = doc_with_separators();
        doc.remove_record(5).unwrap();
        assert_eq!(doc.units().len(), 4);
        assert!(matches!(doc.units().last(), Some(Unit::Record(r)) if r.id == RecordId(2)));
    }

    #[test]
    fn test_remove_first_record_keeps_header() {
        let mut doc = doc_with_separators();
        doc.remove_record(1).unwrap();
        assert_eq!(
            doc.units()[0],
            Unit::Passthrough(Passthrough::new("# header\n\n"))
        );
        assert_eq!(doc.records().count(), 2);
    }

    #[test]
    fn test_remove_non_record_is_noop() {
        let mut doc = doc_with_separators();
        let before = doc.clone();
        assert!(doc.remove_record(0).is_none());
        assert!(doc.remove_record(99).is_none());
        assert_eq!(doc, before);
    }

    #[test]
    fn test_replace_and_max_id() {
        let mut doc = doc_with_separators();
        assert_eq!(doc.record_at(5).map(|r| r.id), Some(RecordId(3)));
        assert_eq!(doc.max_id(), Some(RecordId(3)));

        let mut replacement = record(2);
        replacement.title = Some("two".to_string());
        let old = doc.replace_record(3, replacement).unwrap();
        assert!(old.title.is_none());
        assert_eq!(doc.record_at(3).unwrap().title.as_deref(), Some("two"));
        assert!(doc.replace_record(0, record(9)).is_none());
    }
}
