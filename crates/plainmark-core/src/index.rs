//! In-memory lookup structures over a `Document`
//!
//! The index is derived state: it is rebuilt from scratch whenever the
//! document changes shape and is never written to disk.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::document::{Document, Unit};
use crate::record::{normalize_tag, normalize_url, RecordId};

/// Lookup tables for one document
#[derive(Debug, Clone, Default)]
pub struct Index {
    positions: HashMap<RecordId, usize>,
    tags: HashMap<String, BTreeSet<RecordId>>,
    urls: HashMap<String, BTreeSet<RecordId>>,
    /// Record ids in document order, with the lowercased url, title and notes
    haystacks: Vec<(RecordId, Vec<String>)>,
}

impl Index {
    /// Build an index in one pass over the document
    pub fn build(doc: &Document) -> Self {
        let mut index = Self::default();

        for (position, unit) in doc.units().iter().enumerate() {
            let Unit::Record(record) = unit else {
                continue;
            };

            index.positions.insert(record.id, position);
            for tag in record.tags.iter() {
                index
                    .tags
                    .entry(tag.to_string())
                    .or_default()
                    .insert(record.id);
            }
            index
                .urls
                .entry(normalize_url(&record.url))
                .or_default()
                .insert(record.id);

            let fields = std::iter::once(&record.url)
                .chain(record.title.iter())
                .chain(record.notes.iter())
                .map(|text| text.to_lowercase())
                .collect();
            index.haystacks.push((record.id, fields));
        }

        index
    }

    /// Position of a record in the document
    pub fn by_id(&self, id: RecordId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Ids of records carrying a tag (case-insensitive)
    pub fn by_tag(&self, tag: &str) -> BTreeSet<RecordId> {
        self.tags
            .get(&normalize_tag(tag))
            .cloned()
            .unwrap_or_default()
    }

    /// Ids of records whose URL, title or notes contain `needle`,
    /// ignoring case
    ///
    /// Each field is matched on its own, so a needle never spans two fields.
    pub fn find(&self, needle: &str) -> Find<'_> {
        Find {
            entries: self.haystacks.iter(),
            needle: needle.to_lowercase(),
        }
    }

    /// Ids of records with the same normalized URL
    pub fn duplicates_of(&self, url: &str) -> BTreeSet<RecordId> {
        self.urls
            .get(&normalize_url(url))
            .cloned()
            .unwrap_or_default()
    }

    /// All ids in document order
    pub fn ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.haystacks.iter().map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.haystacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.haystacks.is_empty()
    }

    /// Every tag with the number of records using it, sorted by tag
    pub fn tags_with_counts(&self) -> Vec<(String, usize)> {
        self.tags
            .iter()
            .map(|(tag, ids)| (tag.clone(), ids.len()))
            .collect::<BTreeMap<_, _>>()
            .into_iter()
            .collect()
    }
}

/// Lazy substring search over an index
///
/// Clone it to restart the search from the beginning.
#[derive(Debug, Clone)]
pub struct Find<'a> {
    entries: std::slice::Iter<'a, (RecordId, Vec<String>)>,
    needle: String,
}

impl Iterator for Find<'_> {
    type Item = RecordId;

    fn next(&mut self) -> Option<Self::Item> {
        let needle = &self.needle;
        self.entries
            .find(|(_, fields)| fields.iter().any(|field| field.contains(needle.as_str())))
            .map(|(id, _)| *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::parse;

    const TEXT: &str = "\
# bookmarks

[1] https://rust-lang.org/
title: Rust Programming Language
tags: rust, lang

[2] https://python.org
title: Python
tags: lang
notes:
    Batteries included.

[5] HTTPS://Rust-Lang.org
tags: Rust
";

    fn index() -> Index {
        Index::build(&parse(TEXT).unwrap().document)
    }

    #[test]
    fn test_by_id() {
        let index = index();
        assert_eq!(index.by_id(RecordId(1)), Some(1));
        assert_eq!(index.by_id(RecordId(2)), Some(3));
        assert_eq!(index.by_id(RecordId(5)), Some(5));
        assert_eq!(index.by_id(RecordId(3)), None);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_by_tag_is_case_insensitive() {
        let index = index();
        let ids: Vec<_> = index.by_tag(" RUST ").into_iter().collect();
        assert_eq!(ids, vec![RecordId(1), RecordId(5)]);
        assert_eq!(index.by_tag("lang").len(), 2);
        assert!(index.by_tag("missing").is_empty());
    }

    #[test]
    fn test_find() {
        let index = index();
        let ids: Vec<_> = index.find("PROGRAMMING").collect();
        assert_eq!(ids, vec![RecordId(1)]);

        let ids: Vec<_> = index.find("batteries").collect();
        assert_eq!(ids, vec![RecordId(2)]);

        let ids: Vec<_> = index.find("rust-lang").collect();
        assert_eq!(ids, vec![RecordId(1), RecordId(5)]);

        assert_eq!(index.find("").count(), 3);
        assert_eq!(index.find("nothing here").count(), 0);
    }

    #[test]
    fn test_find_does_not_span_fields() {
        let index = index();
        assert_eq!(index.find("python\nbatteries").count(), 0);
        assert_eq!(index.find("python.org\npython").count(), 0);
        assert_eq!(index.find("org python").count(), 0);

        // Newlines inside notes still match
        let doc = parse("[1] https://a.com\nnotes:\n    one\n    two\n").unwrap().document;
        let ids: Vec<_> = Index::build(&doc).find("ONE\nTWO").collect();
        assert_eq!(ids, vec![RecordId(1)]);
    }

    #[test]
    fn test_find_is_restartable() {
        let index = index();
        let mut search = index.find("lang");
        let restart = search.clone();
        assert_eq!(search.next(), Some(RecordId(1)));
        assert_eq!(restart.collect::<Vec<_>>().len(), 2);
    }

    #[test]
    fn test_duplicates_of() {
        let index = index();
        let dupes: Vec<_> = index
            .duplicates_of("https://RUST-LANG.org")
            .into_iter()
            .collect();
        assert_eq!(dupes, vec![RecordId(1), RecordId(5)]);
        assert!(index.duplicates_of("https://go.dev").is_empty());
    }

    #[test]
    fn test_tags_with_counts() {
        let index = index();
        assert_eq!(
            index.tags_with_counts(),
            vec![("lang".to_string(), 2), ("rust".to_string(), 2)]
        );
    }

    #[test]
    fn test_ids_in_document_order() {
        let index = index();
        let ids: Vec<_> = index.ids().collect();
        assert_eq!(ids, vec![RecordId(1), RecordId(2), RecordId(5)]);
    }
}
