//! Composable bookmark filters

use std::collections::BTreeSet;

use crate::index::Index;
use crate::record::RecordId;

/// A predicate over bookmarks, evaluated against an `Index`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Filter {
    /// Every bookmark
    #[default]
    All,
    /// Bookmarks carrying a tag (case-insensitive)
    Tag(String),
    /// Bookmarks whose URL, title or notes contain the text (case-insensitive)
    Text(String),
    /// Bookmarks whose URL normalizes to the same value
    Url(String),
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn tag(tag: impl Into<String>) -> Self {
        Filter::Tag(tag.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Filter::Text(text.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        Filter::Url(url.into())
    }

    pub fn and(self, other: Filter) -> Self {
        Filter::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Filter) -> Self {
        Filter::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Filter::Not(Box::new(self))
    }

    /// All of the given filters; `All` when empty
    pub fn all_of(filters: impl IntoIterator<Item = Filter>) -> Self {
        filters
            .into_iter()
            .reduce(Filter::and)
            .unwrap_or(Filter::All)
    }

    /// Ids matching this filter
    pub fn matching(&self, index: &Index) -> BTreeSet<RecordId> {
        match self {
            Filter::All => index.ids().collect(),
            Filter::Tag(tag) => index.by_tag(tag),
            Filter::Text(text) => index.find(text).collect(),
            Filter::Url(url) => index.duplicates_of(url),
            Filter::And(a, b) => {
                let left = a.matching(index);
                if left.is_empty() {
                    return left;
                }
                left.intersection(&b.matching(index)).copied().collect()
            }
            Filter::Or(a, b) => {
                let mut left = a.matching(index);
                left.extend(b.matching(index));
                left
            }
            Filter::Not(inner) => {
                let excluded = inner.matching(index);
                index.ids().filter(|id| !excluded.contains(id)).collect()
            }
        }
    }
}
