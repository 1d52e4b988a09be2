//! Free-text search queries turned into store filters.
//!
//! `foo -bar` keeps notes whose title or content contains `foo` and neither
//! of which contains `bar`. Matching is case-insensitive.

use serde::Deserialize;

use crate::store::{Filter, ListOptions, MatchCase, NoteField, Pagination, SortField, SortOrder};

pub const EXCLUDE_PREFIX: char = '-';

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchTerms {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl SearchTerms {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

/// Split on whitespace. A token starting with `-` is an exclusion; a bare
/// `-` carries no term and is dropped.
pub fn parse_query(query: &str) -> SearchTerms {
    let mut terms = SearchTerms::default();
    for token in query.split_whitespace() {
        match token.strip_prefix(EXCLUDE_PREFIX) {
            Some("") => {}
            Some(term) => terms.exclude.push(term.to_string()),
            None => terms.include.push(token.to_string()),
        }
    }
    terms
}

fn title_or_content(term: &str) -> Filter {
    Filter::Or(vec![
        Filter::contains(NoteField::Title, term, MatchCase::Insensitive),
        Filter::contains(NoteField::Content, term, MatchCase::Insensitive),
    ])
}

/// Every inclusion term matches and no exclusion term does.
/// An empty query matches every note.
pub fn build_predicate(query: &str) -> Filter {
    let terms = parse_query(query);
    if terms.is_empty() {
        return Filter::All;
    }
    let included = terms.include.iter().map(|t| title_or_content(t));
    let excluded = terms.exclude.iter().map(|t| title_or_content(t).negate());
    Filter::And(included.chain(excluded).collect())
}

/// Search parameters of a listing request.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchFilter {
    pub query: String,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub pinned_first: bool,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            query: String::new(),
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            pinned_first: true,
        }
    }
}

impl SearchFilter {
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn predicate(&self) -> Filter {
        build_predicate(&self.query)
    }

    pub fn list_options(&self, pagination: Pagination) -> ListOptions {
        ListOptions {
            sort_by: self.sort_by,
            sort_order: self.sort_order,
            pinned_first: self.pinned_first,
            pagination: Some(pagination.clamped()),
        }
    }
}
