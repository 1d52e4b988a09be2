//! Composable note predicates handed to the store.

use serde::{Deserialize, Serialize};

use super::{Note, TagId};

/// Which text column a [`Filter::Contains`] looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoteField {
    Title,
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchCase {
    Sensitive,
    /// ASCII case folding, the same folding SQLite's `lower()` applies.
    Insensitive,
}

/// A predicate tree over notes.
///
/// Stores render this to their own query language; [`Filter::matches`]
/// evaluates the same tree in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Filter {
    All,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Contains {
        field: NoteField,
        needle: String,
        case: MatchCase,
    },
    HasTag(TagId),
}

impl Filter {
    pub fn contains(field: NoteField, needle: impl Into<String>, case: MatchCase) -> Self {
        Filter::Contains {
            field,
            needle: needle.into(),
            case,
        }
    }

    pub fn negate(self) -> Self {
        Filter::Not(Box::new(self))
    }

    /// AND two filters, flattening trivially true operands.
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), f) => {
                left.push(f);
                Filter::And(left)
            }
            (f, other) => Filter::And(vec![f, other]),
        }
    }

    /// Evaluate against a note. `tags` are the ids of the note's tags.
    pub fn matches(&self, note: &Note, tags: &[TagId]) -> bool {
        match self {
            Filter::All => true,
            Filter::And(filters) => filters.iter().all(|f| f.matches(note, tags)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(note, tags)),
            Filter::Not(inner) => !inner.matches(note, tags),
            Filter::Contains {
                field,
                needle,
                case,
            } => {
                let haystack = match field {
                    NoteField::Title => &note.title,
                    NoteField::Content => &note.content,
                };
                match case {
                    MatchCase::Sensitive => haystack.contains(needle.as_str()),
                    MatchCase::Insensitive => haystack
                        .to_ascii_lowercase()
                        .contains(&needle.to_ascii_lowercase()),
                }
            }
            Filter::HasTag(tag) => tags.contains(tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn note(title: &str, content: &str) -> Note {
        Note {
            id: 1,
            title: title.to_string(),
            content: content.to_string(),
            pinned: false,
            order: 0,
            layout: "default".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_and_is_true_and_empty_or_is_false() {
        let n = note("a", "b");
        assert!(Filter::And(vec![]).matches(&n, &[]));
        assert!(!Filter::Or(vec![]).matches(&n, &[]));
        assert!(Filter::All.matches(&n, &[]));
    }

    #[test]
    fn contains_respects_case_mode() {
        let n = note("Rust Notes", "");
        let sensitive = Filter::contains(NoteField::Title, "rust", MatchCase::Sensitive);
        let insensitive = Filter::contains(NoteField::Title, "rust", MatchCase::Insensitive);
        assert!(!sensitive.matches(&n, &[]));
        assert!(insensitive.matches(&n, &[]));
    }

    #[test]
    fn has_tag_checks_the_supplied_tag_ids() {
        let n = note("", "");
        assert!(Filter::HasTag(3).matches(&n, &[1, 3]));
        assert!(!Filter::HasTag(3).matches(&n, &[1]));
        assert!(Filter::HasTag(3).negate().matches(&n, &[]));
    }

    #[test]
    fn and_flattens_all_and_nested_conjunctions() {
        let a = Filter::HasTag(1);
        let b = Filter::HasTag(2);
        assert_eq!(Filter::All.and(a.clone()), a);
        assert_eq!(a.clone().and(Filter::All), a);
        assert_eq!(
            Filter::And(vec![a.clone()]).and(b.clone()),
            Filter::And(vec![a, b])
        );
    }
}
