//! Back-references: which notes link to a given note.
//!
//! The store is queried with a substring predicate over serialized content
//! rather than a parsed join. The predicate is deliberately loose: content
//! must mention the `reference` type and the target id's digits, which any
//! serialization of a reference to the target does whatever its whitespace.
//! Candidates are then confirmed: parsed with the extractor when they parse,
//! matched with a whitespace-tolerant `"id": N` pattern when they do not.

use regex::Regex;

use crate::document::{Document, REFERENCE};
use crate::error::NoteResult;
use crate::extract::references;
use crate::store::{Filter, ListOptions, MatchCase, Note, NoteField, NoteId, NoteStore, SortField, SortOrder};

fn content_contains(needle: String) -> Filter {
    Filter::contains(NoteField::Content, needle, MatchCase::Sensitive)
}

/// Store predicate selecting every note whose content may reference `target`.
pub fn reference_filter(target: NoteId) -> Filter {
    Filter::And(vec![
        content_contains(format!("\"{REFERENCE}\"")),
        content_contains(target.to_string()),
    ])
}

/// Textual evidence of a reference to `target`, for content that does not parse.
fn raw_reference_pattern(target: NoteId) -> Option<Regex> {
    let pattern = format!(
        r#""type"\s*:\s*"{REFERENCE}"[\s\S]*?"id"\s*:\s*(?:"\s*{target}\s*"|{target}\b)|"id"\s*:\s*(?:"\s*{target}\s*"|{target}\b)[\s\S]*?"type"\s*:\s*"{REFERENCE}""#
    );
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!("Could not build back-reference pattern for note {}: {}", target, e);
            None
        }
    }
}

/// Whether a candidate really references `target`.
pub fn confirms_reference(content: &str, target: NoteId) -> bool {
    match Document::try_parse(content) {
        Some(doc) => references(&doc).iter().any(|r| r.target == target),
        None => raw_reference_pattern(target).map_or(true, |re| re.is_match(content)),
    }
}

/// Pinned first, then most recently updated.
pub fn back_reference_order() -> ListOptions {
    ListOptions {
        sort_by: SortField::UpdatedAt,
        sort_order: SortOrder::Desc,
        pinned_first: true,
        pagination: None,
    }
}

/// Every note whose content contains a `reference` node targeting `target`.
/// A note referencing itself is included.
pub fn find_back_references<S>(store: &S, target: NoteId) -> NoteResult<Vec<Note>>
where
    S: NoteStore + ?Sized,
{
    let candidates = store
        .list_notes(&reference_filter(target), &back_reference_order())?
        .items;
    let found = candidates.len();
    let confirmed: Vec<Note> = candidates
        .into_iter()
        .filter(|note| confirms_reference(&note.content, target))
        .collect();

    if confirmed.len() != found {
        tracing::debug!(
            "Note {}: {} of {} back-reference candidates were substring false positives",
            target,
            found - confirmed.len(),
            found
        );
    }
    Ok(confirmed)
}
