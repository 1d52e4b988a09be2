//! Read-repair of stale reference titles.
//!
//! A `reference` node caches its target's title. After the target is renamed
//! the cache is stale; reading the referencing note rewrites the cached title
//! in the serialized content and persists the result.
//!
//! The rewrite is textual: a stale title is replaced only inside the object
//! that also holds the target's id, so the rest of the serialized document is
//! preserved byte for byte.

use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::document::Document;
use crate::error::NoteResult;
use crate::extract::{references, Reference};
use crate::store::{Note, NoteChanges, NoteId, NoteStore};

/// One stale `(target, cached title)` pair and the title it should carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TitleCorrection {
    pub target: NoteId,
    pub stale_title: String,
    pub live_title: String,
}

/// A text edit: replace `remove_len` bytes at `offset` with `insert_text`.
#[derive(Debug, PartialEq, Eq)]
pub struct TextEdit {
    /// Byte offset in source
    pub offset: usize,
    /// Number of bytes to remove
    pub remove_len: usize,
    /// Replacement text
    pub insert_text: String,
}

/// Compare cached titles against live ones.
///
/// References whose target has no live title (deleted note) are left alone, as
/// are references without a cached title. Each stale pair appears once.
pub fn stale_titles(
    references: &[Reference],
    live_titles: &HashMap<NoteId, String>,
) -> Vec<TitleCorrection> {
    let mut seen = HashSet::new();
    references
        .iter()
        .filter_map(|reference| {
            let cached = reference.title.as_ref()?;
            let live = live_titles.get(&reference.target)?;
            if cached == live {
                return None;
            }
            let correction = TitleCorrection {
                target: reference.target,
                stale_title: cached.clone(),
                live_title: live.clone(),
            };
            seen.insert(correction.clone()).then_some(correction)
        })
        .collect()
}

/// Byte spans `(start, end)` of every JSON object in `content`, braces inside
/// strings excluded. Unbalanced braces are ignored.
fn object_spans(content: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut open = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, byte) in content.bytes().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => open.push(i),
            b'}' => {
                if let Some(start) = open.pop() {
                    spans.push((start, i + 1));
                }
            }
            _ => {}
        }
    }
    spans
}

/// The smallest object enclosing byte `pos`.
fn innermost(spans: &[(usize, usize)], pos: usize) -> Option<(usize, usize)> {
    spans
        .iter()
        .copied()
        .filter(|&(start, end)| start < pos && pos < end)
        .min_by_key(|&(start, end)| end - start)
}

fn build_pattern(pattern: &str, target: NoteId) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!("Could not build title pattern for note {}: {}", target, e);
            None
        }
    }
}

/// Matches an `"id"` key whose value is `target`, as a number or a string.
fn id_pattern(target: NoteId) -> Option<Regex> {
    build_pattern(&format!(r#""id"\s*:\s*(?:"\s*{target}\s*"|{target}\b)"#), target)
}

/// Matches a `"title"` key holding `stale`. The `title` group spans the JSON string.
fn title_pattern(correction: &TitleCorrection) -> Option<Regex> {
    let title = regex::escape(&serde_json::to_string(&correction.stale_title).ok()?);
    build_pattern(&format!(r#""title"\s*:\s*(?P<title>{title})"#), correction.target)
}

/// Edits that replace every stale cached title in `content`.
///
/// A title is rewritten only when the object it sits in also carries the
/// target's `"id"`, whatever other keys lie between them.
/// Returns edits in reverse offset order for safe sequential application.
pub fn compute_title_edits(content: &str, corrections: &[TitleCorrection]) -> Vec<TextEdit> {
    let spans = object_spans(content);
    let mut edits: Vec<TextEdit> = Vec::new();

    for correction in corrections {
        let (Some(id_re), Some(title_re)) =
            (id_pattern(correction.target), title_pattern(correction))
        else {
            continue;
        };
        let Ok(replacement) = serde_json::to_string(&correction.live_title) else {
            continue;
        };
        let owners: HashSet<(usize, usize)> = id_re
            .find_iter(content)
            .filter_map(|m| innermost(&spans, m.start()))
            .collect();
        if owners.is_empty() {
            continue;
        }
        for cap in title_re.captures_iter(content) {
            let (Some(key), Some(span)) = (cap.get(0), cap.name("title")) else {
                continue;
            };
            if !innermost(&spans, key.start()).is_some_and(|owner| owners.contains(&owner)) {
                continue;
            }
            edits.push(TextEdit {
                offset: span.start(),
                remove_len: span.len(),
                insert_text: replacement.clone(),
            });
        }
    }

    edits.sort_by(|a, b| b.offset.cmp(&a.offset));
    edits.dedup_by_key(|edit| edit.offset);
    edits
}

/// Apply edits that are in reverse offset order.
pub fn apply_edits(content: &str, edits: &[TextEdit]) -> String {
    let mut text = content.to_string();
    for edit in edits {
        text.replace_range(edit.offset..edit.offset + edit.remove_len, &edit.insert_text);
    }
    text
}

/// Pure rewrite step: `None` when nothing in `content` needed changing.
pub fn rewrite_stale_titles(content: &str, corrections: &[TitleCorrection]) -> Option<String> {
    let edits = compute_title_edits(content, corrections);
    if edits.is_empty() {
        return None;
    }
    Some(apply_edits(content, &edits))
}

/// Repair stale reference titles in a freshly loaded note.
///
/// Performs at most one write. Unreadable content, notes without references
/// and notes whose references are all fresh or dangling come back unchanged.
pub fn reconcile_note<S>(store: &S, note: Note) -> NoteResult<Note>
where
    S: NoteStore + ?Sized,
{
    let Some(doc) = Document::try_parse(&note.content) else {
        return Ok(note);
    };
    let refs = references(&doc);
    if refs.is_empty() {
        return Ok(note);
    }

    let targets: BTreeSet<NoteId> = refs.iter().map(|r| r.target).collect();
    let live_titles = store.note_titles(&targets)?;
    let corrections = stale_titles(&refs, &live_titles);
    if corrections.is_empty() {
        return Ok(note);
    }

    let Some(rewritten) = rewrite_stale_titles(&note.content, &corrections) else {
        tracing::warn!(
            "Note {}: {} stale reference titles not found in serialized content",
            note.id,
            corrections.len()
        );
        return Ok(note);
    };

    if let Err(e) = Document::parse(&rewritten) {
        tracing::warn!(
            "Note {}: title rewrite produced unreadable content, keeping original: {}",
            note.id,
            e
        );
        return Ok(note);
    }

    tracing::info!(
        "Note {}: refreshing {} stale reference titles",
        note.id,
        corrections.len()
    );
    store.update_note(note.id, &NoteChanges::content(rewritten))
}
