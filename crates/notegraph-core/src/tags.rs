//! Tag synchronization: a note's tag set is exactly the set of `tag` nodes in
//! its most recently written document.

use std::collections::BTreeSet;

use crate::document::Document;
use crate::error::{NoteError, NoteResult};
use crate::extract::tag_mentions;
use crate::store::{NoteId, NoteStore, TagId};

pub const TAG_PREFIX: char = '@';

/// Distinct tag ids mentioned in serialized `content`.
/// Unreadable content contributes an empty set.
pub fn tag_ids_in(content: &str) -> BTreeSet<TagId> {
    Document::try_parse(content)
        .map(|doc| tag_mentions(&doc).into_iter().map(|m| m.id).collect())
        .unwrap_or_default()
}

/// Replace the note's tag associations with the tags mentioned in `content`.
pub fn sync_note_tags<S>(store: &S, note_id: NoteId, content: &str) -> NoteResult<BTreeSet<TagId>>
where
    S: NoteStore + ?Sized,
{
    let tags = tag_ids_in(content);
    tracing::debug!("Note {}: setting {} tags", note_id, tags.len());
    store.set_note_tags(note_id, &tags)?;
    Ok(tags)
}

/// Canonical tag name: trimmed, with exactly one leading `@`.
pub fn normalize_tag_name(name: &str) -> NoteResult<String> {
    let bare = name.trim().trim_start_matches(TAG_PREFIX).trim();
    if bare.is_empty() {
        return Err(NoteError::InvalidInput("tag name must not be empty".into()));
    }
    if bare.chars().any(char::is_whitespace) {
        return Err(NoteError::InvalidInput(format!(
            "tag name must not contain whitespace: {:?}",
            name
        )));
    }
    Ok(format!("{TAG_PREFIX}{bare}"))
}
