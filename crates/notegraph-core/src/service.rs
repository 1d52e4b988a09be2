//! The operations a transport exposes, wired over a [`NoteStore`].

use serde::Deserialize;
use tracing::info;

use crate::backrefs::find_back_references;
use crate::error::{NoteError, NoteResult};
use crate::graph::{GraphBuilder, NoteGraph};
use crate::markdown::MarkdownConverter;
use crate::reconcile::reconcile_note;
use crate::search::SearchFilter;
use crate::store::{
    Filter, NewNote, Note, NoteChanges, NoteId, NoteStore, Page, Pagination, Tag, TagId, TagUsage,
};
use crate::tags::{normalize_tag_name, sync_note_tags};

/// Client-supplied note fields. Absent fields are left alone on update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NoteInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub layout: Option<String>,
}

/// Content that should drive a tag sync: present and non-empty.
fn syncable(content: &Option<String>) -> Option<&str> {
    content.as_deref().filter(|c| !c.is_empty())
}

pub struct NoteService<S> {
    store: S,
    converter: MarkdownConverter,
    graph: GraphBuilder,
}

impl<S: NoteStore> NoteService<S> {
    pub fn new(store: S, converter: MarkdownConverter, graph: GraphBuilder) -> Self {
        Self {
            store,
            converter,
            graph,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// A note with any stale reference titles repaired.
    pub fn note(&self, id: NoteId) -> NoteResult<Note> {
        let note = self
            .store
            .get_note(id)?
            .ok_or_else(|| NoteError::note_not_found(id))?;
        reconcile_note(&self.store, note)
    }

    pub fn create_note(&self, input: NoteInput) -> NoteResult<Note> {
        let note = self.store.create_note(NewNote {
            title: input.title.clone().unwrap_or_default(),
            content: input.content.clone().unwrap_or_default(),
            layout: input.layout,
        })?;
        if let Some(content) = syncable(&input.content) {
            sync_note_tags(&self.store, note.id, content)?;
        }
        info!("Created note {}", note.id);
        Ok(note)
    }

    /// Tags are recomputed only when the input carries non-empty content, so a
    /// title-only edit never clears a note's tags.
    pub fn update_note(&self, id: NoteId, input: NoteInput) -> NoteResult<Note> {
        if let Some(content) = syncable(&input.content) {
            sync_note_tags(&self.store, id, content)?;
        }
        let changes = NoteChanges {
            title: input.title,
            content: input.content,
            layout: input.layout,
        };
        self.store.update_note(id, &changes)
    }

    /// Delete a note and drop any of its tags that no other note uses.
    pub fn delete_note(&self, id: NoteId) -> NoteResult<Note> {
        let former: Vec<TagId> = self.store.note_tags(id)?.iter().map(|t| t.id).collect();
        let deleted = self.store.delete_note(id)?;
        let pruned = self.store.prune_orphan_tags(&former)?;
        info!("Deleted note {} (pruned {} orphaned tags)", id, pruned);
        Ok(deleted)
    }

    pub fn pin_note(&self, id: NoteId, pinned: bool) -> NoteResult<Note> {
        self.store.set_pinned(id, pinned)
    }

    pub fn reorder_notes(&self, ids: &[NoteId]) -> NoteResult<()> {
        self.store.set_order(ids)
    }

    pub fn back_references(&self, id: NoteId) -> NoteResult<Vec<Note>> {
        find_back_references(&self.store, id)
    }

    pub fn note_graph(&self) -> NoteResult<NoteGraph> {
        self.graph.build_from_store(&self.store)
    }

    pub fn all_notes(&self, filter: &SearchFilter, pagination: Pagination) -> NoteResult<Page<Note>> {
        self.store
            .list_notes(&filter.predicate(), &filter.list_options(pagination))
    }

    pub fn tag_notes(
        &self,
        tag_id: TagId,
        filter: &SearchFilter,
        pagination: Pagination,
    ) -> NoteResult<Page<Note>> {
        self.store
            .get_tag(tag_id)?
            .ok_or_else(|| NoteError::tag_not_found(tag_id))?;
        let predicate = Filter::HasTag(tag_id).and(filter.predicate());
        self.store
            .list_notes(&predicate, &filter.list_options(pagination))
    }

    pub fn create_tag(&self, name: &str) -> NoteResult<Tag> {
        let name = normalize_tag_name(name)?;
        self.store.create_tag(&name)
    }

    pub fn tags(&self) -> NoteResult<Vec<TagUsage>> {
        self.store.list_tags()
    }

    pub fn note_tags(&self, id: NoteId) -> NoteResult<Vec<Tag>> {
        if self.store.get_note(id)?.is_none() {
            return Err(NoteError::note_not_found(id));
        }
        self.store.note_tags(id)
    }

    pub fn note_markdown(&self, id: NoteId) -> NoteResult<String> {
        let note = self.note(id)?;
        Ok(self.converter.convert_content(&note.content))
    }
}
