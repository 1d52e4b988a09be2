//! The persistence seam.
//!
//! The engine never talks to a database directly: every component takes a
//! [`NoteStore`] and relies only on its filter/sort/paginate primitives and on
//! the atomicity of single-row and single-relation updates.

mod filter;

pub use filter::{Filter, MatchCase, NoteField};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::error::NoteResult;

pub type NoteId = i64;
pub type TagId = i64;

pub const DEFAULT_LAYOUT: &str = "default";
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    /// Serialized [`Document`](crate::document::Document). Opaque to the store.
    pub content: String,
    pub pinned: bool,
    pub order: i64,
    pub layout: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The slice of a note the graph builder needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSummary {
    pub id: NoteId,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagUsage {
    #[serde(flatten)]
    pub tag: Tag,
    pub note_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub layout: Option<String>,
}

/// A partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub layout: Option<String>,
}

impl NoteChanges {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.layout.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    UpdatedAt,
    CreatedAt,
    Title,
    Order,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Clamp `limit` into `1..=MAX_PAGE_SIZE` and `offset` to what SQLite can bind.
    pub fn clamped(self) -> Self {
        Self {
            offset: self.offset.min(i64::MAX as usize),
            limit: self.limit.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub pinned_first: bool,
    /// `None` returns every matching note.
    pub pagination: Option<Pagination>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            sort_by: SortField::UpdatedAt,
            sort_order: SortOrder::Desc,
            pinned_first: true,
            pagination: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub offset: usize,
    pub limit: Option<usize>,
    pub has_more: bool,
}

/// Relational storage for notes, tags and their many-to-many join.
pub trait NoteStore: Send + Sync {
    fn get_note(&self, id: NoteId) -> NoteResult<Option<Note>>;

    /// Current titles of the given notes. Ids naming no note are absent from the map.
    fn note_titles(&self, ids: &BTreeSet<NoteId>) -> NoteResult<HashMap<NoteId, String>>;

    /// Id, title and content of every note, in id order.
    fn note_summaries(&self) -> NoteResult<Vec<NoteSummary>>;

    fn list_notes(&self, filter: &Filter, options: &ListOptions) -> NoteResult<Page<Note>>;

    fn create_note(&self, note: NewNote) -> NoteResult<Note>;

    /// Apply `changes` and bump `updated_at`. Fails with `NotFound` for unknown ids.
    fn update_note(&self, id: NoteId, changes: &NoteChanges) -> NoteResult<Note>;

    fn set_pinned(&self, id: NoteId, pinned: bool) -> NoteResult<Note>;

    /// Set each listed note's `order` to its position in `ids`.
    fn set_order(&self, ids: &[NoteId]) -> NoteResult<()>;

    /// Delete a note and its tag associations, returning the deleted row.
    fn delete_note(&self, id: NoteId) -> NoteResult<Note>;

    /// Replace the note's tag associations with exactly `tags`, atomically.
    /// Ids that name no stored tag are skipped.
    fn set_note_tags(&self, id: NoteId, tags: &BTreeSet<TagId>) -> NoteResult<()>;

    fn note_tags(&self, id: NoteId) -> NoteResult<Vec<Tag>>;

    /// Insert a tag or return the existing one with the same name.
    fn create_tag(&self, name: &str) -> NoteResult<Tag>;

    fn get_tag(&self, id: TagId) -> NoteResult<Option<Tag>>;

    fn list_tags(&self) -> NoteResult<Vec<TagUsage>>;

    /// Delete those of `candidates` that no note references. Returns how many went.
    fn prune_orphan_tags(&self, candidates: &[TagId]) -> NoteResult<usize>;
}
