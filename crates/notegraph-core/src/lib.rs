//! Note graph engine: block-tree documents, note-to-note references, tags,
//! back-references, the whole-corpus link graph and keyword search, over a
//! pluggable relational store.

pub mod backrefs;
pub mod document;
pub mod error;
pub mod extract;
pub mod graph;
pub mod markdown;
pub mod reconcile;
pub mod search;
pub mod service;
pub mod sqlite;
pub mod store;
pub mod tags;

pub use document::{Block, Document, Inline};
pub use error::{NoteError, NoteResult};
pub use graph::{GraphBuilder, GraphLink, GraphNode, NoteGraph};
pub use markdown::MarkdownConverter;
pub use search::SearchFilter;
pub use service::{NoteInput, NoteService};
pub use store::{Note, NoteId, NoteStore, Page, Pagination, Tag, TagId, TagUsage};
