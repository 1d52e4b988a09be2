use thiserror::Error;

/// Errors surfaced by the note engine and its store.
///
/// Malformed documents are not errors: every component that reads a document
/// degrades to "no structured content" instead of returning one of these.
#[derive(Error, Debug)]
pub enum NoteError {
    /// A direct id lookup found nothing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// The caller supplied something the engine refuses to store.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Store-level failure that is not a driver error (pool, migrations).
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NoteError {
    pub fn note_not_found(id: i64) -> Self {
        Self::NotFound { entity: "Note", id }
    }

    pub fn tag_not_found(id: i64) -> Self {
        Self::NotFound { entity: "Tag", id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type NoteResult<T> = Result<T, NoteError>;
