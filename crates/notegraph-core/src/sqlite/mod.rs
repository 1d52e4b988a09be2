//! SQLite implementation of [`NoteStore`](crate::store::NoteStore).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use notegraph_core::sqlite::{SqliteConfig, SqliteNoteStore, SqlitePool};
//!
//! let pool = SqlitePool::new(SqliteConfig::new("./notes.db"))?;
//! let store = SqliteNoteStore::new(pool);
//! ```

mod config;
mod connection;
mod note_store;
pub mod schema;

pub use config::SqliteConfig;
pub use connection::SqlitePool;
pub use note_store::SqliteNoteStore;
