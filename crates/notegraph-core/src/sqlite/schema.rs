//! Schema management and migrations

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{NoteError, NoteResult};

/// Schema version - increment when making schema changes
pub const SCHEMA_VERSION: i32 = 1;

pub fn apply_migrations(conn: &Connection) -> NoteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version = current_version(conn)?;
    debug!(current_version, target_version = SCHEMA_VERSION, "Checking migrations");

    if current_version < 1 {
        info!(from = current_version, to = SCHEMA_VERSION, "Applying schema migrations");
        apply_migration_v1(conn)?;
    }

    Ok(())
}

pub fn current_version(conn: &Connection) -> NoteResult<i32> {
    let version: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))
        .optional()?
        .flatten();
    Ok(version.unwrap_or(0))
}

fn apply_migration_v1(conn: &Connection) -> NoteResult<()> {
    conn.execute_batch(SCHEMA_V1)
        .map_err(|e| NoteError::Storage(format!("Failed to apply v1 schema: {}", e)))?;
    conn.execute("INSERT INTO schema_migrations (version) VALUES (?1)", [1])?;
    info!("Migration v1 applied");
    Ok(())
}

/// Timestamps are RFC 3339 UTC with fixed nanosecond precision so that
/// lexicographic order equals chronological order.
const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL DEFAULT '',
    pinned INTEGER NOT NULL DEFAULT 0,
    sort_order INTEGER NOT NULL DEFAULT 0,
    layout TEXT NOT NULL DEFAULT 'default',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notes_pinned_updated ON notes(pinned, updated_at);
CREATE INDEX IF NOT EXISTS idx_notes_sort_order ON notes(sort_order);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS note_tags (
    note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (note_id, tag_id)
);

CREATE INDEX IF NOT EXISTS idx_note_tags_tag ON note_tags(tag_id);
"#;
