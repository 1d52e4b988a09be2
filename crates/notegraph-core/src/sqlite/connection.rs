//! Shared SQLite connection.
//!
//! A single `Arc<Mutex<Connection>>`: the engine is single-writer, and every
//! request runs its store calls to completion before releasing the lock.

use parking_lot::Mutex;
use rusqlite::Connection;
use std::sync::Arc;
use tracing::{debug, info};

use super::config::SqliteConfig;
use super::schema;
use crate::error::{NoteError, NoteResult};

#[derive(Clone)]
pub struct SqlitePool {
    conn: Arc<Mutex<Connection>>,
    config: SqliteConfig,
}

impl SqlitePool {
    /// Open (or create) the database and bring its schema up to date.
    pub fn new(config: SqliteConfig) -> NoteResult<Self> {
        info!(path = ?config.path, "Opening SQLite database");

        let conn = if config.is_memory() {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    NoteError::Storage(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
            Connection::open(&config.path)?
        };

        let pool = Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
        };
        pool.initialize()?;
        Ok(pool)
    }

    /// In-memory database, for tests.
    pub fn memory() -> NoteResult<Self> {
        Self::new(SqliteConfig::memory())
    }

    pub fn with_connection<F, T>(&self, f: F) -> NoteResult<T>
    where
        F: FnOnce(&Connection) -> NoteResult<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn with_connection_mut<F, T>(&self, f: F) -> NoteResult<T>
    where
        F: FnOnce(&mut Connection) -> NoteResult<T>,
    {
        let mut conn = self.conn.lock();
        f(&mut conn)
    }

    fn initialize(&self) -> NoteResult<()> {
        self.with_connection(|conn| {
            self.configure_pragmas(conn)?;
            schema::apply_migrations(conn)?;
            Ok(())
        })
    }

    fn configure_pragmas(&self, conn: &Connection) -> NoteResult<()> {
        debug!("Configuring SQLite pragmas");

        if self.config.wal_mode {
            // journal_mode reports the resulting mode as a row.
            let mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
            debug!(mode = %mode, "Journal mode set");
            conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        }

        if self.config.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }

        conn.execute_batch(&format!(
            "PRAGMA busy_timeout = {};",
            self.config.busy_timeout_ms
        ))?;
        conn.execute_batch(&format!("PRAGMA cache_size = {};", self.config.cache_size))?;
        conn.execute_batch("PRAGMA temp_store = MEMORY;")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_pool_runs_queries() {
        let pool = SqlitePool::memory().expect("memory pool");
        let two: i64 = pool
            .with_connection(|conn| Ok(conn.query_row("SELECT 1 + 1", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(two, 2);
    }

    #[test]
    fn file_pool_uses_wal_and_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("nested").join("notes.db");

        let pool = SqlitePool::new(SqliteConfig::new(&db_path)).expect("file pool");
        assert!(db_path.exists());

        let mode: String = pool
            .with_connection(|conn| {
                Ok(conn.query_row("PRAGMA journal_mode;", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn schema_is_applied_on_open() {
        let pool = SqlitePool::memory().unwrap();
        let tables: Vec<String> = pool
            .with_connection(|conn| {
                let mut stmt = conn
                    .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                Ok(rows.filter_map(Result::ok).collect())
            })
            .unwrap();

        for table in ["notes", "tags", "note_tags", "schema_migrations"] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let pool = SqlitePool::memory().unwrap();
        let enabled: i64 = pool
            .with_connection(|conn| Ok(conn.query_row("PRAGMA foreign_keys;", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(enabled, 1);
    }
}
