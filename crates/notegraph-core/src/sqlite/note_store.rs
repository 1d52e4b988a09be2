use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use super::connection::SqlitePool;
use crate::error::{NoteError, NoteResult};
use crate::store::{
    Filter, ListOptions, MatchCase, NewNote, Note, NoteChanges, NoteField, NoteId, NoteStore,
    NoteSummary, Page, SortField, SortOrder, Tag, TagId, TagUsage, DEFAULT_LAYOUT,
};

const NOTE_COLUMNS: &str =
    "notes.id, notes.title, notes.content, notes.pinned, notes.sort_order, notes.layout, notes.created_at, notes.updated_at";

/// [`NoteStore`] over a [`SqlitePool`].
#[derive(Clone)]
pub struct SqliteNoteStore {
    pool: SqlitePool,
}

impl SqliteNoteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// In-memory store, for tests.
    pub fn memory() -> NoteResult<Self> {
        Ok(Self::new(SqlitePool::memory()?))
    }
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_note(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        pinned: row.get(3)?,
        order: row.get(4)?,
        layout: row.get(5)?,
        created_at: parse_time(row, 6)?,
        updated_at: parse_time(row, 7)?,
    })
}

fn row_to_tag(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_time(row, 2)?,
        updated_at: parse_time(row, 3)?,
    })
}

fn fetch_note(conn: &Connection, id: NoteId) -> NoteResult<Option<Note>> {
    let note = conn
        .query_row(
            &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE notes.id = ?1"),
            [id],
            row_to_note,
        )
        .optional()?;
    Ok(note)
}

fn require_note(conn: &Connection, id: NoteId) -> NoteResult<Note> {
    fetch_note(conn, id)?.ok_or_else(|| NoteError::note_not_found(id))
}

/// Render a [`Filter`] as a SQL boolean expression over `notes`, pushing
/// bound values onto `params` in placeholder order.
pub(crate) fn render_filter(filter: &Filter, params: &mut Vec<SqlValue>) -> String {
    match filter {
        Filter::All => "1 = 1".to_string(),
        Filter::And(filters) if filters.is_empty() => "1 = 1".to_string(),
        Filter::Or(filters) if filters.is_empty() => "1 = 0".to_string(),
        Filter::And(filters) => join_filters(filters, " AND ", params),
        Filter::Or(filters) => join_filters(filters, " OR ", params),
        Filter::Not(inner) => format!("NOT ({})", render_filter(inner, params)),
        Filter::Contains {
            field,
            needle,
            case,
        } => {
            let column = match field {
                NoteField::Title => "notes.title",
                NoteField::Content => "notes.content",
            };
            params.push(SqlValue::Text(needle.clone()));
            match case {
                MatchCase::Sensitive => format!("instr({column}, ?) > 0"),
                MatchCase::Insensitive => format!("instr(lower({column}), lower(?)) > 0"),
            }
        }
        Filter::HasTag(tag) => {
            params.push(SqlValue::Integer(*tag));
            "EXISTS (SELECT 1 FROM note_tags nt WHERE nt.note_id = notes.id AND nt.tag_id = ?)"
                .to_string()
        }
    }
}

fn join_filters(filters: &[Filter], op: &str, params: &mut Vec<SqlValue>) -> String {
    let parts: Vec<String> = filters.iter().map(|f| render_filter(f, params)).collect();
    format!("({})", parts.join(op))
}

fn render_order(options: &ListOptions) -> String {
    let direction = match options.sort_order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    let column = match options.sort_by {
        SortField::UpdatedAt => "notes.updated_at",
        SortField::CreatedAt => "notes.created_at",
        SortField::Title => "notes.title COLLATE NOCASE",
        SortField::Order => "notes.sort_order",
    };
    let pinned = if options.pinned_first {
        "notes.pinned DESC, "
    } else {
        ""
    };
    format!("{pinned}{column} {direction}, notes.id {direction}")
}

impl NoteStore for SqliteNoteStore {
    fn get_note(&self, id: NoteId) -> NoteResult<Option<Note>> {
        self.pool.with_connection(|conn| fetch_note(conn, id))
    }

    fn note_titles(&self, ids: &BTreeSet<NoteId>) -> NoteResult<HashMap<NoteId, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.pool.with_connection(|conn| {
            let placeholders = vec!["?"; ids.len()].join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT id, title FROM notes WHERE id IN ({placeholders})"
            ))?;
            let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
                Ok((row.get::<_, NoteId>(0)?, row.get::<_, String>(1)?))
            })?;
            Ok(rows.collect::<rusqlite::Result<HashMap<_, _>>>()?)
        })
    }

    fn note_summaries(&self) -> NoteResult<Vec<NoteSummary>> {
        self.pool.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT id, title, content FROM notes ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok(NoteSummary {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    content: row.get(2)?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    fn list_notes(&self, filter: &Filter, options: &ListOptions) -> NoteResult<Page<Note>> {
        self.pool.with_connection(|conn| {
            let mut params = Vec::new();
            let predicate = render_filter(filter, &mut params);

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM notes WHERE {predicate}"),
                params_from_iter(params.iter()),
                |row| row.get(0),
            )?;

            let (offset, limit) = match options.pagination {
                Some(page) => {
                    let page = page.clamped();
                    (page.offset, Some(page.limit))
                }
                None => (0, None),
            };
            params.push(SqlValue::Integer(limit.map(|l| l as i64).unwrap_or(-1)));
            params.push(SqlValue::Integer(offset as i64));

            let sql = format!(
                "SELECT {NOTE_COLUMNS} FROM notes WHERE {predicate} ORDER BY {} LIMIT ? OFFSET ?",
                render_order(options)
            );
            debug!(sql = %sql, "Listing notes");

            let mut stmt = conn.prepare(&sql)?;
            let items = stmt
                .query_map(params_from_iter(params.iter()), row_to_note)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let total = total as usize;
            Ok(Page {
                has_more: offset.saturating_add(items.len()) < total,
                items,
                total,
                offset,
                limit,
            })
        })
    }

    fn create_note(&self, note: NewNote) -> NoteResult<Note> {
        self.pool.with_connection(|conn| {
            let stamp = format_time(&now());
            let next_order: i64 = conn.query_row(
                "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM notes",
                [],
                |row| row.get(0),
            )?;
            conn.execute(
                "INSERT INTO notes (title, content, pinned, sort_order, layout, created_at, updated_at)
                 VALUES (?1, ?2, 0, ?3, ?4, ?5, ?5)",
                params![
                    note.title,
                    note.content,
                    next_order,
                    note.layout.as_deref().unwrap_or(DEFAULT_LAYOUT),
                    stamp,
                ],
            )?;
            require_note(conn, conn.last_insert_rowid())
        })
    }

    fn update_note(&self, id: NoteId, changes: &NoteChanges) -> NoteResult<Note> {
        self.pool.with_connection(|conn| {
            let mut note = require_note(conn, id)?;
            if let Some(title) = &changes.title {
                note.title = title.clone();
            }
            if let Some(content) = &changes.content {
                note.content = content.clone();
            }
            if let Some(layout) = &changes.layout {
                note.layout = layout.clone();
            }
            note.updated_at = now();

            conn.execute(
                "UPDATE notes SET title = ?1, content = ?2, layout = ?3, updated_at = ?4 WHERE id = ?5",
                params![
                    note.title,
                    note.content,
                    note.layout,
                    format_time(&note.updated_at),
                    id
                ],
            )?;
            require_note(conn, id)
        })
    }

    fn set_pinned(&self, id: NoteId, pinned: bool) -> NoteResult<Note> {
        self.pool.with_connection(|conn| {
            let changed = conn.execute(
                "UPDATE notes SET pinned = ?1, updated_at = ?2 WHERE id = ?3",
                params![pinned, format_time(&now()), id],
            )?;
            if changed == 0 {
                return Err(NoteError::note_not_found(id));
            }
            require_note(conn, id)
        })
    }

    fn set_order(&self, ids: &[NoteId]) -> NoteResult<()> {
        self.pool.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare("UPDATE notes SET sort_order = ?1 WHERE id = ?2")?;
                for (position, id) in ids.iter().enumerate() {
                    stmt.execute(params![position as i64, id])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn delete_note(&self, id: NoteId) -> NoteResult<Note> {
        self.pool.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let note = require_note(&tx, id)?;
            tx.execute("DELETE FROM note_tags WHERE note_id = ?1", [id])?;
            tx.execute("DELETE FROM notes WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(note)
        })
    }

    fn set_note_tags(&self, id: NoteId, tags: &BTreeSet<TagId>) -> NoteResult<()> {
        self.pool.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            require_note(&tx, id)?;
            tx.execute("DELETE FROM note_tags WHERE note_id = ?1", [id])?;
            {
                // Selecting from tags skips ids that name no tag.
                let mut stmt = tx.prepare(
                    "INSERT INTO note_tags (note_id, tag_id) SELECT ?1, id FROM tags WHERE id = ?2",
                )?;
                for tag in tags {
                    if stmt.execute(params![id, tag])? == 0 {
                        warn!(note_id = id, tag_id = tag, "Tag mention names no stored tag, skipping");
                    }
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn note_tags(&self, id: NoteId) -> NoteResult<Vec<Tag>> {
        self.pool.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.name, t.created_at, t.updated_at
                 FROM tags t
                 JOIN note_tags nt ON nt.tag_id = t.id
                 WHERE nt.note_id = ?1
                 ORDER BY t.name",
            )?;
            let tags = stmt
                .query_map([id], row_to_tag)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tags)
        })
    }

    fn create_tag(&self, name: &str) -> NoteResult<Tag> {
        self.pool.with_connection(|conn| {
            let stamp = format_time(&now());
            conn.execute(
                "INSERT INTO tags (name, created_at, updated_at) VALUES (?1, ?2, ?2)
                 ON CONFLICT(name) DO NOTHING",
                params![name, stamp],
            )?;
            let tag = conn.query_row(
                "SELECT id, name, created_at, updated_at FROM tags WHERE name = ?1",
                [name],
                row_to_tag,
            )?;
            Ok(tag)
        })
    }

    fn get_tag(&self, id: TagId) -> NoteResult<Option<Tag>> {
        self.pool.with_connection(|conn| {
            let tag = conn
                .query_row(
                    "SELECT id, name, created_at, updated_at FROM tags WHERE id = ?1",
                    [id],
                    row_to_tag,
                )
                .optional()?;
            Ok(tag)
        })
    }

    fn list_tags(&self) -> NoteResult<Vec<TagUsage>> {
        self.pool.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.name, t.created_at, t.updated_at, COUNT(nt.note_id)
                 FROM tags t
                 LEFT JOIN note_tags nt ON nt.tag_id = t.id
                 GROUP BY t.id
                 ORDER BY t.name",
            )?;
            let tags = stmt
                .query_map([], |row| {
                    Ok(TagUsage {
                        tag: row_to_tag(row)?,
                        note_count: row.get::<_, i64>(4)? as usize,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tags)
        })
    }

    fn prune_orphan_tags(&self, candidates: &[TagId]) -> NoteResult<usize> {
        if candidates.is_empty() {
            return Ok(0);
        }
        self.pool.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let mut pruned = 0;
            {
                let mut stmt = tx.prepare(
                    "DELETE FROM tags WHERE id = ?1
                     AND NOT EXISTS (SELECT 1 FROM note_tags WHERE tag_id = ?1)",
                )?;
                for tag in candidates {
                    pruned += stmt.execute([tag])?;
                }
            }
            tx.commit()?;
            Ok(pruned)
        })
    }
}
