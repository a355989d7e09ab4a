//! SQLite projection of the card index for substring search.
//!
//! The projection is derived data: it can be dropped and rebuilt from the
//! card index at any time. It is refreshed explicitly, either in full or one
//! card at a time, so a card created since the last refresh is not
//! searchable here until its row is upserted.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

use crate::db::Database;
use crate::error::{Result, StoreError};
use crate::models::lenient::decode_set;
use crate::models::{CardId, CardIndex, CardSummary};

/// Number of leading document lines kept as preview.
pub const PREVIEW_LINES: usize = 10;
/// Maximum preview length in characters.
pub const PREVIEW_CHARS: usize = 500;
/// Preview stored for documents that exist but cannot be read.
pub const READ_ERROR_PREVIEW: &str = "[Error reading file]";

const SELECT_COLUMNS: &str =
    "SELECT card_id, title, category, tags, cross_references, file_path, content_preview FROM cards";

/// One projected card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexRow {
    pub card_id: CardId,
    pub title: String,
    pub category: String,
    pub tags: BTreeSet<String>,
    pub cross_references: BTreeSet<CardId>,
    pub file_path: PathBuf,
    pub content_preview: String,
}

impl IndexRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let tags: String = row.get(3)?;
        let cross_references: String = row.get(4)?;
        let file_path: String = row.get(5)?;

        Ok(Self {
            card_id: CardId::new(row.get::<_, String>(0)?),
            title: row.get(1)?,
            category: row.get(2)?,
            tags: decode_set(&tags),
            cross_references: decode_set(&cross_references),
            file_path: PathBuf::from(file_path),
            content_preview: row.get(6)?,
        })
    }
}

/// How the projection relates to the authoritative card index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// Nothing has been projected yet.
    Empty,
    /// Every indexed card has a row.
    Consistent,
    /// Some indexed cards have no row.
    PartiallyStale,
}

/// Search projection over one long-lived database connection.
pub struct SearchIndex {
    db: Database,
}

impl SearchIndex {
    /// Opens (or creates) the projection database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        Ok(Self::new(Database::open(path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Database::in_memory()?))
    }

    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Clears the projection and writes one row per card index entry.
    ///
    /// Returns the number of rows written.
    pub fn full_rebuild(&mut self, index: &CardIndex) -> Result<usize> {
        let tx = self.db.connection_mut().transaction()?;
        tx.execute("DELETE FROM cards", [])?;
        for (id, summary) in index {
            write_row(&tx, id, summary)?;
        }
        tx.commit()?;

        log::info!("Rebuilt search index with {} cards", index.len());
        Ok(index.len())
    }

    /// Refreshes the row for a single card.
    ///
    /// Returns `false` without touching the projection when `id` is not in
    /// the card index.
    pub fn upsert_one(&self, index: &CardIndex, id: &CardId) -> Result<bool> {
        let Some(summary) = index.get(id) else {
            log::debug!("Card {id} is not indexed; nothing to refresh");
            return Ok(false);
        };
        write_row(self.db.connection(), id, summary)?;
        Ok(true)
    }

    /// Case-insensitive substring match on title, category or tag text.
    ///
    /// Case folding covers all of Unicode, not only ASCII. `%` and `_` in the
    /// query match literally.
    pub fn search(&self, query: &str) -> Result<Vec<IndexRow>> {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        let sql = format!(
            "{SELECT_COLUMNS}
             WHERE search_text LIKE ?1 ESCAPE '\\'
             ORDER BY card_id"
        );

        let mut stmt = self.db.connection().prepare(&sql)?;
        let rows = stmt
            .query_map([pattern], IndexRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get(&self, id: &CardId) -> Result<Option<IndexRow>> {
        let row = self
            .db
            .connection()
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE card_id = ?1"),
                [id.as_str()],
                IndexRow::from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Number of projected rows.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .db
            .connection()
            .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Card index ids that have no projected row, in id order.
    pub fn stale_ids(&self, index: &CardIndex) -> Result<Vec<CardId>> {
        let mut stmt = self
            .db
            .connection()
            .prepare("SELECT EXISTS(SELECT 1 FROM cards WHERE card_id = ?1)")?;

        let mut stale = Vec::new();
        for id in index.ids() {
            let present: bool = stmt.query_row([id.as_str()], |row| row.get(0))?;
            if !present {
                stale.push(id.clone());
            }
        }
        Ok(stale)
    }

    pub fn state(&self, index: &CardIndex) -> Result<IndexState> {
        if self.is_empty()? {
            return Ok(IndexState::Empty);
        }
        Ok(if self.stale_ids(index)?.is_empty() {
            IndexState::Consistent
        } else {
            IndexState::PartiallyStale
        })
    }
}

fn write_row(conn: &Connection, id: &CardId, summary: &CardSummary) -> Result<()> {
    let (preview, first_line) = read_preview(&summary.file_path);
    let title = if summary.title.is_empty() {
        first_line.unwrap_or_default()
    } else {
        summary.title.clone()
    };

    let mut search_text = format!("{title}\n{}", summary.category);
    for tag in &summary.tags {
        search_text.push('\n');
        search_text.push_str(tag);
    }

    conn.execute(
        "INSERT OR REPLACE INTO cards
             (card_id, title, category, tags, cross_references, file_path, content_preview, search_text)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id.as_str(),
            title,
            summary.category,
            serde_json::to_string(&summary.tags)?,
            serde_json::to_string(&summary.cross_references)?,
            summary.file_path.to_string_lossy(),
            preview,
            search_text.to_lowercase(),
        ],
    )?;
    Ok(())
}

/// Reads the preview of a card document and its first non-blank line.
///
/// A missing document yields an empty preview.
fn read_preview(path: &Path) -> (String, Option<String>) {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return (String::new(), None),
        Err(e) => {
            log::warn!("Could not read card document {}: {e}", path.display());
            return (READ_ERROR_PREVIEW.to_string(), None);
        }
    };

    let first_line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(String::from);

    let preview = text
        .split_inclusive('\n')
        .take(PREVIEW_LINES)
        .collect::<String>()
        .chars()
        .take(PREVIEW_CHARS)
        .collect();

    (preview, first_line)
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
#[path = "search_index/tests.rs"]
mod tests;
