#![forbid(unsafe_code)]

mod error;
mod import;
mod lineage;
mod order;
mod requests;
mod sections;
mod tree;

pub use error::StoreError;
pub use requests::*;
pub use tree::SectionNode;

use rusqlite::{Connection, ErrorCode, OptionalExtension, Transaction, params};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SCHEMA_VERSION: i64 = 1;
const DB_FILE: &str = "toc_sections.db";
const SECTION_KEY_SEQ: &str = "section_key_seq";

/// Millisecond clock, injected so tests can pin timestamps.
pub type NowMs = fn() -> i64;

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
    clock: NowMs,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_clock(storage_dir, now_ms)
    }

    pub fn open_with_clock(
        storage_dir: impl AsRef<Path>,
        clock: NowMs,
    ) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE);
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        preflight_gate(&conn)?;
        install_schema(&conn, clock())?;

        Ok(Self {
            conn,
            storage_dir,
            clock,
        })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub(crate) fn now(&self) -> i64 {
        (self.clock)()
    }

    pub fn counts(&self) -> Result<StoreCounts, StoreError> {
        let total = self
            .conn
            .query_row("SELECT COUNT(*) FROM sections", [], |row| row.get(0))?;
        let roots = self.conn.query_row(
            "SELECT COUNT(*) FROM sections WHERE parent_id IS NULL",
            [],
            |row| row.get(0),
        )?;
        let leaves = self.conn.query_row(
            "SELECT COUNT(*) FROM sections WHERE is_leaf = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(StoreCounts {
            total,
            roots,
            leaves,
        })
    }
}

fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut tables = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tables.insert(row.get::<_, String>(0)?);
    }

    if tables.is_empty() {
        return Ok(());
    }

    let required: BTreeSet<&str> = ["store_state", "sections", "counters"].into_iter().collect();

    if tables
        .iter()
        .any(|table| !required.contains(table.as_str()))
    {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: unsupported tables detected",
        ));
    }

    for table in required {
        if !tables.contains(table) {
            return Err(StoreError::InvalidInput(
                "RESET_REQUIRED: required table is missing",
            ));
        }
    }

    let version = conn
        .query_row(
            "SELECT schema_version FROM store_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match version {
        Some(v) if v == SCHEMA_VERSION => Ok(()),
        Some(_) => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema version mismatch",
        )),
        None => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema state row is missing",
        )),
    }
}

fn install_schema(conn: &Connection, now_ms: i64) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sections (
          id INTEGER PRIMARY KEY,
          section_key TEXT NOT NULL UNIQUE,
          name TEXT NOT NULL,
          parent_id INTEGER,
          is_leaf INTEGER NOT NULL DEFAULT 1,
          ord INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          FOREIGN KEY(parent_id) REFERENCES sections(id) ON DELETE RESTRICT,
          CHECK(ord >= 1),
          CHECK(parent_id IS NULL OR parent_id <> id)
        );

        CREATE INDEX IF NOT EXISTS idx_sections_parent_ord
          ON sections(parent_id, ord);

        CREATE TABLE IF NOT EXISTS counters (
          name TEXT PRIMARY KEY,
          value INTEGER NOT NULL
        );
        "#,
    )?;

    conn.execute(
        "INSERT INTO store_state(singleton, schema_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2) \
         ON CONFLICT(singleton) DO UPDATE SET schema_version=excluded.schema_version, updated_at_ms=excluded.updated_at_ms",
        params![SCHEMA_VERSION, now_ms],
    )?;

    Ok(())
}

#[derive(Clone, Debug)]
pub(crate) struct SectionRow {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub section_key: String,
    pub name: String,
    pub is_leaf: bool,
    pub ord: i64,
}

pub(crate) fn section_row_tx(
    tx: &Transaction<'_>,
    id: i64,
) -> Result<Option<SectionRow>, StoreError> {
    Ok(tx
        .query_row(
            "SELECT id, parent_id, section_key, name, is_leaf, ord FROM sections WHERE id=?1",
            params![id],
            |row| {
                Ok(SectionRow {
                    id: row.get(0)?,
                    parent_id: row.get(1)?,
                    section_key: row.get(2)?,
                    name: row.get(3)?,
                    is_leaf: row.get(4)?,
                    ord: row.get(5)?,
                })
            },
        )
        .optional()?)
}

pub(crate) fn section_exists_tx(tx: &Transaction<'_>, id: i64) -> Result<bool, StoreError> {
    Ok(tx
        .query_row(
            "SELECT 1 FROM sections WHERE id=?1",
            params![id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

/// Direct children of `id`, ordered by their slot in the group.
pub(crate) fn ordered_children_tx(tx: &Transaction<'_>, id: i64) -> Result<Vec<i64>, StoreError> {
    let mut stmt =
        tx.prepare("SELECT id FROM sections WHERE parent_id=?1 ORDER BY ord, id")?;
    let mut rows = stmt.query(params![id])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(row.get::<_, i64>(0)?);
    }
    Ok(out)
}

/// Derives `is_leaf` for one node from the actual child set. Idempotent;
/// run for every node whose children may have changed.
pub(crate) fn recompute_leaf_tx(
    tx: &Transaction<'_>,
    id: i64,
    now_ms: i64,
) -> Result<(), StoreError> {
    tx.execute(
        "UPDATE sections \
         SET is_leaf = NOT EXISTS (SELECT 1 FROM sections c WHERE c.parent_id = sections.id), \
             updated_at_ms = ?2 \
         WHERE id = ?1",
        params![id, now_ms],
    )?;
    Ok(())
}

pub(crate) fn recompute_all_leaves_tx(tx: &Transaction<'_>, now_ms: i64) -> Result<(), StoreError> {
    tx.execute(
        "UPDATE sections \
         SET is_leaf = NOT EXISTS (SELECT 1 FROM sections c WHERE c.parent_id = sections.id), \
             updated_at_ms = ?1",
        params![now_ms],
    )?;
    Ok(())
}

pub(crate) fn next_counter_tx(tx: &Transaction<'_>, name: &str) -> Result<i64, StoreError> {
    tx.execute(
        "INSERT INTO counters(name, value) VALUES (?1, 1) \
         ON CONFLICT(name) DO UPDATE SET value = value + 1",
        params![name],
    )?;
    Ok(tx.query_row(
        "SELECT value FROM counters WHERE name=?1",
        params![name],
        |row| row.get(0),
    )?)
}

pub(crate) fn map_key_conflict(err: rusqlite::Error, key: &str) -> StoreError {
    if is_constraint_violation(&err) {
        return StoreError::DuplicateKey(key.to_string());
    }
    StoreError::Sql(err)
}

pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, message) => {
            code.code == ErrorCode::ConstraintViolation
                || message.as_deref().is_some_and(|value| {
                    value.contains("UNIQUE constraint failed")
                        || value.contains("PRIMARY KEY constraint failed")
                })
        }
        _ => false,
    }
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
