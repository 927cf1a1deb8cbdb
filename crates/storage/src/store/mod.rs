#![forbid(unsafe_code)]

mod error;
mod requests;
mod schedules;
mod territories;
mod visits;

pub use error::StoreError;
pub use requests::*;

use cm_core::{MemberId, SubArea, Territory, TerritoryId};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Transaction, params};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DB_FILE_NAME: &str = "congregation.db";
const SCHEMA_VERSION: i64 = 1;

const REQUIRED_TABLES: [&str; 7] = [
    "store_state",
    "territories",
    "territory_sub_areas",
    "active_visits",
    "completion_history",
    "schedules",
    "assignment_history",
];

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE_NAME);
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        preflight_gate(&conn)?;
        install_schema(&conn)?;

        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join(DB_FILE_NAME)
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

    let required: BTreeSet<&str> = REQUIRED_TABLES.into_iter().collect();

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

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    let now_ms = cm_core::now_ms();

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS territories (
          id TEXT PRIMARY KEY,
          name TEXT NOT NULL,
          reference TEXT NOT NULL,
          map_image_ref TEXT NOT NULL,
          responsible_member_id TEXT,
          revision INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS territory_sub_areas (
          territory_id TEXT NOT NULL,
          sub_area_id INTEGER NOT NULL,
          x REAL NOT NULL,
          y REAL NOT NULL,
          PRIMARY KEY(territory_id, sub_area_id),
          FOREIGN KEY(territory_id) REFERENCES territories(id) ON DELETE CASCADE,
          CHECK(sub_area_id > 0),
          CHECK(x >= 0 AND x <= 100 AND y >= 0 AND y <= 100)
        );

        CREATE TABLE IF NOT EXISTS active_visits (
          territory_id TEXT NOT NULL,
          sub_area_id INTEGER NOT NULL,
          PRIMARY KEY(territory_id, sub_area_id),
          FOREIGN KEY(territory_id, sub_area_id)
            REFERENCES territory_sub_areas(territory_id, sub_area_id)
            ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS completion_history (
          seq INTEGER PRIMARY KEY AUTOINCREMENT,
          territory_id TEXT NOT NULL,
          completed_at_ms INTEGER NOT NULL,
          FOREIGN KEY(territory_id) REFERENCES territories(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_completion_history_territory_completed
          ON completion_history(territory_id, completed_at_ms);

        CREATE TABLE IF NOT EXISTS schedules (
          id TEXT PRIMARY KEY,
          meeting_date TEXT NOT NULL,
          president_id TEXT,
          opening_prayer_id TEXT,
          closing_prayer_id TEXT,
          parts_json TEXT NOT NULL,
          revision INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_schedules_meeting_date
          ON schedules(meeting_date, id);

        CREATE TABLE IF NOT EXISTS assignment_history (
          seq INTEGER PRIMARY KEY AUTOINCREMENT,
          schedule_id TEXT NOT NULL,
          part_description TEXT NOT NULL,
          slot TEXT,
          member_id TEXT NOT NULL,
          recorded_at_ms INTEGER NOT NULL,
          FOREIGN KEY(schedule_id) REFERENCES schedules(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_assignment_history_schedule
          ON assignment_history(schedule_id, seq);
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

#[derive(Debug)]
struct TerritoryHeader {
    id: String,
    name: String,
    reference: String,
    map_image_ref: String,
    responsible_member_id: Option<String>,
    revision: i64,
    created_at_ms: i64,
    updated_at_ms: i64,
}

const TERRITORY_COLUMNS: &str = "id, name, reference, map_image_ref, responsible_member_id, revision, created_at_ms, updated_at_ms";

fn territory_header_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TerritoryHeader> {
    Ok(TerritoryHeader {
        id: row.get(0)?,
        name: row.get(1)?,
        reference: row.get(2)?,
        map_image_ref: row.get(3)?,
        responsible_member_id: row.get(4)?,
        revision: row.get(5)?,
        created_at_ms: row.get(6)?,
        updated_at_ms: row.get(7)?,
    })
}

fn assemble_territory(
    header: TerritoryHeader,
    layout: Vec<SubArea>,
) -> Result<Territory, StoreError> {
    let id = TerritoryId::try_new(header.id)
        .map_err(|_| StoreError::InvalidInput("invalid territory row"))?;
    let responsible_member_id = header
        .responsible_member_id
        .map(MemberId::try_new)
        .transpose()
        .map_err(|_| StoreError::InvalidInput("invalid territory responsible member"))?;
    Ok(Territory {
        id,
        name: header.name,
        reference: header.reference,
        map_image_ref: header.map_image_ref,
        layout,
        responsible_member_id,
        revision: header.revision,
        created_at_ms: header.created_at_ms,
        updated_at_ms: header.updated_at_ms,
    })
}

fn territory_conn(conn: &Connection, territory_id: &str) -> Result<Option<Territory>, StoreError> {
    let header = conn
        .query_row(
            &format!("SELECT {TERRITORY_COLUMNS} FROM territories WHERE id=?1"),
            params![territory_id],
            territory_header_from_row,
        )
        .optional()?;
    let Some(header) = header else {
        return Ok(None);
    };
    let layout = layout_conn(conn, territory_id)?;
    assemble_territory(header, layout).map(Some)
}

fn territory_tx(tx: &Transaction<'_>, territory_id: &str) -> Result<Territory, StoreError> {
    territory_conn(tx, territory_id)?.ok_or(StoreError::UnknownId)
}

fn layout_conn(conn: &Connection, territory_id: &str) -> Result<Vec<SubArea>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT sub_area_id, x, y FROM territory_sub_areas \
         WHERE territory_id=?1 ORDER BY sub_area_id ASC",
    )?;
    let mut rows = stmt.query(params![territory_id])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(SubArea {
            sub_area_id: row.get::<_, u32>(0)?,
            x: row.get::<_, f64>(1)?,
            y: row.get::<_, f64>(2)?,
        });
    }
    Ok(out)
}

fn all_layouts_conn(conn: &Connection) -> Result<BTreeMap<String, Vec<SubArea>>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT territory_id, sub_area_id, x, y FROM territory_sub_areas \
         ORDER BY territory_id ASC, sub_area_id ASC",
    )?;
    let mut rows = stmt.query([])?;
    let mut out: BTreeMap<String, Vec<SubArea>> = BTreeMap::new();
    while let Some(row) = rows.next()? {
        out.entry(row.get::<_, String>(0)?)
            .or_default()
            .push(SubArea {
                sub_area_id: row.get::<_, u32>(1)?,
                x: row.get::<_, f64>(2)?,
                y: row.get::<_, f64>(3)?,
            });
    }
    Ok(out)
}

fn ensure_territory_exists_tx(tx: &Transaction<'_>, territory_id: &str) -> Result<(), StoreError> {
    let exists = tx
        .query_row(
            "SELECT 1 FROM territories WHERE id=?1",
            params![territory_id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some();

    if exists {
        Ok(())
    } else {
        Err(StoreError::UnknownId)
    }
}

fn bump_territory_tx(
    tx: &Transaction<'_>,
    territory_id: &str,
    updated_at_ms: i64,
) -> Result<(), StoreError> {
    tx.execute(
        "UPDATE territories SET revision=revision+1, updated_at_ms=MAX(updated_at_ms, ?2) WHERE id=?1",
        params![territory_id, updated_at_ms],
    )?;
    Ok(())
}

fn map_insert_conflict(err: rusqlite::Error) -> StoreError {
    if is_constraint_violation(&err) {
        return StoreError::AlreadyExists;
    }
    StoreError::Sql(err)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
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

fn required_text(value: &str, message: &'static str) -> Result<String, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidInput(message));
    }
    Ok(trimmed.to_string())
}
