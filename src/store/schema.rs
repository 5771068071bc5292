//! Versioned migrations for the `line_status` table.
//!
//! The applied version is tracked in `PRAGMA user_version`. Every step is
//! written so it also succeeds against databases created before versioning
//! existed (version 0 with the table and possibly `threads_id` already present).

use rusqlite::{Connection, Transaction};
use tracing::info;

pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    apply: fn(&Transaction<'_>) -> rusqlite::Result<()>,
}

pub(crate) const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create line_status",
        apply: create_line_status,
    },
    Migration {
        version: 2,
        description: "add threads_id column",
        apply: add_threads_id,
    },
    Migration {
        version: 3,
        description: "index line_status by line",
        apply: index_by_line,
    },
];

pub const CURRENT_SCHEMA_VERSION: u32 = 3;

fn create_line_status(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS line_status (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            line_name TEXT,
            status TEXT,
            status_details TEXT,
            timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )
}

fn add_threads_id(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    if !has_column(tx, "line_status", "threads_id")? {
        tx.execute_batch("ALTER TABLE line_status ADD COLUMN threads_id TEXT;")?;
    }
    Ok(())
}

fn index_by_line(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_line_status_line ON line_status(line_name, id);",
    )
}

pub(crate) fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub(crate) fn read_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

/// Applies every migration newer than the stored version, each in its own
/// transaction. Safe to call on every open.
pub(crate) fn apply_migrations(conn: &mut Connection) -> rusqlite::Result<u32> {
    let current = read_schema_version(conn)?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = conn.transaction()?;
        (migration.apply)(&tx)?;
        tx.pragma_update(None, "user_version", migration.version)?;
        tx.commit()?;
        info!(
            version = migration.version,
            description = migration.description,
            "Applied status store migration"
        );
    }

    read_schema_version(conn)
}
