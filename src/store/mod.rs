//! SQLite-backed, append-only history of line statuses.
//!
//! A fresh connection is opened (and migrations applied) for each operation;
//! nothing holds the database open between calls.

mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::services::status_api::LineStatus;

pub use schema::CURRENT_SCHEMA_VERSION;

/// One persisted observation of a line's status. Never updated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRecord {
    pub id: i64,
    pub line_name: String,
    pub status: String,
    pub status_details: String,
    pub timestamp: DateTime<Utc>,
    pub external_post_id: Option<String>,
}

/// A record waiting to be inserted; id and timestamp are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStatusRecord {
    pub line_name: String,
    pub status: String,
    pub status_details: String,
    pub external_post_id: Option<String>,
}

impl From<&LineStatus> for NewStatusRecord {
    fn from(status: &LineStatus) -> Self {
        Self {
            line_name: status.line_name.clone(),
            status: status.status.clone(),
            status_details: status.status_details.clone(),
            external_post_id: None,
        }
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, line_name, status, status_details, timestamp, threads_id FROM line_status";

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<StatusRecord> {
    let timestamp: NaiveDateTime = row.get(4)?;
    Ok(StatusRecord {
        id: row.get(0)?,
        line_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        status: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        status_details: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        timestamp: timestamp.and_utc(),
        external_post_id: row.get(5)?,
    })
}

#[derive(Debug, Clone)]
pub struct StatusStore {
    path: PathBuf,
}

impl StatusStore {
    /// Points the store at `path`. The file is created on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        let mut conn = Connection::open(&self.path)?;
        schema::apply_migrations(&mut conn)?;
        Ok(conn)
    }

    /// Opens the database once so the schema is created or upgraded.
    pub fn initialize(&self) -> Result<u32> {
        let conn = self.connect()?;
        Ok(schema::read_schema_version(&conn)?)
    }

    /// Most recently inserted record for `line_name`, if any.
    pub fn get_latest(&self, line_name: &str) -> Result<Option<StatusRecord>> {
        let conn = self.connect()?;
        let record = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE line_name = ?1 ORDER BY id DESC LIMIT 1"),
                params![line_name],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Appends `records` in one transaction. Duplicate content is accepted.
    pub fn insert(&self, records: &[NewStatusRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO line_status (line_name, status, status_details, threads_id) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.line_name,
                    record.status,
                    record.status_details,
                    record.external_post_id
                ])?;
            }
        }
        tx.commit()?;

        debug!(count = records.len(), "Inserted status records");
        Ok(())
    }

    /// Latest record for every line seen so far, ordered by line name.
    pub fn latest_all(&self) -> Result<Vec<StatusRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE id IN (SELECT MAX(id) FROM line_status GROUP BY line_name) \
             ORDER BY line_name"
        ))?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Records in insertion order, optionally for one line and limited to
    /// the most recent `limit`.
    pub fn history(&self, line_name: Option<&str>, limit: Option<usize>) -> Result<Vec<StatusRecord>> {
        let conn = self.connect()?;
        let limit = limit.map(|l| l as i64).unwrap_or(-1);

        // Newest first so LIMIT keeps the most recent, then flipped back.
        let mut records = match line_name {
            Some(line) => {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_COLUMNS} WHERE line_name = ?1 ORDER BY id DESC LIMIT ?2"
                ))?;
                stmt.query_map(params![line, limit], row_to_record)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id DESC LIMIT ?1"))?;
                stmt.query_map(params![limit], row_to_record)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        records.reverse();
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, StatusStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StatusStore::new(dir.path().join("status.db"));
        (dir, store)
    }

    fn new_record(line: &str, status: &str, details: &str) -> NewStatusRecord {
        NewStatusRecord::from(&LineStatus::new(line, status, details))
    }

    #[test]
    fn test_get_latest_on_empty_store() {
        let (_dir, store) = temp_store();
        assert!(store.get_latest("Central").unwrap().is_none());
    }

    #[test]
    fn test_get_latest_returns_last_inserted() {
        let (_dir, store) = temp_store();
        store
            .insert(&[
                new_record("Central", "Good Service", ""),
                new_record("Victoria", "Minor Delays", "Earlier signal failure."),
            ])
            .unwrap();
        store
            .insert(&[new_record("Central", "Severe Delays", "Train cancellations.")])
            .unwrap();

        let latest = store.get_latest("Central").unwrap().unwrap();
        assert_eq!(latest.status, "Severe Delays");
        assert_eq!(latest.status_details, "Train cancellations.");
        assert!(latest.external_post_id.is_none());

        let victoria = store.get_latest("Victoria").unwrap().unwrap();
        assert_eq!(victoria.status, "Minor Delays");
    }

    #[test]
    fn test_duplicates_are_accepted() {
        let (_dir, store) = temp_store();
        let record = new_record("Jubilee", "Good Service", "");
        store.insert(&[record.clone(), record]).unwrap();
        assert_eq!(store.history(Some("Jubilee"), None).unwrap().len(), 2);
    }

    #[test]
    fn test_timestamp_is_assigned() {
        let (_dir, store) = temp_store();
        let before = Utc::now() - chrono::Duration::seconds(5);
        store.insert(&[new_record("DLR", "Good Service", "")]).unwrap();

        let latest = store.get_latest("DLR").unwrap().unwrap();
        assert!(latest.timestamp >= before);
    }

    #[test]
    fn test_external_post_id_round_trips() {
        let (_dir, store) = temp_store();
        let mut record = new_record("Northern", "Part Closure", "");
        record.external_post_id = Some("1789".to_string());
        store.insert(&[record]).unwrap();

        let latest = store.get_latest("Northern").unwrap().unwrap();
        assert_eq!(latest.external_post_id.as_deref(), Some("1789"));
    }

    #[test]
    fn test_latest_all_one_per_line() {
        let (_dir, store) = temp_store();
        store
            .insert(&[
                new_record("Victoria", "Good Service", ""),
                new_record("Bakerloo", "Minor Delays", ""),
                new_record("Victoria", "Severe Delays", ""),
            ])
            .unwrap();

        let latest = store.latest_all().unwrap();
        let summary: Vec<(&str, &str)> = latest
            .iter()
            .map(|r| (r.line_name.as_str(), r.status.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![("Bakerloo", "Minor Delays"), ("Victoria", "Severe Delays")]
        );
    }

    #[test]
    fn test_history_filters_and_limits() {
        let (_dir, store) = temp_store();
        store
            .insert(&[
                new_record("Central", "Good Service", ""),
                new_record("Central", "Minor Delays", ""),
                new_record("District", "Good Service", ""),
                new_record("Central", "Severe Delays", ""),
            ])
            .unwrap();

        let all = store.history(None, None).unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.windows(2).all(|w| w[0].id < w[1].id));

        let central: Vec<String> = store
            .history(Some("Central"), Some(2))
            .unwrap()
            .into_iter()
            .map(|r| r.status)
            .collect();
        assert_eq!(central, vec!["Minor Delays", "Severe Delays"]);
    }

    #[test]
    fn test_initialize_reports_schema_version() {
        let (_dir, store) = temp_store();
        assert_eq!(store.initialize().unwrap(), CURRENT_SCHEMA_VERSION);
        assert_eq!(store.initialize().unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_empty_insert_is_noop() {
        let (_dir, store) = temp_store();
        store.insert(&[]).unwrap();
        assert!(store.history(None, None).unwrap().is_empty());
    }
}
