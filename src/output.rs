//! CSV export of the status history.

use anyhow::Result;
use tracing::{debug, info};

use crate::store::StatusRecord;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// Writes `records` to a CSV file at `path`, replacing any existing file.
///
/// A header row is always written, even when `records` is empty.
pub fn write_history(path: &Path, records: &[StatusRecord]) -> Result<()> {
    debug!(path = %path.display(), count = records.len(), "Writing CSV history");

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record([
        "id",
        "line_name",
        "status",
        "status_details",
        "timestamp",
        "external_post_id",
    ])?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = records.len(), "History exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::fs;

    fn record(id: i64, line: &str, status: &str, details: &str) -> StatusRecord {
        StatusRecord {
            id,
            line_name: line.to_string(),
            status: status.to_string(),
            status_details: details.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap(),
            external_post_id: None,
        }
    }

    #[test]
    fn test_write_history_header_only_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");

        write_history(&path, &[]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content.trim_end(),
            "id,line_name,status,status_details,timestamp,external_post_id"
        );
    }

    #[test]
    fn test_write_history_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");

        write_history(
            &path,
            &[
                record(1, "Central", "Good Service", ""),
                record(2, "Jubilee", "Severe Delays", "Signal failure, expect delays."),
            ],
        )
        .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1,Central,Good Service,,2024-03-01T08:30:00Z"));
        assert!(lines[2].contains("\"Signal failure, expect delays.\""));
    }

    #[test]
    fn test_write_history_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");

        write_history(&path, &[record(1, "DLR", "Good Service", "")]).unwrap();
        write_history(&path, &[record(2, "DLR", "Minor Delays", "")]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("Minor Delays"));
        assert!(!content.contains("Good Service"));
    }
}
