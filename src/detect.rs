//! Change detection against the last stored status of each line.

use tracing::{debug, info};

use crate::error::Result;
use crate::services::status_api::LineStatus;
use crate::store::{NewStatusRecord, StatusStore};

/// Whether `current` differs from the last stored status of its line.
///
/// Only the status string is compared; a new reason for the same status is
/// not a change.
pub fn has_changed(store: &StatusStore, current: &LineStatus) -> Result<bool> {
    let changed = match store.get_latest(&current.line_name)? {
        Some(previous) => previous.status != current.status,
        None => true,
    };
    Ok(changed)
}

/// Returns the entries of `current` whose status changed, in input order.
///
/// Each change is written to the store as soon as it is detected, so a
/// failure part-way through leaves earlier changes committed.
pub fn detect_changes(store: &StatusStore, current: &[LineStatus]) -> Result<Vec<LineStatus>> {
    let mut changes = Vec::new();

    for status in current {
        if has_changed(store, status)? {
            debug!(line = %status.line_name, status = %status.status, "Status changed");
            store.insert(&[NewStatusRecord::from(status)])?;
            changes.push(status.clone());
        }
    }

    info!(
        checked = current.len(),
        changed = changes.len(),
        "Change detection complete"
    );
    Ok(changes)
}

/// Same comparison as [`detect_changes`], but nothing is written. Used by dry
/// runs so the changes are still pending for the next live run.
pub fn preview_changes(store: &StatusStore, current: &[LineStatus]) -> Result<Vec<LineStatus>> {
    let mut changes = Vec::new();
    for status in current {
        if has_changed(store, status)? {
            changes.push(status.clone());
        }
    }

    info!(
        checked = current.len(),
        changed = changes.len(),
        "Change preview complete"
    );
    Ok(changes)
}
