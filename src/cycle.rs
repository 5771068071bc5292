//! One fetch → detect → persist → notify pass.

use tracing::{error, info, warn};

use crate::detect::{detect_changes, preview_changes};
use crate::error::Result;
use crate::notify::{Notifier, NotifyReport};
use crate::services::post_api::PostPublisher;
use crate::services::status_api::{LineStatus, Mode, StatusSource};
use crate::store::StatusStore;

#[derive(Debug, Default)]
pub struct CycleSummary {
    /// Lines returned by the status service; zero when it was unavailable.
    pub fetched: usize,
    pub changes: Vec<LineStatus>,
    pub report: NotifyReport,
}

type Detector = fn(&StatusStore, &[LineStatus]) -> Result<Vec<LineStatus>>;

/// Runs a single cycle.
///
/// An unavailable or malformed status service ends the cycle early with an
/// empty summary. Store failures are returned. Publishing failures are
/// recorded in the summary's report.
#[tracing::instrument(skip_all)]
pub async fn run_cycle<S, P>(
    source: &S,
    modes: &[Mode],
    store: &StatusStore,
    notifier: &Notifier<P>,
) -> Result<CycleSummary>
where
    S: StatusSource + ?Sized,
    P: PostPublisher,
{
    cycle_with(source, modes, store, notifier, detect_changes).await
}

/// A cycle that reads the store but never writes to it, for `--dry-run`.
/// Whatever it reports is still a change on the next [`run_cycle`].
#[tracing::instrument(skip_all)]
pub async fn preview_cycle<S, P>(
    source: &S,
    modes: &[Mode],
    store: &StatusStore,
    notifier: &Notifier<P>,
) -> Result<CycleSummary>
where
    S: StatusSource + ?Sized,
    P: PostPublisher,
{
    cycle_with(source, modes, store, notifier, preview_changes).await
}

async fn cycle_with<S, P>(
    source: &S,
    modes: &[Mode],
    store: &StatusStore,
    notifier: &Notifier<P>,
    detect: Detector,
) -> Result<CycleSummary>
where
    S: StatusSource + ?Sized,
    P: PostPublisher,
{
    let current = match source.fetch_statuses(modes).await {
        Ok(current) => current,
        Err(e) if !e.is_fatal() => {
            warn!(error = %e, "Status service unavailable, skipping this cycle");
            return Ok(CycleSummary::default());
        }
        Err(e) => return Err(e),
    };

    let changes = detect(store, &current).inspect_err(|e| {
        error!(error = %e, "Failed to read or persist status changes");
    })?;
    info!(changes = ?changes, "Lines with status change");

    let report = notifier.notify(&changes).await;

    Ok(CycleSummary {
        fetched: current.len(),
        changes,
        report,
    })
}
