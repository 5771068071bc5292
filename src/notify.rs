//! Turns detected changes into posts and dispatches them concurrently.

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{error, info};

use crate::error::{Result, StatusBotError};
use crate::services::post_api::{PostPublisher, PublishedPost};
use crate::services::status_api::LineStatus;

/// Splits changes into (good service, everything else), keeping input order.
pub fn partition_changes(changes: &[LineStatus]) -> (Vec<&LineStatus>, Vec<&LineStatus>) {
    changes.iter().partition(|c| c.is_good_service())
}

/// Message for a single line that is not running a good service.
pub fn format_status_message(change: &LineStatus) -> String {
    if change.status_details.is_empty() {
        format!("{} on {}", change.status, change.line_name)
    } else {
        format!(
            "{} on {}\n\n{}",
            change.status, change.line_name, change.status_details
        )
    }
}

/// Combined message for every line that returned to good service, or `None`
/// if there are none.
pub fn format_good_service_message(good: &[&LineStatus]) -> Option<String> {
    if good.is_empty() {
        return None;
    }
    let lines: Vec<&str> = good.iter().map(|c| c.line_name.as_str()).collect();
    Some(format!("Good service reported again on {}", lines.join(", ")))
}

/// All messages for a batch of changes: one per degraded line, then the
/// combined good-service message when there is one.
pub fn build_messages(changes: &[LineStatus]) -> Vec<String> {
    let (good, other) = partition_changes(changes);
    let mut messages: Vec<String> = other.into_iter().map(format_status_message).collect();
    messages.extend(format_good_service_message(&good));
    messages
}

/// Result of one message's dispatch.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub message: String,
    pub result: Result<PublishedPost>,
}

#[derive(Debug, Default)]
pub struct NotifyReport {
    pub outcomes: Vec<DispatchOutcome>,
}

impl NotifyReport {
    pub fn published(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.published()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &StatusBotError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.message.as_str(), e)))
    }
}

pub struct Notifier<P> {
    publisher: P,
}

impl<P: PostPublisher> Notifier<P> {
    pub fn new(publisher: P) -> Self {
        Self { publisher }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Publishes every message for `changes` concurrently and waits for all
    /// of them. A failed post is recorded in the report and never cancels
    /// the others.
    #[tracing::instrument(skip_all, fields(changes = changes.len()))]
    pub async fn notify(&self, changes: &[LineStatus]) -> NotifyReport {
        let messages = build_messages(changes);
        if messages.is_empty() {
            info!("No status changes to publish");
            return NotifyReport::default();
        }

        let tasks = messages.into_iter().map(|message| async move {
            info!(text = %message, "Publishing post");
            let result = self.publisher.publish(&message).await;
            if let Err(e) = &result {
                error!(error = %e, text = %message, "Failed to publish post");
            }
            DispatchOutcome { message, result }
        });

        let report = NotifyReport {
            outcomes: join_all(tasks).await,
        };
        info!(
            published = report.published(),
            failed = report.failed(),
            "Notification dispatch complete"
        );
        report
    }
}

/// Publisher that only logs, for runs without posting credentials.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunPublisher;

#[async_trait]
impl PostPublisher for DryRunPublisher {
    async fn publish(&self, text: &str) -> Result<PublishedPost> {
        info!(text, "Dry run, not posting");
        Ok(PublishedPost {
            creation_id: "dry-run".to_string(),
            post_id: None,
            response: serde_json::Value::Null,
        })
    }
}
