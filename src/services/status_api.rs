//! Trait and types for reading current line statuses from a transit authority.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The severity description TfL uses when a line is running normally.
pub const GOOD_SERVICE: &str = "Good Service";

/// A category of transit line used to scope the status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Tube,
    Overground,
    Dlr,
    ElizabethLine,
}

impl Mode {
    /// Mode identifier as it appears in TfL URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Tube => "tube",
            Mode::Overground => "overground",
            Mode::Dlr => "dlr",
            Mode::ElizabethLine => "elizabeth-line",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Modes polled on every run.
pub const DEFAULT_MODES: [Mode; 4] = [Mode::Tube, Mode::Overground, Mode::Dlr, Mode::ElizabethLine];

/// Joins modes into the comma-separated path segment TfL expects.
pub fn join_modes(modes: &[Mode]) -> String {
    modes.iter().map(Mode::as_str).collect::<Vec<_>>().join(",")
}

/// Current status of a single line, as reported upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineStatus {
    pub line_name: String,
    pub status: String,
    /// Free-text reason; empty when upstream gives none.
    pub status_details: String,
}

impl LineStatus {
    pub fn new(
        line_name: impl Into<String>,
        status: impl Into<String>,
        status_details: impl Into<String>,
    ) -> Self {
        Self {
            line_name: line_name.into(),
            status: status.into(),
            status_details: status_details.into(),
        }
    }

    pub fn is_good_service(&self) -> bool {
        self.status == GOOD_SERVICE
    }
}

/// Abstraction over a line status provider (e.g., the TfL unified API).
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Returns the current status of every line in `modes`.
    ///
    /// Fails with [`crate::error::StatusBotError::UpstreamUnavailable`] when the
    /// provider does not answer with a success status. Never retries.
    async fn fetch_statuses(&self, modes: &[Mode]) -> Result<Vec<LineStatus>>;
}
