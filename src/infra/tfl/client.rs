use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{CACHE_CONTROL, HeaderValue};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::error::{Result, StatusBotError};
use crate::fetch::{BasicClient, HttpClient, build_request, send};
use crate::services::status_api::{LineStatus, Mode, StatusSource, join_modes};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TflLine {
    name: String,
    #[serde(default)]
    line_statuses: Vec<TflLineStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TflLineStatus {
    status_severity_description: String,
    reason: Option<String>,
}

/// Client for the TfL unified API `Line/Mode/{modes}/Status` endpoint.
pub struct TflClient<C = BasicClient> {
    http: C,
    base_url: String,
}

impl<C: HttpClient> TflClient<C> {
    pub fn new(http: C, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn status_url(&self, modes: &[Mode]) -> String {
        format!("{}/Line/Mode/{}/Status", self.base_url, join_modes(modes))
    }
}

/// Extracts `(name, first severity, first reason)` per line, skipping lines
/// that carry no status entries.
fn parse_line_statuses(body: &str) -> Result<Vec<LineStatus>> {
    let lines: Vec<TflLine> =
        serde_json::from_str(body).map_err(|e| StatusBotError::InvalidUpstreamPayload {
            reason: e.to_string(),
            body: body.to_string(),
        })?;

    let statuses = lines
        .into_iter()
        .filter_map(|line| {
            let Some(first) = line.line_statuses.into_iter().next() else {
                warn!(line = %line.name, "Line has no status entries, skipping");
                return None;
            };
            Some(LineStatus {
                line_name: line.name,
                status: first.status_severity_description,
                status_details: first.reason.unwrap_or_default(),
            })
        })
        .collect();

    Ok(statuses)
}

#[async_trait]
impl<C: HttpClient> StatusSource for TflClient<C> {
    #[tracing::instrument(skip(self, modes), fields(modes = %join_modes(modes)))]
    async fn fetch_statuses(&self, modes: &[Mode]) -> Result<Vec<LineStatus>> {
        let url = self.status_url(modes);
        let mut req = build_request::<()>(Method::GET, &url, None)?;
        req.headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let (status, body) = send(&self.http, req).await?;
        if !status.is_success() {
            error!(%status, body = %body, "Failed to get TfL line status");
            return Err(StatusBotError::UpstreamUnavailable { status, body });
        }

        let statuses = parse_line_statuses(&body).inspect_err(|e| {
            error!(error = %e, body = %body, "Unexpected TfL line status payload");
        })?;

        debug!(?statuses, "Line statuses");
        info!(line_count = statuses.len(), "Fetched line statuses");
        Ok(statuses)
    }
}
