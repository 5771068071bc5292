mod client;
mod basic;
pub mod auth;

pub use client::HttpClient;
pub use basic::BasicClient;

use crate::error::{Result, StatusBotError};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, StatusCode, Url};
use serde::Serialize;

/// Builds a request for `url`, JSON-encoding `payload` into the body when given.
pub fn build_request<T: Serialize + ?Sized>(
    method: Method,
    url: &str,
    payload: Option<&T>,
) -> Result<Request> {
    let url = Url::parse(url).map_err(|e| StatusBotError::Config(format!("invalid url {url}: {e}")))?;
    let mut req = Request::new(method, url);

    if let Some(payload) = payload {
        *req.body_mut() = Some(serde_json::to_vec(payload)?.into());
        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    Ok(req)
}

/// Sends `req` and returns the status together with the raw body text.
///
/// Non-success statuses are not errors here; callers map them onto their own
/// variants so the body can be kept for diagnosis.
pub async fn send<C: HttpClient + ?Sized>(client: &C, req: Request) -> Result<(StatusCode, String)> {
    let resp = client.execute(req).await?;
    let status = resp.status();
    let body = resp.text().await?;
    Ok((status, body))
}
