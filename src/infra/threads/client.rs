use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::ThreadsConfig;
use crate::error::{Result, StatusBotError};
use crate::fetch::auth::ApiKey;
use crate::fetch::{BasicClient, HttpClient, build_request, send};
use crate::retry::retry_with_backoff;
use crate::services::post_api::{PostPublisher, PublishedPost};

/// Longest text the Threads API accepts for a single post.
pub const MAX_POST_CHARS: usize = 500;
const ELLIPSIS: &str = "...";
const TRUNCATED_CHARS: usize = 496;

#[derive(Serialize)]
struct CreatePostRequest<'a> {
    media_type: &'static str,
    text: &'a str,
}

#[derive(Serialize)]
struct PublishPostRequest<'a> {
    creation_id: &'a str,
}

#[derive(Deserialize)]
struct CreatePostResponse {
    id: String,
}

/// Shortens `text` to fit a post: anything over 500 characters becomes the
/// first 496 characters followed by `...`.
pub fn truncate_post(text: &str) -> String {
    if text.chars().count() <= MAX_POST_CHARS {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(TRUNCATED_CHARS).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Failure of a single create attempt, kept separate from the public error so
/// the retry loop can see status and body.
#[derive(Debug)]
enum CreateAttemptError {
    Rejected { status: StatusCode, body: String },
    Other(StatusBotError),
}

impl std::fmt::Display for CreateAttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreateAttemptError::Rejected { status, body } => write!(f, "{status}: {body}"),
            CreateAttemptError::Other(e) => e.fmt(f),
        }
    }
}

/// Two-phase (create, then publish) client for the Threads Graph API.
pub struct ThreadsClient<C = BasicClient> {
    http: ApiKey<C>,
    config: ThreadsConfig,
}

impl<C: HttpClient> ThreadsClient<C> {
    pub fn new(http: C, config: ThreadsConfig) -> Result<Self> {
        let http = ApiKey::bearer(http, &config.token)?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_version,
            self.config.user_id,
            action
        )
    }

    async fn try_create(&self, text: &str) -> std::result::Result<String, CreateAttemptError> {
        let payload = CreatePostRequest {
            media_type: "TEXT",
            text,
        };
        let req = build_request(Method::POST, &self.endpoint("threads"), Some(&payload))
            .map_err(CreateAttemptError::Other)?;
        let (status, body) = send(&self.http, req)
            .await
            .map_err(CreateAttemptError::Other)?;

        if !status.is_success() {
            error!(%status, body = %body, "Failed to create post");
            return Err(CreateAttemptError::Rejected { status, body });
        }

        let created: CreatePostResponse = serde_json::from_str(&body)
            .map_err(|e| CreateAttemptError::Other(StatusBotError::Json(e)))?;
        Ok(created.id)
    }

    /// Creates a draft text post and returns its creation id.
    ///
    /// Rejections and transport errors are retried with the configured
    /// backoff; a malformed success body is not.
    #[tracing::instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn create_post(&self, text: &str) -> Result<String> {
        let text = truncate_post(text);

        let outcome = retry_with_backoff(
            &self.config.retry,
            "create_post",
            |e: &CreateAttemptError| {
                matches!(
                    e,
                    CreateAttemptError::Rejected { .. }
                        | CreateAttemptError::Other(StatusBotError::Transport(_))
                )
            },
            || self.try_create(&text),
        )
        .await;

        match outcome {
            Ok(id) => {
                info!(creation_id = %id, "Post created");
                Ok(id)
            }
            Err((CreateAttemptError::Rejected { status, body }, attempts)) => {
                Err(StatusBotError::PostCreationFailure {
                    attempts,
                    status,
                    body,
                })
            }
            Err((CreateAttemptError::Other(e), _)) => Err(e),
        }
    }

    /// Publishes a previously created post. Not retried.
    #[tracing::instrument(skip(self))]
    pub async fn publish_post(&self, creation_id: &str) -> Result<serde_json::Value> {
        let payload = PublishPostRequest { creation_id };
        let req = build_request(Method::POST, &self.endpoint("threads_publish"), Some(&payload))?;
        let (status, body) = send(&self.http, req).await?;

        if !status.is_success() {
            error!(%status, body = %body, "Failed to publish post");
            return Err(StatusBotError::PostPublishFailure { status, body });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl<C: HttpClient> PostPublisher for ThreadsClient<C> {
    async fn publish(&self, text: &str) -> Result<PublishedPost> {
        let creation_id = self.create_post(text).await?;
        // The provider processes drafts asynchronously.
        tokio::time::sleep(self.config.publish_delay).await;
        let response = self.publish_post(&creation_id).await?;
        let post_id = response["id"].as_str().map(str::to_string);
        info!(%creation_id, post_id = post_id.as_deref().unwrap_or(""), "Post published");

        Ok(PublishedPost {
            creation_id,
            post_id,
            response,
        })
    }
}
