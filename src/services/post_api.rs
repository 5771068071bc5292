//! Trait for the social-media side of the pipeline.

use async_trait::async_trait;

use crate::error::Result;

/// A post that made it all the way through create and publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    pub creation_id: String,
    /// Identifier of the live post, when the provider returns one.
    pub post_id: Option<String>,
    /// Raw publish response.
    pub response: serde_json::Value,
}

/// Publishes a single text message.
#[async_trait]
pub trait PostPublisher: Send + Sync {
    async fn publish(&self, text: &str) -> Result<PublishedPost>;
}
