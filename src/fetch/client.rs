use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes a prepared request. Implemented by the plain reqwest client and by
/// wrappers that decorate requests (credentials) before delegating.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
