use crate::error::{Result, StatusBotError};
use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that stamps every request with a credential header.
///
/// The header is validated once at construction, so a malformed token is a
/// configuration error rather than a failure on the first request.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    value: HeaderValue,
}

impl<C> ApiKey<C> {
    /// `Authorization: Bearer <token>`, as expected by the Threads Graph API.
    pub fn bearer(inner: C, token: &str) -> Result<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| StatusBotError::Config(format!("invalid bearer token: {e}")))?;
        value.set_sensitive(true);
        Ok(Self {
            inner,
            header_name: AUTHORIZATION,
            value,
        })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.value.clone());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;

    #[test]
    fn test_bearer_rejects_control_characters() {
        let client = BasicClient::new().unwrap();
        let result = ApiKey::bearer(client, "bad\ntoken");
        assert!(matches!(result, Err(StatusBotError::Config(_))));
    }

    #[test]
    fn test_bearer_value_is_sensitive() {
        let client = BasicClient::new().unwrap();
        let key = ApiKey::bearer(client, "secret").unwrap();
        assert!(key.value.is_sensitive());
        assert_eq!(key.value.to_str().unwrap(), "Bearer secret");
    }
}
