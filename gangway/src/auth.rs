//! # Credential Handling
//!
//! An inbound request must carry `Authorization: <scheme> <token>`. The
//! scheme label occupies a fixed-length prefix that is stripped off, and the
//! remaining bearer token is traded at an external interceptor endpoint for a
//! credential the backends trust. The exchange happens once per request;
//! failures are reported as 401, never retried. Raw token values are never
//! logged and never persisted.
use async_trait::async_trait;
use std::time::Duration;

/// Length of the fixed, non-credential scheme prefix (`Bearer `).
const SCHEME_PREFIX_LEN: usize = 7;
/// Shortest `Authorization` value that can carry a credential.
const MIN_HEADER_LEN: usize = 9;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing or malformed authorization header")]
    MalformedHeader,

    #[error("the token exchange service rejected the credential")]
    Rejected,

    #[error("token exchange request failed: '{0}'")]
    Exchange(#[source] reqwest::Error),
}

/// Strips the fixed-length scheme prefix from an `Authorization` value.
///
/// Anything shorter than [`MIN_HEADER_LEN`] — including an absent header —
/// fails here, before any network call is made.
pub fn strip_scheme(header: Option<&str>) -> Result<&str, AuthError> {
    header
        .filter(|value| value.len() >= MIN_HEADER_LEN)
        .and_then(|value| value.get(SCHEME_PREFIX_LEN..))
        .ok_or(AuthError::MalformedHeader)
}

/// Exchanges an inbound bearer token for a backend-trusted credential.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self, token: &str) -> Result<String, AuthError>;
}

/// Token exchange against an HTTP interceptor endpoint.
pub struct HttpTokenExchanger {
    client: reqwest::Client,
    url: String,
}

impl HttpTokenExchanger {
    pub fn new(url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl TokenExchanger for HttpTokenExchanger {
    async fn exchange(&self, token: &str) -> Result<String, AuthError> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await
            .map_err(AuthError::Exchange)?;

        if !response.status().is_success() {
            return Err(AuthError::Rejected);
        }

        response.text().await.map_err(AuthError::Exchange)
    }
}
