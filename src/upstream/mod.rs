//! Upstream availability client.
//!
//! One GET per SKU against the store-pickup endpoint. Transport failures,
//! unexpected statuses and malformed bodies all come back as
//! [`UpstreamError`] so callers can store them as a result.

mod client;
mod response;
mod user_agent;

pub use client::{FulfillmentClient, DEFAULT_ENDPOINT, DEFAULT_LOCATION};
pub use response::parse_availability;
pub use user_agent::{random_user_agent, IMPERSONATE_USER_AGENTS};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};

use crate::models::StoreAvailability;

/// Errors from a single availability lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("upstream returned HTTP {0}")]
    Http(u16),
    #[error("unexpected response format: {0}")]
    Format(String),
    #[error("no inventory data returned for {0}")]
    NoInventoryData(String),
    #[error("could not build HTTP client: {0}")]
    Client(String),
}

impl UpstreamError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Transport(format!("timed out: {}", e))
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }
}

/// Source of store availability for a part code.
#[async_trait]
pub trait AvailabilityClient: Send + Sync {
    /// Fetch per-store availability for `code`, optionally through `proxy`.
    async fn fetch_availability(
        &self,
        code: &str,
        headers: HeaderMap,
        proxy: Option<&str>,
    ) -> Result<Vec<StoreAvailability>, UpstreamError>;
}

/// Per-request headers: rotated user agent plus JSON accept.
pub fn request_headers(user_agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(user_agent) {
        headers.insert(USER_AGENT, value);
    }
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers
}
