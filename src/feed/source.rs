//! Feed source abstraction
//!
//! Defines the interface for fetching the raw operator feed, with an HTTP
//! implementation over reqwest. The feed is consumed as an opaque byte
//! stream; decoding is the normalizer's concern.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while fetching the feed
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("feed returned HTTP status {status}")]
    Status { status: u16 },
}

/// A source of raw feed bytes
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the complete feed payload.
    ///
    /// Any failure here is fatal to an ingestion run.
    async fn fetch(&self) -> Result<Vec<u8>, FeedError>;

    /// Human-readable location of the feed, used in error responses and logs.
    fn describe(&self) -> &str;
}

/// HTTP feed source backed by a dedicated reqwest client
pub struct HttpFeedSource {
    url: String,
    client: reqwest::Client,
}

impl HttpFeedSource {
    /// Build a source for the given URL with a whole-request timeout.
    pub fn new(url: String, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self) -> Result<Vec<u8>, FeedError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    fn describe(&self) -> &str {
        &self.url
    }
}
