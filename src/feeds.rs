//! Feed client
//!
//! Fetches the raw per-exchange listing files. Each feed is fetched
//! independently with its own timeout; one feed's failure never blocks the
//! others, and there is no automatic retry - the orchestrator decides what a
//! failed feed means for the refresh.

use crate::config::CatalogConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// One downloadable per-exchange instrument listing file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeedId {
    NseCm,
    BseCm,
    NseFo,
    BseFo,
    NseCd,
    McxCom,
}

impl FeedId {
    /// All six feeds, in merge order. Later feeds win on duplicate
    /// `(symbol, exchange)` pairs.
    pub const ALL: [FeedId; 6] = [
        FeedId::NseCm,
        FeedId::BseCm,
        FeedId::NseFo,
        FeedId::BseFo,
        FeedId::NseCd,
        FeedId::McxCom,
    ];

    /// Remote file name (also used for the scratch file)
    pub fn file_name(&self) -> &'static str {
        match self {
            FeedId::NseCm => "NSE_CM",
            FeedId::BseCm => "BSE_CM",
            FeedId::NseFo => "NSE_FO",
            FeedId::BseFo => "BSE_FO",
            FeedId::NseCd => "NSE_CD",
            FeedId::McxCom => "MCX_COM",
        }
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Feed-level fetch failure. Recorded per feed in the refresh report,
/// never fatal to the pipeline on its own.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("fetch timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Source of raw feed bytes.
///
/// The HTTP implementation is the production path; tests substitute a stub
/// so the orchestrator can be exercised without a network.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, feed: FeedId) -> std::result::Result<Vec<u8>, FetchError>;
}

/// HTTP feed source over the broker's public symbol endpoint
pub struct HttpFeedSource {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpFeedSource {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.feed_base_url.trim_end_matches('/').to_string(),
            timeout: config.feed_timeout(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn url(&self, feed: FeedId) -> String {
        format!("{}/{}.csv", self.base_url, feed.file_name())
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, feed: FeedId) -> std::result::Result<Vec<u8>, FetchError> {
        let url = self.url(feed);

        // Per-feed timeout: a slow feed fails alone, the others keep going
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Transport(e.to_string())
            }
        })?;

        tracing::debug!("Downloaded {} ({} bytes)", feed, bytes.len());
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_urls() {
        let source = HttpFeedSource::with_base_url(
            "https://public.fyers.in/sym_details/",
            Duration::from_secs(5),
        );
        assert_eq!(
            source.url(FeedId::NseCm),
            "https://public.fyers.in/sym_details/NSE_CM.csv"
        );
        assert_eq!(
            source.url(FeedId::McxCom),
            "https://public.fyers.in/sym_details/MCX_COM.csv"
        );
    }

    #[test]
    fn test_all_feeds_distinct_files() {
        let mut names: Vec<_> = FeedId::ALL.iter().map(|f| f.file_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 6);
    }
}
