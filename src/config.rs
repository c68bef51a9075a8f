//! Catalog configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default Fyers symbol-details endpoint
pub const DEFAULT_FEED_BASE_URL: &str = "https://public.fyers.in/sym_details";

/// Configuration for feed fetching and refresh behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL for the per-exchange listing files
    pub feed_base_url: String,
    /// Per-feed fetch timeout in seconds
    pub feed_timeout_secs: u64,
    /// Overall refresh deadline in seconds; feeds still in flight when it
    /// expires are skipped, completed ones are published anyway
    pub refresh_deadline_secs: u64,
    /// Scratch directory for downloaded feed files
    pub scratch_dir: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            feed_base_url: DEFAULT_FEED_BASE_URL.to_string(),
            feed_timeout_secs: 60,
            refresh_deadline_secs: 300,
            scratch_dir: std::env::temp_dir().join("master-contract"),
        }
    }
}

impl CatalogConfig {
    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    pub fn refresh_deadline(&self) -> Duration {
        Duration::from_secs(self.refresh_deadline_secs)
    }
}
