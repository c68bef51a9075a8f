//! Refresh orchestrator
//!
//! Coordinates feed fetch, normalization and the atomic catalog replace.
//! Feed failures are isolated: a partial catalog from the succeeding feeds
//! beats no refresh, because the previous generation is only replaced once
//! the new one is fully assembled. Only zero surviving feeds fails the
//! refresh, and even then the prior generation keeps serving.

use crate::catalog::CatalogStore;
use crate::error::{AppError, Result};
use crate::feeds::{FeedId, FeedSource, FetchError};
use crate::model::Instrument;
use crate::normalize;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pipeline phase, observable while a refresh runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RefreshPhase {
    Idle,
    Fetching,
    Normalizing,
    Publishing,
}

/// Outcome of one feed within a refresh
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FeedStatus {
    /// Feed fetched and normalized; `rows` made it into the merge,
    /// `skipped_rows` were dropped by the row-level degrade policy
    Loaded { rows: usize, skipped_rows: usize },
    /// Feed contributed nothing (fetch/parse failure or deadline)
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedReport {
    pub feed: FeedId,
    #[serde(flatten)]
    pub status: FeedStatus,
}

/// Summary of one refresh invocation
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub feeds: Vec<FeedReport>,
    pub total_instruments: usize,
    pub duration_ms: u64,
    /// Whether a new generation was published. False only when every feed
    /// failed; the prior generation is untouched in that case.
    pub published: bool,
}

impl RefreshReport {
    pub fn failed_feeds(&self) -> Vec<FeedId> {
        self.feeds
            .iter()
            .filter(|f| matches!(f.status, FeedStatus::Skipped { .. }))
            .map(|f| f.feed)
            .collect()
    }

    /// User-visible refresh summary
    pub fn summary(&self) -> String {
        if !self.published {
            return "Refresh failed: no feed could be loaded".to_string();
        }

        let failed = self.failed_feeds();
        if failed.is_empty() {
            format!("{} instruments loaded", self.total_instruments)
        } else {
            let names: Vec<&str> = failed.iter().map(|f| f.file_name()).collect();
            format!(
                "{} instruments loaded, feeds {{{}}} failed",
                self.total_instruments,
                names.join(", ")
            )
        }
    }
}

/// Coordinates one refresh at a time over the six feeds
pub struct RefreshOrchestrator {
    source: Arc<dyn FeedSource>,
    store: Arc<CatalogStore>,
    scratch_dir: PathBuf,
    deadline: Duration,
    in_flight: AtomicBool,
    phase: RwLock<RefreshPhase>,
}

impl RefreshOrchestrator {
    pub fn new(
        source: Arc<dyn FeedSource>,
        store: Arc<CatalogStore>,
        scratch_dir: PathBuf,
        deadline: Duration,
    ) -> Self {
        Self {
            source,
            store,
            scratch_dir,
            deadline,
            in_flight: AtomicBool::new(false),
            phase: RwLock::new(RefreshPhase::Idle),
        }
    }

    /// Current pipeline phase
    pub fn phase(&self) -> RefreshPhase {
        *self.phase.read()
    }

    /// Run one full refresh: fetch all feeds, normalize whatever arrived,
    /// publish the merged set as a new catalog generation.
    ///
    /// A refresh arriving while another is in flight is rejected with
    /// [`AppError::RefreshInProgress`].
    pub async fn refresh(&self) -> Result<RefreshReport> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::RefreshInProgress);
        }
        let _guard = InFlightGuard(self);

        let started = Instant::now();
        tracing::info!("Starting master contract refresh");

        std::fs::create_dir_all(&self.scratch_dir)?;

        *self.phase.write() = RefreshPhase::Fetching;
        let fetch_outcomes = self.fetch_all().await;

        *self.phase.write() = RefreshPhase::Normalizing;
        let (feeds, merged) = self.normalize_all(&fetch_outcomes);

        // Scratch files are transient; remove them whatever happens next
        self.cleanup_scratch();

        let loaded = feeds
            .iter()
            .filter(|f| matches!(f.status, FeedStatus::Loaded { .. }))
            .count();

        let report = if loaded == 0 {
            tracing::error!("Refresh failed: every feed was skipped");
            RefreshReport {
                feeds,
                total_instruments: 0,
                duration_ms: started.elapsed().as_millis() as u64,
                published: false,
            }
        } else {
            *self.phase.write() = RefreshPhase::Publishing;
            let total = self.store.replace_all(merged)?;

            RefreshReport {
                feeds,
                total_instruments: total,
                duration_ms: started.elapsed().as_millis() as u64,
                published: true,
            }
        };

        tracing::info!("{}", report.summary());
        Ok(report)
    }

    /// Fetch every feed concurrently into the scratch directory.
    ///
    /// Each feed has its own timeout inside the source; the overall deadline
    /// abandons stragglers without discarding feeds that already completed.
    async fn fetch_all(&self) -> DashMap<FeedId, std::result::Result<(), String>> {
        let outcomes: Arc<DashMap<FeedId, std::result::Result<(), String>>> =
            Arc::new(DashMap::new());

        let mut handles = Vec::with_capacity(FeedId::ALL.len());
        for feed in FeedId::ALL {
            let source = Arc::clone(&self.source);
            let outcomes = Arc::clone(&outcomes);
            let path = self.scratch_path(feed);

            handles.push(tokio::spawn(async move {
                let outcome = match source.fetch(feed).await {
                    Ok(bytes) => std::fs::write(&path, &bytes)
                        .map_err(|e| format!("scratch write failed: {}", e)),
                    Err(FetchError::Timeout) => Err("fetch timed out".to_string()),
                    Err(e) => Err(e.to_string()),
                };

                if let Err(reason) = &outcome {
                    tracing::warn!("Feed {} failed: {}", feed, reason);
                }
                outcomes.insert(feed, outcome);
            }));
        }

        let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
        let all = futures_util::future::join_all(handles);
        if tokio::time::timeout(self.deadline, all).await.is_err() {
            tracing::warn!(
                "Refresh deadline of {:?} exceeded, publishing completed feeds only",
                self.deadline
            );
            for handle in abort_handles {
                handle.abort();
            }
        }

        for feed in FeedId::ALL {
            outcomes
                .entry(feed)
                .or_insert_with(|| Err("refresh deadline exceeded".to_string()));
        }

        Arc::try_unwrap(outcomes).unwrap_or_else(|arc| (*arc).clone())
    }

    /// Normalize every feed whose scratch file arrived and merge the rows.
    /// Normalization is pure and per-feed; one feed's bad rows never touch
    /// another feed's output.
    fn normalize_all(
        &self,
        outcomes: &DashMap<FeedId, std::result::Result<(), String>>,
    ) -> (Vec<FeedReport>, Vec<Instrument>) {
        let mut feeds = Vec::with_capacity(FeedId::ALL.len());
        let mut merged = Vec::new();

        for feed in FeedId::ALL {
            let fetch_failure = outcomes
                .get(&feed)
                .and_then(|o| o.value().as_ref().err().cloned());
            if let Some(reason) = fetch_failure {
                feeds.push(FeedReport {
                    feed,
                    status: FeedStatus::Skipped { reason },
                });
                continue;
            }

            let status = match std::fs::read_to_string(self.scratch_path(feed)) {
                Ok(text) => {
                    let normalized = normalize::normalize_feed(feed, &text);
                    tracing::info!(
                        "Normalized {}: {} rows ({} skipped)",
                        feed,
                        normalized.instruments.len(),
                        normalized.skipped_rows
                    );
                    let status = FeedStatus::Loaded {
                        rows: normalized.instruments.len(),
                        skipped_rows: normalized.skipped_rows,
                    };
                    merged.extend(normalized.instruments);
                    status
                }
                Err(e) => FeedStatus::Skipped {
                    reason: format!("scratch file unreadable: {}", e),
                },
            };
            feeds.push(FeedReport { feed, status });
        }

        (feeds, merged)
    }

    fn scratch_path(&self, feed: FeedId) -> PathBuf {
        self.scratch_dir.join(format!("{}.csv", feed.file_name()))
    }

    fn cleanup_scratch(&self) {
        for feed in FeedId::ALL {
            let path = self.scratch_path(feed);
            if path.exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::warn!("Failed to remove scratch file {:?}: {}", path, e);
                }
            }
        }
    }
}

/// Clears the in-flight flag and returns the phase to idle on every exit path
struct InFlightGuard<'a>(&'a RefreshOrchestrator);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        *self.0.phase.write() = RefreshPhase::Idle;
        self.0.in_flight.store(false, Ordering::SeqCst);
    }
}
