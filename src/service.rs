//! Catalog service
//!
//! The facade the UI, order, quote and streaming collaborators call. Ties
//! the catalog store, resolver and refresh orchestrator together and exposes
//! exactly the surface they consume: refresh, search, lookup and resolution.

use crate::catalog::{CatalogDb, CatalogStore};
use crate::config::CatalogConfig;
use crate::error::{AppError, Result};
use crate::feeds::{FeedSource, HttpFeedSource};
use crate::model::{Exchange, Instrument};
use crate::refresh::{RefreshOrchestrator, RefreshPhase, RefreshReport};
use crate::resolver::Resolver;
use std::sync::Arc;

const DEFAULT_SEARCH_LIMIT: usize = 50;

/// Instrument catalog service
pub struct CatalogService {
    store: Arc<CatalogStore>,
    resolver: Resolver,
    orchestrator: RefreshOrchestrator,
}

impl CatalogService {
    /// Build the service over the broker's public feed endpoint
    pub fn new(config: &CatalogConfig, db: Arc<CatalogDb>) -> Result<Self> {
        let source: Arc<dyn FeedSource> = Arc::new(HttpFeedSource::new(config));
        Self::with_source(config, db, source)
    }

    /// Build the service over an injected feed source (tests, replay)
    pub fn with_source(
        config: &CatalogConfig,
        db: Arc<CatalogDb>,
        source: Arc<dyn FeedSource>,
    ) -> Result<Self> {
        let store = Arc::new(CatalogStore::new(db)?);
        let resolver = Resolver::new(Arc::clone(&store));
        let orchestrator = RefreshOrchestrator::new(
            source,
            Arc::clone(&store),
            config.scratch_dir.clone(),
            config.refresh_deadline(),
        );

        Ok(Self {
            store,
            resolver,
            orchestrator,
        })
    }

    /// Trigger a full catalog refresh
    pub async fn refresh(&self) -> Result<RefreshReport> {
        self.orchestrator.refresh().await
    }

    /// Refresh only if the catalog is empty (first run, or storage wiped).
    /// Returns the report when a refresh actually ran.
    pub async fn ensure_loaded(&self) -> Result<Option<RefreshReport>> {
        if self.store.count() > 0 {
            return Ok(None);
        }
        tracing::info!("Catalog empty, triggering automatic refresh");
        self.refresh().await.map(Some)
    }

    /// Symbol autocomplete: case-insensitive substring search
    pub fn search(
        &self,
        query: &str,
        exchange: Option<Exchange>,
        limit: Option<usize>,
    ) -> Vec<Instrument> {
        self.store
            .search(query, exchange, limit.unwrap_or(DEFAULT_SEARCH_LIMIT))
    }

    /// Exact lookup, used for lot size/tick size before order entry
    pub fn find(&self, symbol: &str, exchange: Exchange) -> Option<Instrument> {
        self.store.find(symbol, exchange)
    }

    /// Token lookup, used when translating inbound broker messages
    pub fn find_by_token(&self, token: &str, exchange: Option<Exchange>) -> Option<Instrument> {
        self.store.find_by_token(token, exchange)
    }

    /// Broker symbol for a canonical symbol, before every quote/order call
    pub fn resolve_broker_symbol(&self, symbol: &str, exchange: Exchange) -> Result<Option<String>> {
        self.resolver.resolve_broker_symbol(symbol, exchange)
    }

    /// Like [`resolve_broker_symbol`](Self::resolve_broker_symbol) but a miss
    /// is an error with the user-visible message.
    pub fn require_broker_symbol(&self, symbol: &str, exchange: Exchange) -> Result<String> {
        self.resolver
            .resolve_broker_symbol(symbol, exchange)?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Symbol not recognized for this exchange: {} {}",
                    symbol, exchange
                ))
            })
    }

    /// Canonical symbol for a broker token or broker symbol
    pub fn resolve_canonical_symbol(
        &self,
        identifier: &str,
        exchange: Option<Exchange>,
    ) -> Result<Option<String>> {
        self.resolver.resolve_canonical_symbol(identifier, exchange)
    }

    /// Total instruments in the current generation
    pub fn count(&self) -> usize {
        self.store.count()
    }

    /// Current refresh phase
    pub fn phase(&self) -> RefreshPhase {
        self.orchestrator.phase()
    }
}
