//! Instrument master-data pipeline
//!
//! Ingests the broker's six heterogeneous per-exchange instrument listings,
//! normalizes them into one canonical catalog, and resolves between the
//! application's canonical trading symbols and the broker's native
//! symbol/token identifiers. Every order, quote and watchlist subsystem
//! resolves through this crate before talking to the broker.

pub mod catalog;
pub mod config;
pub mod error;
pub mod feeds;
pub mod model;
pub mod normalize;
pub mod refresh;
pub mod resolver;
pub mod service;

pub use catalog::{CatalogDb, CatalogStore};
pub use config::CatalogConfig;
pub use error::{AppError, Result};
pub use feeds::{FeedId, FeedSource, FetchError, HttpFeedSource};
pub use model::{Exchange, Instrument, InstrumentType};
pub use refresh::{FeedStatus, RefreshOrchestrator, RefreshPhase, RefreshReport};
pub use resolver::Resolver;
pub use service::CatalogService;
