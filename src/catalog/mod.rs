//! Catalog store
//!
//! Holds the canonical instrument set as a versioned snapshot: an immutable
//! [`Generation`] behind one current-generation pointer. `replace_all` builds
//! the next generation off to the side and publishes it with a single pointer
//! swap, so readers see either the fully-old or fully-new catalog and never a
//! partial one. A reader that took a snapshot before the swap keeps a
//! complete generation for as long as it holds the handle.

pub mod db;

pub use db::CatalogDb;

use crate::error::Result;
use crate::model::{Exchange, Instrument};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// One complete, internally consistent catalog version
#[derive(Debug, Default)]
pub struct Generation {
    /// Sorted by `(symbol, exchange)` so search results are deterministic
    instruments: Vec<Instrument>,
    by_symbol: HashMap<(String, Exchange), usize>,
    by_token: HashMap<String, Vec<usize>>,
    by_broker_symbol: HashMap<String, Vec<usize>>,
}

impl Generation {
    /// Build a generation from raw merged rows.
    ///
    /// Duplicate `(symbol, exchange)` pairs resolve last-wins: the later row
    /// in merge order replaces the earlier one.
    pub fn build(instruments: Vec<Instrument>) -> Self {
        let mut deduped: HashMap<(String, Exchange), Instrument> =
            HashMap::with_capacity(instruments.len());
        for instrument in instruments {
            deduped.insert(
                (instrument.symbol.clone(), instrument.exchange),
                instrument,
            );
        }

        let mut instruments: Vec<Instrument> = deduped.into_values().collect();
        instruments.sort_by(|a, b| {
            a.symbol
                .cmp(&b.symbol)
                .then_with(|| a.exchange.cmp(&b.exchange))
        });

        let mut by_symbol = HashMap::with_capacity(instruments.len());
        let mut by_token: HashMap<String, Vec<usize>> = HashMap::with_capacity(instruments.len());
        let mut by_broker_symbol: HashMap<String, Vec<usize>> =
            HashMap::with_capacity(instruments.len());

        for (idx, instrument) in instruments.iter().enumerate() {
            by_symbol.insert((instrument.symbol.clone(), instrument.exchange), idx);
            by_token
                .entry(instrument.token.clone())
                .or_default()
                .push(idx);
            by_broker_symbol
                .entry(instrument.broker_symbol.clone())
                .or_default()
                .push(idx);
        }

        Self {
            instruments,
            by_symbol,
            by_token,
            by_broker_symbol,
        }
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn count(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Exact `(symbol, exchange)` lookup
    pub fn find(&self, symbol: &str, exchange: Exchange) -> Option<&Instrument> {
        self.by_symbol
            .get(&(symbol.to_string(), exchange))
            .map(|&idx| &self.instruments[idx])
    }

    /// Token lookup, optionally scoped to an exchange segment
    pub fn find_by_token(&self, token: &str, exchange: Option<Exchange>) -> Option<&Instrument> {
        self.scoped_lookup(self.by_token.get(token), exchange)
    }

    /// Broker-symbol lookup, optionally scoped to an exchange segment
    pub fn find_by_broker_symbol(
        &self,
        broker_symbol: &str,
        exchange: Option<Exchange>,
    ) -> Option<&Instrument> {
        self.scoped_lookup(self.by_broker_symbol.get(broker_symbol), exchange)
    }

    fn scoped_lookup(
        &self,
        indices: Option<&Vec<usize>>,
        exchange: Option<Exchange>,
    ) -> Option<&Instrument> {
        indices?
            .iter()
            .map(|&idx| &self.instruments[idx])
            .find(|instrument| exchange.map_or(true, |ex| instrument.exchange == ex))
    }

    /// Case-insensitive substring search on `symbol`, bounded by `limit`.
    /// Results follow the generation's sorted order.
    pub fn search(&self, query: &str, exchange: Option<Exchange>, limit: usize) -> Vec<Instrument> {
        let query_lower = query.to_lowercase();

        self.instruments
            .iter()
            .filter(|instrument| {
                let matches_query = instrument.symbol.to_lowercase().contains(&query_lower);
                let matches_exchange = exchange.map_or(true, |ex| instrument.exchange == ex);
                matches_query && matches_exchange
            })
            .take(limit)
            .cloned()
            .collect()
    }
}

/// The canonical instrument catalog.
///
/// The only shared mutable state in the pipeline: written exclusively by the
/// refresh orchestrator, read by everyone else. Reads never block on a
/// refresh.
pub struct CatalogStore {
    db: Arc<CatalogDb>,
    current: RwLock<Arc<Generation>>,
}

impl CatalogStore {
    /// Create the store over an injected storage handle, warm-loading any
    /// generation persisted by a previous run.
    pub fn new(db: Arc<CatalogDb>) -> Result<Self> {
        let persisted = db.load_all()?;
        let generation = if persisted.is_empty() {
            Generation::default()
        } else {
            Generation::build(persisted)
        };

        if !generation.is_empty() {
            tracing::info!("Warm-loaded {} instruments from storage", generation.count());
        }

        Ok(Self {
            db,
            current: RwLock::new(Arc::new(generation)),
        })
    }

    /// Current generation handle. Cheap; holders keep a consistent view for
    /// as long as they keep the `Arc`.
    pub fn snapshot(&self) -> Arc<Generation> {
        self.current.read().clone()
    }

    /// Atomically replace the whole catalog with a new generation.
    ///
    /// The generation is built and persisted before the pointer swap, so a
    /// failure anywhere leaves the current generation serving.
    pub fn replace_all(&self, instruments: Vec<Instrument>) -> Result<usize> {
        let generation = Arc::new(Generation::build(instruments));

        self.db.replace_all(generation.instruments())?;

        *self.current.write() = Arc::clone(&generation);

        tracing::info!("Published catalog generation with {} instruments", generation.count());
        Ok(generation.count())
    }

    pub fn find(&self, symbol: &str, exchange: Exchange) -> Option<Instrument> {
        self.snapshot().find(symbol, exchange).cloned()
    }

    pub fn find_by_token(&self, token: &str, exchange: Option<Exchange>) -> Option<Instrument> {
        self.snapshot().find_by_token(token, exchange).cloned()
    }

    pub fn find_by_broker_symbol(
        &self,
        broker_symbol: &str,
        exchange: Option<Exchange>,
    ) -> Option<Instrument> {
        self.snapshot()
            .find_by_broker_symbol(broker_symbol, exchange)
            .cloned()
    }

    pub fn search(&self, query: &str, exchange: Option<Exchange>, limit: usize) -> Vec<Instrument> {
        self.snapshot().search(query, exchange, limit)
    }

    pub fn count(&self) -> usize {
        self.snapshot().count()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Instrument builders shared by store/resolver/refresh tests

    use crate::model::{Exchange, Instrument, InstrumentType};

    pub fn equity(symbol: &str, exchange: Exchange, token: &str) -> Instrument {
        Instrument {
            symbol: symbol.to_string(),
            broker_symbol: format!("{}:{}-EQ", exchange.broker_exchange(), symbol),
            name: Some(format!("{} LTD", symbol)),
            exchange,
            broker_exchange: exchange.broker_exchange().to_string(),
            token: token.to_string(),
            expiry: None,
            strike: None,
            lot_size: 1,
            instrument_type: InstrumentType::Equity,
            tick_size: 0.05,
        }
    }

    pub fn index(symbol: &str, exchange: Exchange, token: &str, broker_symbol: &str) -> Instrument {
        Instrument {
            symbol: symbol.to_string(),
            broker_symbol: broker_symbol.to_string(),
            name: Some(symbol.to_string()),
            exchange,
            broker_exchange: exchange.broker_exchange().to_string(),
            token: token.to_string(),
            expiry: None,
            strike: None,
            lot_size: 1,
            instrument_type: InstrumentType::Index,
            tick_size: 0.05,
        }
    }
}
