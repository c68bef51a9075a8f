//! Symbol resolution
//!
//! Maps the application's canonical trading symbols to the broker's native
//! identifiers and back. Every order, quote and streaming call goes through
//! here first, so misses are ordinary results (`None`), never errors; only
//! malformed input is rejected.

use crate::catalog::CatalogStore;
use crate::error::{AppError, Result};
use crate::model::Exchange;
use std::sync::Arc;

/// Known-correct broker symbols for benchmark indices whose feed-derived
/// spelling is unreliable or absent. Exact literal symbol + exchange only.
const INDEX_OVERRIDES: &[(&str, Exchange, &str)] = &[
    ("NIFTY 50", Exchange::Nse, "NSE:NIFTY50-INDEX"),
    ("SENSEX", Exchange::Bse, "BSE:SENSEX-INDEX"),
    ("BANKNIFTY", Exchange::Nse, "NSE:NIFTYBANK-INDEX"),
];

/// Resolves between canonical and broker-native identifiers over catalog
/// snapshots
pub struct Resolver {
    store: Arc<CatalogStore>,
}

impl Resolver {
    pub fn new(store: Arc<CatalogStore>) -> Self {
        Self { store }
    }

    /// Canonical symbol to broker symbol via the ordered fallback chain.
    ///
    /// First hit wins:
    /// 1. exact `(symbol, exchange)`;
    /// 2. the paired index segment, when `exchange` is a cash segment
    ///    (benchmark indices get requested under the equity code);
    /// 3. the static override table;
    /// 4. spelling variants against the same exchange: `-EQ`, `-INDEX`,
    ///    spaces-stripped `-INDEX`, trailing space (a known upstream quirk).
    pub fn resolve_broker_symbol(&self, symbol: &str, exchange: Exchange) -> Result<Option<String>> {
        if symbol.trim().is_empty() {
            return Err(AppError::Validation("symbol must not be empty".to_string()));
        }

        let snapshot = self.store.snapshot();

        if let Some(instrument) = snapshot.find(symbol, exchange) {
            return Ok(Some(instrument.broker_symbol.clone()));
        }

        if let Some(index_segment) = exchange.index_segment() {
            if let Some(instrument) = snapshot.find(symbol, index_segment) {
                return Ok(Some(instrument.broker_symbol.clone()));
            }
        }

        for (override_symbol, override_exchange, broker_symbol) in INDEX_OVERRIDES {
            if *override_symbol == symbol && *override_exchange == exchange {
                return Ok(Some((*broker_symbol).to_string()));
            }
        }

        let variants = [
            format!("{}-EQ", symbol),
            format!("{}-INDEX", symbol),
            format!("{}-INDEX", symbol.replace(' ', "")),
            format!("{} ", symbol),
        ];
        for variant in &variants {
            if let Some(instrument) = snapshot.find(variant, exchange) {
                return Ok(Some(instrument.broker_symbol.clone()));
            }
        }

        tracing::debug!("No broker symbol for {} on {}", symbol, exchange);
        Ok(None)
    }

    /// Broker-native identifier (token or broker symbol) back to the
    /// canonical symbol, optionally scoped to an exchange segment.
    pub fn resolve_canonical_symbol(
        &self,
        identifier: &str,
        exchange: Option<Exchange>,
    ) -> Result<Option<String>> {
        if identifier.trim().is_empty() {
            return Err(AppError::Validation(
                "identifier must not be empty".to_string(),
            ));
        }

        let snapshot = self.store.snapshot();

        if let Some(instrument) = snapshot.find_by_token(identifier, exchange) {
            return Ok(Some(instrument.symbol.clone()));
        }

        if let Some(instrument) = snapshot.find_by_broker_symbol(identifier, exchange) {
            return Ok(Some(instrument.symbol.clone()));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::{equity, index};
    use crate::catalog::CatalogDb;
    use crate::model::Instrument;

    fn resolver_with(instruments: Vec<Instrument>) -> Resolver {
        let store =
            Arc::new(CatalogStore::new(Arc::new(CatalogDb::open_in_memory().unwrap())).unwrap());
        store.replace_all(instruments).unwrap();
        Resolver::new(store)
    }

    #[test]
    fn test_exact_match_wins() {
        let resolver = resolver_with(vec![equity("SBIN", Exchange::Nse, "1010")]);
        assert_eq!(
            resolver.resolve_broker_symbol("SBIN", Exchange::Nse).unwrap(),
            Some("NSE:SBIN-EQ".to_string())
        );
    }

    #[test]
    fn test_index_segment_retry() {
        // Index row only exists in the paired index segment; request comes in
        // under the cash-equity code
        let resolver = resolver_with(vec![index(
            "INDIA VIX",
            Exchange::NseIndex,
            "5010",
            "NSE:INDIAVIX-INDEX",
        )]);
        assert_eq!(
            resolver
                .resolve_broker_symbol("INDIA VIX", Exchange::Nse)
                .unwrap(),
            Some("NSE:INDIAVIX-INDEX".to_string())
        );
    }

    #[test]
    fn test_index_retry_beats_override() {
        // Feed row exists for NIFTY 50 - chain must hit it before the static
        // override table
        let resolver = resolver_with(vec![index(
            "NIFTY 50",
            Exchange::NseIndex,
            "5011",
            "NSE:NIFTY50-INDEX.FEED",
        )]);
        assert_eq!(
            resolver
                .resolve_broker_symbol("NIFTY 50", Exchange::Nse)
                .unwrap(),
            Some("NSE:NIFTY50-INDEX.FEED".to_string())
        );
    }

    #[test]
    fn test_override_table_with_empty_catalog() {
        let resolver = resolver_with(vec![]);
        assert_eq!(
            resolver
                .resolve_broker_symbol("NIFTY 50", Exchange::Nse)
                .unwrap(),
            Some("NSE:NIFTY50-INDEX".to_string())
        );
        assert_eq!(
            resolver
                .resolve_broker_symbol("SENSEX", Exchange::Bse)
                .unwrap(),
            Some("BSE:SENSEX-INDEX".to_string())
        );
        assert_eq!(
            resolver
                .resolve_broker_symbol("BANKNIFTY", Exchange::Nse)
                .unwrap(),
            Some("NSE:NIFTYBANK-INDEX".to_string())
        );
        // Overrides are exact literals - wrong exchange stays a miss
        assert_eq!(
            resolver
                .resolve_broker_symbol("SENSEX", Exchange::Nse)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_eq_suffix_variant() {
        // Catalog only carries the -EQ spelling; step 4 fires after steps 1-3 miss
        let resolver = resolver_with(vec![equity("RELIANCE-EQ", Exchange::Nse, "1020")]);
        assert_eq!(
            resolver
                .resolve_broker_symbol("RELIANCE", Exchange::Nse)
                .unwrap(),
            Some("NSE:RELIANCE-EQ-EQ".to_string())
        );
    }

    #[test]
    fn test_spaces_stripped_index_variant() {
        let resolver = resolver_with(vec![index(
            "MIDCPNIFTY-INDEX",
            Exchange::Nse,
            "5012",
            "NSE:MIDCPNIFTY-INDEX",
        )]);
        assert_eq!(
            resolver
                .resolve_broker_symbol("MIDCP NIFTY", Exchange::Nse)
                .unwrap(),
            Some("NSE:MIDCPNIFTY-INDEX".to_string())
        );
    }

    #[test]
    fn test_trailing_space_variant() {
        let resolver = resolver_with(vec![equity("M&M ", Exchange::Nse, "1030")]);
        assert_eq!(
            resolver.resolve_broker_symbol("M&M", Exchange::Nse).unwrap(),
            Some("NSE:M&M -EQ".to_string())
        );
    }

    #[test]
    fn test_miss_is_none_not_error() {
        let resolver = resolver_with(vec![]);
        assert_eq!(
            resolver
                .resolve_broker_symbol("UNKNOWN", Exchange::Mcx)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_blank_input_rejected() {
        let resolver = resolver_with(vec![]);
        assert!(matches!(
            resolver.resolve_broker_symbol("  ", Exchange::Nse),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            resolver.resolve_canonical_symbol("", None),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_reverse_by_token_then_broker_symbol() {
        let resolver = resolver_with(vec![equity("SBIN", Exchange::Nse, "1010")]);

        assert_eq!(
            resolver
                .resolve_canonical_symbol("1010", Some(Exchange::Nse))
                .unwrap(),
            Some("SBIN".to_string())
        );
        assert_eq!(
            resolver
                .resolve_canonical_symbol("NSE:SBIN-EQ", None)
                .unwrap(),
            Some("SBIN".to_string())
        );
        assert_eq!(
            resolver
                .resolve_canonical_symbol("1010", Some(Exchange::Bse))
                .unwrap(),
            None
        );
    }
}
