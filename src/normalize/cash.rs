//! Cash + index shape (NSE_CM, BSE_CM)
//!
//! Both cash feeds mix equity and index rows under one coarse exchange; the
//! coded instrument type decides which canonical segment a row lands in.
//! Rows with codes outside the mapping are dropped.

use super::{normalize_lines, NormalizedFeed, COL_DETAILS, COL_LOT_SIZE, COL_TICKER,
    COL_TICK_SIZE, COL_TOKEN, COL_TYPE_CODE, COL_UNDERLYING};
use crate::feeds::FeedId;
use crate::model::{Exchange, Instrument, InstrumentType};

/// Per-feed coded-type mapping
struct CashMapping {
    equity_codes: &'static [i64],
    index_code: i64,
    equity_segment: Exchange,
    index_segment: Exchange,
}

fn mapping(feed: FeedId) -> CashMapping {
    match feed {
        FeedId::NseCm => CashMapping {
            equity_codes: &[0, 9],
            index_code: 10,
            equity_segment: Exchange::Nse,
            index_segment: Exchange::NseIndex,
        },
        FeedId::BseCm => CashMapping {
            equity_codes: &[0, 4, 50],
            index_code: 10,
            equity_segment: Exchange::Bse,
            index_segment: Exchange::BseIndex,
        },
        other => unreachable!("not a cash feed: {}", other),
    }
}

pub fn normalize(feed: FeedId, text: &str) -> NormalizedFeed {
    let mapping = mapping(feed);

    normalize_lines(text, |fields| {
        let code = fields[COL_TYPE_CODE].trim().parse::<i64>().ok()?;

        let (exchange, instrument_type) = if mapping.equity_codes.contains(&code) {
            (mapping.equity_segment, InstrumentType::Equity)
        } else if code == mapping.index_code {
            (mapping.index_segment, InstrumentType::Index)
        } else {
            return None;
        };

        let symbol = fields[COL_UNDERLYING].trim();
        let token = fields[COL_TOKEN].trim();
        let broker_symbol = fields[COL_TICKER].trim();
        if symbol.is_empty() || token.is_empty() || broker_symbol.is_empty() {
            return None;
        }

        let name = fields[COL_DETAILS].trim();

        Some(Instrument {
            symbol: symbol.to_string(),
            broker_symbol: broker_symbol.to_string(),
            name: (!name.is_empty()).then(|| name.to_string()),
            exchange,
            broker_exchange: exchange.broker_exchange().to_string(),
            token: token.to_string(),
            expiry: None,
            strike: None,
            lot_size: fields[COL_LOT_SIZE].trim().parse().unwrap_or(0),
            instrument_type,
            tick_size: fields[COL_TICK_SIZE].trim().parse().unwrap_or(0.0),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::test_rows::cash_row;

    #[test]
    fn test_nse_equity_and_index_segments() {
        let text = [
            cash_row("1010", "0", "NSE:RELIANCE-EQ", "RELIANCE"),
            cash_row("1011", "9", "NSE:SGBMAY29-SG", "SGBMAY29"),
            cash_row("1012", "10", "NSE:NIFTY50-INDEX", "NIFTY 50"),
        ]
        .join("\n");

        let out = normalize(FeedId::NseCm, &text);
        assert_eq!(out.instruments.len(), 3);
        assert_eq!(out.skipped_rows, 0);

        let reliance = &out.instruments[0];
        assert_eq!(reliance.exchange, Exchange::Nse);
        assert_eq!(reliance.instrument_type, InstrumentType::Equity);
        assert_eq!(reliance.broker_exchange, "NSE");
        assert_eq!(reliance.expiry, None);

        let nifty = &out.instruments[2];
        assert_eq!(nifty.symbol, "NIFTY 50");
        assert_eq!(nifty.exchange, Exchange::NseIndex);
        assert_eq!(nifty.instrument_type, InstrumentType::Index);
        // Index segment still maps to the broker's coarse NSE code
        assert_eq!(nifty.broker_exchange, "NSE");
    }

    #[test]
    fn test_bse_codes() {
        let text = [
            cash_row("2010", "0", "BSE:TCS-A", "TCS"),
            cash_row("2011", "4", "BSE:SOMEFUND-F", "SOMEFUND"),
            cash_row("2012", "50", "BSE:SOMETP-T", "SOMETP"),
            cash_row("2013", "10", "BSE:SENSEX-INDEX", "SENSEX"),
        ]
        .join("\n");

        let out = normalize(FeedId::BseCm, &text);
        assert_eq!(out.instruments.len(), 4);
        assert_eq!(out.instruments[3].exchange, Exchange::BseIndex);
        assert!(out.instruments[..3]
            .iter()
            .all(|i| i.exchange == Exchange::Bse));
    }

    #[test]
    fn test_unmapped_codes_dropped() {
        let text = [
            cash_row("1010", "0", "NSE:RELIANCE-EQ", "RELIANCE"),
            cash_row("1013", "7", "NSE:SOMETHING", "SOMETHING"),
        ]
        .join("\n");

        let out = normalize(FeedId::NseCm, &text);
        assert_eq!(out.instruments.len(), 1);
        assert_eq!(out.skipped_rows, 1);
    }

    #[test]
    fn test_short_rows_counted() {
        let out = normalize(FeedId::NseCm, "only,three,cols\n");
        assert!(out.instruments.is_empty());
        assert_eq!(out.skipped_rows, 1);
    }
}
