//! Equity-derivatives shape (NSE_FO, BSE_FO)
//!
//! Every row is a future or an option; the canonical symbol is reconstructed
//! from the packed descriptive field. BSE future rows sometimes leave the
//! option-type column blank instead of the `XX` sentinel.

use super::{derivative_row, normalize_lines, NormalizedFeed};
use crate::feeds::FeedId;
use crate::model::Exchange;

pub fn normalize(feed: FeedId, text: &str) -> NormalizedFeed {
    let (exchange, blank_is_future) = match feed {
        FeedId::NseFo => (Exchange::Nfo, false),
        FeedId::BseFo => (Exchange::Bfo, true),
        other => unreachable!("not an equity-derivative feed: {}", other),
    };

    normalize_lines(text, |fields| derivative_row(fields, exchange, blank_is_future))
}
