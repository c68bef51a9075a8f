//! Currency-derivatives shape (NSE_CD)

use super::{derivative_row, normalize_lines, NormalizedFeed};
use crate::model::Exchange;

pub fn normalize(text: &str) -> NormalizedFeed {
    normalize_lines(text, |fields| derivative_row(fields, Exchange::Cds, false))
}
