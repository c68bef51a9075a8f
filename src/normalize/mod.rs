//! Row normalizers
//!
//! Four shapes cover the six feeds: cash+index (NSE_CM, BSE_CM), equity
//! derivatives (NSE_FO, BSE_FO), currency derivatives (NSE_CD) and commodity
//! (MCX_COM). Each maps the feed's fixed column order and coded fields into
//! canonical [`Instrument`] records and drops every source-specific column.
//!
//! Row-level failures degrade, never abort: a malformed descriptive field
//! keeps its raw string as the symbol, a short row is skipped and counted.
//! One bad row must not fail the whole batch.

pub mod cash;
pub mod commodity;
pub mod currency;
pub mod derivatives;

use crate::feeds::FeedId;
use crate::model::{Exchange, Instrument, InstrumentType};

// Column indices of the headerless 21-column feed layout.
const COL_TOKEN: usize = 0;
const COL_DETAILS: usize = 1;
const COL_TYPE_CODE: usize = 2;
const COL_LOT_SIZE: usize = 3;
const COL_TICK_SIZE: usize = 4;
const COL_EXPIRY_EPOCH: usize = 8;
const COL_TICKER: usize = 9;
const COL_UNDERLYING: usize = 13;
const COL_STRIKE: usize = 15;
const COL_OPTION_TYPE: usize = 16;

/// Columns a row must carry to be normalized at all
const MIN_COLUMNS: usize = 17;

/// Output of one feed's normalization pass
#[derive(Debug, Default)]
pub struct NormalizedFeed {
    pub instruments: Vec<Instrument>,
    pub skipped_rows: usize,
}

/// Normalize one feed's raw text into canonical instruments
pub fn normalize_feed(feed: FeedId, text: &str) -> NormalizedFeed {
    match feed {
        FeedId::NseCm | FeedId::BseCm => cash::normalize(feed, text),
        FeedId::NseFo | FeedId::BseFo => derivatives::normalize(feed, text),
        FeedId::NseCd => currency::normalize(text),
        FeedId::McxCom => commodity::normalize(text),
    }
}

/// Derivative option-type code, decoded from the feed's `Option type` column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OptionCode {
    /// The feed's "no option" sentinel - the row is a future
    None,
    Call,
    Put,
}

impl OptionCode {
    /// `blank_is_future` covers the BSE derivatives quirk where future rows
    /// leave the column empty instead of the `XX` sentinel.
    fn decode(code: &str, blank_is_future: bool) -> Option<OptionCode> {
        match code.trim() {
            "XX" => Some(OptionCode::None),
            "CE" => Some(OptionCode::Call),
            "PE" => Some(OptionCode::Put),
            "" if blank_is_future => Some(OptionCode::None),
            _ => None,
        }
    }

    fn instrument_type(&self) -> InstrumentType {
        match self {
            OptionCode::None => InstrumentType::Future,
            OptionCode::Call => InstrumentType::CallOption,
            OptionCode::Put => InstrumentType::PutOption,
        }
    }
}

/// Split one raw line into its delimited fields, skipping rows too short to
/// carry the columns we read.
pub(crate) fn split_row(line: &str) -> Option<Vec<&str>> {
    if line.trim().is_empty() {
        return None;
    }
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < MIN_COLUMNS {
        return None;
    }
    Some(fields)
}

/// Epoch-seconds expiry column to normalized `DD-MON-YY` uppercase
pub(crate) fn format_expiry(epoch_field: &str) -> Option<String> {
    // Some feeds serialize the epoch as a float
    let secs = epoch_field.trim().parse::<f64>().ok()? as i64;
    let dt = chrono::DateTime::from_timestamp(secs, 0)?;
    Some(dt.format("%d-%b-%y").to_string().to_uppercase())
}

/// Reconstruct the canonical derivative symbol from the packed descriptive
/// field.
///
/// The field is whitespace-separated `underlying day-year month tail`,
/// reordered into `{underlying}{day-year}{MONTH}` with the tail kept for
/// futures and replaced by `CE`/`PE` for options. Any other token count
/// passes the raw string through unchanged rather than failing the batch.
pub(crate) fn reconstruct_symbol(details: &str, option: OptionCode) -> String {
    let parts: Vec<&str> = details.split_whitespace().collect();
    if parts.len() != 4 {
        return details.trim().to_string();
    }

    let base = format!("{}{}{}", parts[0], parts[1], parts[2].to_uppercase());
    match option {
        OptionCode::None => format!("{}{}", base, parts[3]),
        OptionCode::Call => format!("{}CE", base),
        OptionCode::Put => format!("{}PE", base),
    }
}

fn non_empty(field: &str) -> Option<String> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Normalize one derivative row. Shared by the equity-derivative, currency
/// and commodity shapes, which differ only in target segment and the
/// blank-option-code quirk.
pub(crate) fn derivative_row(
    fields: &[&str],
    exchange: Exchange,
    blank_is_future: bool,
) -> Option<Instrument> {
    let option = OptionCode::decode(fields[COL_OPTION_TYPE], blank_is_future)?;
    let instrument_type = option.instrument_type();

    let token = non_empty(fields[COL_TOKEN])?;
    let broker_symbol = non_empty(fields[COL_TICKER])?;
    let details = fields[COL_DETAILS].trim();
    let symbol = reconstruct_symbol(details, option);
    if symbol.is_empty() {
        return None;
    }

    let strike = if instrument_type.is_option() {
        fields[COL_STRIKE].trim().parse::<f64>().ok()
    } else {
        None
    };

    Some(Instrument {
        symbol,
        broker_symbol,
        name: non_empty(fields[COL_DETAILS]),
        exchange,
        broker_exchange: exchange.broker_exchange().to_string(),
        token,
        expiry: format_expiry(fields[COL_EXPIRY_EPOCH]),
        strike,
        lot_size: fields[COL_LOT_SIZE].trim().parse().unwrap_or(0),
        instrument_type,
        tick_size: fields[COL_TICK_SIZE].trim().parse().unwrap_or(0.0),
    })
}

/// Run a row normalizer over a feed's lines, counting rows it drops
pub(crate) fn normalize_lines<F>(text: &str, mut row_fn: F) -> NormalizedFeed
where
    F: FnMut(&[&str]) -> Option<Instrument>,
{
    let mut out = NormalizedFeed::default();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match split_row(line).as_deref().and_then(&mut row_fn) {
            Some(instrument) => out.instruments.push(instrument),
            None => out.skipped_rows += 1,
        }
    }

    out
}

#[cfg(test)]
pub(crate) mod test_rows {
    //! Row builders shared by the normalizer tests

    /// Build a 21-column feed row with the given populated fields
    pub fn row(fields: &[(usize, &str)]) -> String {
        let mut cols = vec![String::new(); 21];
        for (idx, value) in fields {
            cols[*idx] = (*value).to_string();
        }
        cols.join(",")
    }

    pub fn derivative_row(
        token: &str,
        details: &str,
        ticker: &str,
        expiry_epoch: &str,
        strike: &str,
        option_code: &str,
    ) -> String {
        row(&[
            (0, token),
            (1, details),
            (3, "50"),
            (4, "0.05"),
            (8, expiry_epoch),
            (9, ticker),
            (15, strike),
            (16, option_code),
        ])
    }

    pub fn cash_row(token: &str, type_code: &str, ticker: &str, underlying: &str) -> String {
        row(&[
            (0, token),
            (1, "SOME COMPANY LTD"),
            (2, type_code),
            (3, "1"),
            (4, "0.05"),
            (9, ticker),
            (13, underlying),
        ])
    }
}
