//! Canonical instrument model
//!
//! One record shape for every exchange feed. Feeds carry their own column
//! layouts and coded fields; the normalizers map them into this type and
//! drop everything else.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical exchange segment.
///
/// Cash and index are distinct segments of one physical market: the broker
/// codes both under the same coarse exchange, the catalog keeps them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Exchange {
    Nse,
    NseIndex,
    Bse,
    BseIndex,
    Nfo,
    Cds,
    Bfo,
    Mcx,
}

impl Exchange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Nse => "NSE",
            Exchange::NseIndex => "NSE_INDEX",
            Exchange::Bse => "BSE",
            Exchange::BseIndex => "BSE_INDEX",
            Exchange::Nfo => "NFO",
            Exchange::Cds => "CDS",
            Exchange::Bfo => "BFO",
            Exchange::Mcx => "MCX",
        }
    }

    /// The broker's coarser exchange code for this segment.
    pub fn broker_exchange(&self) -> &'static str {
        match self {
            Exchange::Nse | Exchange::NseIndex => "NSE",
            Exchange::Bse | Exchange::BseIndex => "BSE",
            Exchange::Nfo => "NFO",
            Exchange::Cds => "CDS",
            Exchange::Bfo => "BFO",
            Exchange::Mcx => "MCX",
        }
    }

    /// Paired index segment for a cash-equity segment.
    ///
    /// Benchmark indices are sometimes requested under the equity code; the
    /// resolver retries lookups against this segment.
    pub fn index_segment(&self) -> Option<Exchange> {
        match self {
            Exchange::Nse => Some(Exchange::NseIndex),
            Exchange::Bse => Some(Exchange::BseIndex),
            _ => None,
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "NSE" => Ok(Exchange::Nse),
            "NSE_INDEX" => Ok(Exchange::NseIndex),
            "BSE" => Ok(Exchange::Bse),
            "BSE_INDEX" => Ok(Exchange::BseIndex),
            "NFO" => Ok(Exchange::Nfo),
            "CDS" => Ok(Exchange::Cds),
            "BFO" => Ok(Exchange::Bfo),
            "MCX" => Ok(Exchange::Mcx),
            other => Err(format!("unknown exchange segment: {}", other)),
        }
    }
}

/// Canonical instrument type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentType {
    Equity,
    Index,
    Future,
    CallOption,
    PutOption,
}

impl InstrumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentType::Equity => "EQ",
            InstrumentType::Index => "INDEX",
            InstrumentType::Future => "FUT",
            InstrumentType::CallOption => "CE",
            InstrumentType::PutOption => "PE",
        }
    }

    pub fn is_option(&self) -> bool {
        matches!(self, InstrumentType::CallOption | InstrumentType::PutOption)
    }
}

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstrumentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "EQ" => Ok(InstrumentType::Equity),
            "INDEX" => Ok(InstrumentType::Index),
            "FUT" => Ok(InstrumentType::Future),
            "CE" => Ok(InstrumentType::CallOption),
            "PE" => Ok(InstrumentType::PutOption),
            other => Err(format!("unknown instrument type: {}", other)),
        }
    }
}

/// One canonical catalog record.
///
/// `(symbol, exchange)` is unique within a generation; `token` is unique
/// within its exchange. `expiry` is `DD-MON-YY` uppercase and present only on
/// derivatives; `strike` only on options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub broker_symbol: String,
    pub name: Option<String>,
    pub exchange: Exchange,
    pub broker_exchange: String,
    pub token: String,
    pub expiry: Option<String>,
    pub strike: Option<f64>,
    pub lot_size: i32,
    pub instrument_type: InstrumentType,
    pub tick_size: f64,
}
