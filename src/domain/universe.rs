//! Symbol universe for multi-symbol backtests.
//!
//! Parses symbol lists from configuration and drops symbols whose bar data
//! is missing or unreadable, so one bad file does not abort the whole run.

use crate::domain::bar::Bar;
use crate::domain::error::AlloctraderError;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),

    #[error("no symbols configured")]
    Empty,
}

impl From<UniverseError> for AlloctraderError {
    fn from(err: UniverseError) -> Self {
        AlloctraderError::invalid_config("symbols", err.to_string())
    }
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    if input.trim().is_empty() {
        return Err(UniverseError::Empty);
    }

    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    FetchFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct LoadedUniverse {
    pub series: Vec<(String, Vec<Bar>)>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Fetches bars for every symbol, skipping the ones that fail.
///
/// Errors only when no symbol has usable data.
pub fn load_universe(
    data_port: &dyn DataPort,
    symbols: &[String],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<LoadedUniverse, AlloctraderError> {
    let mut series = Vec::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        match data_port.fetch_bars(symbol, start, end) {
            Ok(bars) if bars.is_empty() => skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::NoData,
            }),
            Ok(bars) => series.push((symbol.clone(), bars)),
            Err(e) => skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::FetchFailed(e.to_string()),
            }),
        }
    }

    if series.is_empty() {
        return Err(AlloctraderError::Data {
            reason: format!("no usable data for any of {} symbols", symbols.len()),
        });
    }

    Ok(LoadedUniverse { series, skipped })
}
