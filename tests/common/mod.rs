#![allow(dead_code)]

use alloctrader::domain::bar::Bar;
use alloctrader::domain::error::AlloctraderError;
use alloctrader::domain::strategy::StrategyConfig;
use alloctrader::ports::data_port::DataPort;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, AlloctraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(AlloctraderError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| {
                        let d = b.timestamp.date_naive();
                        start.is_none_or(|s| d >= s) && end.is_none_or(|e| d <= e)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, AlloctraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn bar(y: i32, m: u32, d: u32, h: u32, price: f64) -> Bar {
    Bar::new(ts(y, m, d, h), price)
}

/// Consecutive hourly bars starting at `start`, one per price.
pub fn hourly_bars(start: DateTime<Utc>, prices: &[f64]) -> Vec<Bar> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| Bar::new(start + Duration::hours(i as i64), p))
        .collect()
}

/// Constant-price hourly bars covering `[start, end)`.
pub fn flat_hourly(start: DateTime<Utc>, end: DateTime<Utc>, price: f64) -> Vec<Bar> {
    let hours = (end - start).num_hours().max(0) as usize;
    hourly_bars(start, &vec![price; hours])
}

/// Daily midnight bars for every day of `month`.
pub fn daily_bars(year: i32, month: u32, days: u32, price: f64) -> Vec<Bar> {
    (1..=days).map(|d| bar(year, month, d, 0, price)).collect()
}

/// Default strategy with the monthly rebalance switched off.
pub fn no_rebalance() -> StrategyConfig {
    StrategyConfig {
        enable_monthly_rebalance: false,
        ..StrategyConfig::default()
    }
}
