//! CSV file bar adapter.
//!
//! Reads `<base_path>/<SYMBOL>.csv`. Columns are found by header name:
//! timestamp from `timestamp`, `datetime` or `date`; price from `close` or
//! `price`. Other columns are ignored.

use crate::domain::bar::Bar;
use crate::domain::error::AlloctraderError;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

const TIMESTAMP_COLUMNS: &[&str] = &["timestamp", "datetime", "date"];
const PRICE_COLUMNS: &[&str] = &["close", "price"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

/// Parses RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or a bare
/// date (midnight). Naive values are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.contains(&h.trim().to_lowercase().as_str()))
}

/// Reads bars from any CSV file, sorted by timestamp. Duplicate timestamps
/// are rejected; prices are not validated here.
pub fn read_bars(
    path: &Path,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<Bar>, AlloctraderError> {
    let content = fs::read_to_string(path).map_err(|e| AlloctraderError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| AlloctraderError::Data {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?
        .clone();

    let ts_col = find_column(&headers, TIMESTAMP_COLUMNS).ok_or_else(|| AlloctraderError::Data {
        reason: format!("{}: missing timestamp column", path.display()),
    })?;
    let price_col = find_column(&headers, PRICE_COLUMNS).ok_or_else(|| AlloctraderError::Data {
        reason: format!("{}: missing close/price column", path.display()),
    })?;

    let mut bars = Vec::new();

    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| AlloctraderError::Data {
            reason: format!("CSV parse error: {}", e),
        })?;

        let ts_str = record.get(ts_col).unwrap_or_default();
        let timestamp = parse_timestamp(ts_str).ok_or_else(|| AlloctraderError::Data {
            reason: format!("row {}: invalid timestamp {:?}", line + 1, ts_str),
        })?;

        let date = timestamp.date_naive();
        if start.is_some_and(|s| date < s) || end.is_some_and(|e| date > e) {
            continue;
        }

        let price: f64 = record
            .get(price_col)
            .unwrap_or_default()
            .trim()
            .parse()
            .map_err(|e| AlloctraderError::Data {
                reason: format!("row {}: invalid price: {}", line + 1, e),
            })?;

        bars.push(Bar::new(timestamp, price));
    }

    bars.sort_by_key(|b| b.timestamp);

    if let Some(w) = bars.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
        return Err(AlloctraderError::Data {
            reason: format!(
                "{}: duplicate timestamp {}",
                path.display(),
                w[0].timestamp
            ),
        });
    }

    Ok(bars)
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, AlloctraderError> {
        read_bars(&self.csv_path(symbol), start, end)
    }

    fn list_symbols(&self) -> Result<Vec<String>, AlloctraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| AlloctraderError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| AlloctraderError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
