//! Price bar and the month key derived from its timestamp.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::error::AlloctraderError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl Bar {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Bar { timestamp, price }
    }

    /// Calendar month this bar belongs to (UTC).
    pub fn month_key(&self) -> MonthKey {
        MonthKey::of(&self.timestamp)
    }

    /// Rejects prices that are not strictly positive and finite.
    pub fn validate(&self) -> Result<(), AlloctraderError> {
        validate_price(self.price)
    }
}

pub fn validate_price(price: f64) -> Result<(), AlloctraderError> {
    if price.is_finite() && price > 0.0 {
        Ok(())
    } else {
        Err(AlloctraderError::InvalidPrice { price })
    }
}

/// (year, month) pair. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        MonthKey { year, month }
    }

    pub fn of(timestamp: &DateTime<Utc>) -> Self {
        MonthKey {
            year: timestamp.year(),
            month: timestamp.month(),
        }
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn month_key_from_timestamp() {
        let bar = Bar::new(ts(2024, 1, 31, 23), 100.0);
        assert_eq!(bar.month_key(), MonthKey::new(2024, 1));
    }

    #[test]
    fn month_key_ordering_crosses_years() {
        assert!(MonthKey::new(2023, 12) < MonthKey::new(2024, 1));
        assert!(MonthKey::new(2024, 2) > MonthKey::new(2024, 1));
    }

    #[test]
    fn month_key_display() {
        assert_eq!(MonthKey::new(2024, 3).to_string(), "2024-03");
    }

    #[test]
    fn validate_rejects_non_positive_and_nan() {
        assert!(Bar::new(ts(2024, 1, 1, 0), 1.0).validate().is_ok());
        for price in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = Bar::new(ts(2024, 1, 1, 0), price).validate().unwrap_err();
            assert!(matches!(err, AlloctraderError::InvalidPrice { .. }));
        }
    }
}
