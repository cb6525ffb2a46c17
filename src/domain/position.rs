//! Open position and closed trade records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::signal::SignalReason;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub entry_price: f64,
    pub quantity: f64,
    pub highest_price_since_entry: f64,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    /// Fresh position: the peak starts at the entry price.
    pub fn open(price: f64, quantity: f64, opened_at: DateTime<Utc>) -> Self {
        Position {
            entry_price: price,
            quantity,
            highest_price_since_entry: price,
            opened_at,
        }
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity * (price - self.entry_price)
    }

    /// Fractional gain from the (weighted) entry price.
    pub fn gain_from_entry(&self, price: f64) -> f64 {
        (price - self.entry_price) / self.entry_price
    }

    /// Fractional retracement from the running peak.
    pub fn drop_from_peak(&self, price: f64) -> f64 {
        (self.highest_price_since_entry - price) / self.highest_price_since_entry
    }

    /// Adds to the position at `price`.
    ///
    /// Entry becomes the quantity-weighted average of old and new fills; the
    /// peak is kept (raised if `price` is a new high) and `opened_at` is
    /// unchanged.
    pub fn extend(&mut self, price: f64, added_quantity: f64) {
        let new_quantity = self.quantity + added_quantity;
        if new_quantity > 0.0 {
            self.entry_price =
                (self.entry_price * self.quantity + price * added_quantity) / new_quantity;
        } else {
            self.entry_price = price;
        }
        self.quantity = new_quantity;
        self.highest_price_since_entry = self.highest_price_since_entry.max(price);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    /// Net of commissions paid on every fill of the round trip.
    pub pnl: f64,
    pub exit_reason: SignalReason,
}

impl ClosedTrade {
    pub fn return_pct(&self) -> f64 {
        (self.exit_price - self.entry_price) / self.entry_price
    }
}
