//! Single-asset portfolio state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::Position;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub cash: f64,
    pub position: Option<Position>,
}

impl PortfolioState {
    pub fn new(cash: f64) -> Self {
        PortfolioState {
            cash,
            position: None,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    pub fn quantity(&self) -> f64 {
        self.position.as_ref().map_or(0.0, |p| p.quantity)
    }

    pub fn position_value(&self, price: f64) -> f64 {
        self.position.as_ref().map_or(0.0, |p| p.market_value(price))
    }

    /// cash + quantity * price
    pub fn total_value(&self, price: f64) -> f64 {
        self.cash + self.position_value(price)
    }

    /// Fraction of total value held in the asset.
    pub fn allocation(&self, price: f64) -> f64 {
        let total = self.total_value(price);
        if total > 0.0 {
            self.position_value(price) / total
        } else {
            0.0
        }
    }

    /// Buys `quantity` at `price`, opening a fresh position when flat and
    /// extending the current one otherwise. Returns the notional spent.
    pub fn apply_buy(&mut self, price: f64, quantity: f64, at: DateTime<Utc>) -> f64 {
        let notional = price * quantity;
        self.cash -= notional;
        match self.position.as_mut() {
            Some(pos) => pos.extend(price, quantity),
            None => self.position = Some(Position::open(price, quantity, at)),
        }
        notional
    }

    /// Sells the full position at `price`. Returns the closed position and
    /// the proceeds, or `None` when already flat.
    pub fn close_position(&mut self, price: f64) -> Option<(Position, f64)> {
        let pos = self.position.take()?;
        let proceeds = pos.market_value(price);
        self.cash += proceeds;
        Some((pos, proceeds))
    }

    pub fn debit_fee(&mut self, fee: f64) {
        self.cash -= fee;
    }
}
