//! Target-allocation sizing.

use super::bar::validate_price;
use super::error::AlloctraderError;

/// Quantity to buy so the position reaches `target_allocation_pct` of the
/// portfolio. Zero when already at or above target, or when the notional to
/// add is below `min_notional`.
pub fn size_buy(
    portfolio_value: f64,
    current_position_value: f64,
    current_price: f64,
    target_allocation_pct: f64,
    min_notional: f64,
) -> Result<f64, AlloctraderError> {
    validate_price(current_price)?;

    let target_value = portfolio_value * target_allocation_pct;
    let add_value = (target_value - current_position_value).max(0.0);

    if add_value < min_notional || add_value <= 0.0 {
        return Ok(0.0);
    }

    Ok(add_value / current_price)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocationSizer {
    pub target_allocation_pct: f64,
    pub min_notional: f64,
}

impl AllocationSizer {
    pub fn new(target_allocation_pct: f64, min_notional: f64) -> Self {
        AllocationSizer {
            target_allocation_pct,
            min_notional,
        }
    }

    pub fn size_buy(
        &self,
        portfolio_value: f64,
        current_position_value: f64,
        current_price: f64,
    ) -> Result<f64, AlloctraderError> {
        size_buy(
            portfolio_value,
            current_position_value,
            current_price,
            self.target_allocation_pct,
            self.min_notional,
        )
    }

    pub fn below_target(&self, portfolio_value: f64, current_position_value: f64) -> bool {
        current_position_value < portfolio_value * self.target_allocation_pct
    }
}
