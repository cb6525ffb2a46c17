//! Catastrophic risk exits for an open position.
//!
//! The peak is raised before any check on the same bar, so a bar that sets a
//! new high can never trip the trailing stop by itself. Hard stop is checked
//! before the trailing stop; both exit the full position.

use super::position::Position;
use super::signal::SignalReason;

/// Returns `position` with the peak raised to `current_price` if higher.
pub fn update_peak(position: &Position, current_price: f64) -> Position {
    let mut updated = position.clone();
    raise_peak(&mut updated, current_price);
    updated
}

pub(crate) fn raise_peak(position: &mut Position, current_price: f64) {
    if current_price > position.highest_price_since_entry {
        position.highest_price_since_entry = current_price;
    }
}

/// First exit condition that holds, in fixed order: hard stop, trailing stop.
pub fn check_exit(
    position: &Position,
    current_price: f64,
    hard_stop_pct: f64,
    trailing_stop_pct: f64,
) -> Option<SignalReason> {
    if position.entry_price <= 0.0 {
        return None;
    }

    if position.gain_from_entry(current_price) <= -hard_stop_pct {
        return Some(SignalReason::HardStop);
    }

    if position.highest_price_since_entry > 0.0
        && position.drop_from_peak(current_price) >= trailing_stop_pct
    {
        return Some(SignalReason::TrailingStop);
    }

    None
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskMonitor {
    pub hard_stop_pct: f64,
    pub trailing_stop_pct: f64,
}

impl RiskMonitor {
    pub fn new(hard_stop_pct: f64, trailing_stop_pct: f64) -> Self {
        RiskMonitor {
            hard_stop_pct,
            trailing_stop_pct,
        }
    }

    pub fn check_exit(&self, position: &Position, current_price: f64) -> Option<SignalReason> {
        check_exit(
            position,
            current_price,
            self.hard_stop_pct,
            self.trailing_stop_pct,
        )
    }

    pub fn is_exit(&self, position: &Position, current_price: f64) -> bool {
        self.check_exit(position, current_price).is_some()
    }

    /// Raises the peak, then evaluates exits against the updated position.
    pub fn observe(&self, position: &mut Position, current_price: f64) -> Option<SignalReason> {
        raise_peak(position, current_price);
        self.check_exit(position, current_price)
    }
}
