//! Strategy parameters for the allocation engine.

use serde::{Deserialize, Serialize};

pub const DEFAULT_EMA_LONG_PERIOD: usize = 200;
pub const DEFAULT_TARGET_ALLOCATION_PCT: f64 = 0.55;
pub const DEFAULT_MIN_NOTIONAL: f64 = 10.0;
pub const DEFAULT_HARD_STOP_LOSS_PCT: f64 = 0.45;
pub const DEFAULT_TRAILING_STOP_PCT: f64 = 0.40;
pub const DEFAULT_TREND_FLOOR_PCT: f64 = 0.70;
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    pub ema_long_period: usize,
    pub target_allocation_pct: f64,
    pub min_notional: f64,
    pub hard_stop_loss_pct: f64,
    pub trailing_stop_pct: f64,
    pub trend_floor_pct: f64,
    pub enable_monthly_rebalance: bool,
    pub history_capacity: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            name: "Adaptive Allocation Trend".to_string(),
            ema_long_period: DEFAULT_EMA_LONG_PERIOD,
            target_allocation_pct: DEFAULT_TARGET_ALLOCATION_PCT,
            min_notional: DEFAULT_MIN_NOTIONAL,
            hard_stop_loss_pct: DEFAULT_HARD_STOP_LOSS_PCT,
            trailing_stop_pct: DEFAULT_TRAILING_STOP_PCT,
            trend_floor_pct: DEFAULT_TREND_FLOOR_PCT,
            enable_monthly_rebalance: true,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}
