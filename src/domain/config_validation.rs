//! Configuration validation.
//!
//! Every parameter is range-checked before an engine or backtest is built;
//! anything out of range is an `InvalidConfiguration` error at startup.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::AlloctraderError;
use crate::domain::strategy::StrategyConfig;

pub fn validate_strategy_config(config: &StrategyConfig) -> Result<(), AlloctraderError> {
    validate_ema_period(config)?;
    validate_target_allocation(config)?;
    validate_min_notional(config)?;
    validate_open_fraction("hard_stop_loss_pct", config.hard_stop_loss_pct)?;
    validate_open_fraction("trailing_stop_pct", config.trailing_stop_pct)?;
    validate_open_fraction("trend_floor_pct", config.trend_floor_pct)?;
    validate_history_capacity(config)?;
    Ok(())
}

pub fn validate_backtest_config(config: &BacktestConfig) -> Result<(), AlloctraderError> {
    if !(config.initial_capital.is_finite() && config.initial_capital > 0.0) {
        return Err(AlloctraderError::invalid_config(
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    if !(config.commission_pct.is_finite() && (0.0..1.0).contains(&config.commission_pct)) {
        return Err(AlloctraderError::invalid_config(
            "commission_pct",
            "commission_pct must be in [0, 1)",
        ));
    }
    if !(config.periods_per_year.is_finite() && config.periods_per_year > 0.0) {
        return Err(AlloctraderError::invalid_config(
            "periods_per_year",
            "periods_per_year must be positive",
        ));
    }
    if let (Some(start), Some(end)) = (config.start_date, config.end_date) {
        if start >= end {
            return Err(AlloctraderError::invalid_config(
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}

fn validate_ema_period(config: &StrategyConfig) -> Result<(), AlloctraderError> {
    if config.ema_long_period < 1 {
        return Err(AlloctraderError::invalid_config(
            "ema_long_period",
            "ema_long_period must be at least 1",
        ));
    }
    Ok(())
}

fn validate_target_allocation(config: &StrategyConfig) -> Result<(), AlloctraderError> {
    let value = config.target_allocation_pct;
    if !(value > 0.0 && value <= 1.0) {
        return Err(AlloctraderError::invalid_config(
            "target_allocation_pct",
            "target_allocation_pct must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_min_notional(config: &StrategyConfig) -> Result<(), AlloctraderError> {
    let value = config.min_notional;
    if !(value.is_finite() && value >= 0.0) {
        return Err(AlloctraderError::invalid_config(
            "min_notional",
            "min_notional must be non-negative",
        ));
    }
    Ok(())
}

/// Strictly between 0 and 1. NaN fails.
fn validate_open_fraction(key: &str, value: f64) -> Result<(), AlloctraderError> {
    if !(value > 0.0 && value < 1.0) {
        return Err(AlloctraderError::invalid_config(
            key,
            format!("{key} must be in (0, 1)"),
        ));
    }
    Ok(())
}

fn validate_history_capacity(config: &StrategyConfig) -> Result<(), AlloctraderError> {
    if config.history_capacity < config.ema_long_period {
        return Err(AlloctraderError::invalid_config(
            "history_capacity",
            format!(
                "history_capacity ({}) must be at least ema_long_period ({})",
                config.history_capacity, config.ema_long_period
            ),
        ));
    }
    Ok(())
}
