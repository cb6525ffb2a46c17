//! Per-bar decision engine.
//!
//! `SignalGenerator` holds only immutable configuration; every mutable piece
//! of strategy state lives in an [`EngineState`] owned by the caller, so
//! independent symbols or backtest runs never share anything.
//!
//! Precedence on each bar:
//! 1. risk exit (hard stop, then trailing stop)
//! 2. monthly rebalance exit
//! 3. trend-gated entry / top-up towards the target allocation
//! 4. hold
//!
//! At most one trade is emitted per bar. Fills are applied to the state at
//! the bar price without fees.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::bar::Bar;
use super::config_validation::validate_strategy_config;
use super::error::AlloctraderError;
use super::history::PriceHistory;
use super::portfolio::PortfolioState;
use super::rebalance::{MonthlyRebalancer, MonthlyState};
use super::risk::RiskMonitor;
use super::signal::{Signal, SignalReason};
use super::sizing::AllocationSizer;
use super::strategy::StrategyConfig;
use super::trend_filter::TrendFilter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub portfolio: PortfolioState,
    pub monthly: MonthlyState,
    pub history: PriceHistory,
}

impl EngineState {
    pub fn new(cash: f64, history_capacity: usize) -> Self {
        EngineState {
            portfolio: PortfolioState::new(cash),
            monthly: MonthlyState::new(),
            history: PriceHistory::with_capacity(history_capacity),
        }
    }

    /// Detached copy for reporting; never aliases the live state.
    pub fn snapshot(&self) -> EngineState {
        self.clone()
    }
}

#[derive(Debug, Clone)]
pub struct SignalGenerator {
    config: StrategyConfig,
    trend: TrendFilter,
    sizer: AllocationSizer,
    risk: RiskMonitor,
    rebalancer: MonthlyRebalancer,
    /// Fee rate reserved out of cash when sizing buys.
    commission_pct: f64,
}

impl SignalGenerator {
    pub fn new(config: StrategyConfig) -> Result<Self, AlloctraderError> {
        validate_strategy_config(&config)?;

        info!(
            strategy = %config.name,
            target_alloc = config.target_allocation_pct,
            hard_stop = config.hard_stop_loss_pct,
            trailing_stop = config.trailing_stop_pct,
            ema_period = config.ema_long_period,
            monthly_rebalance = config.enable_monthly_rebalance,
            "signal generator initialised"
        );

        Ok(SignalGenerator {
            trend: TrendFilter::new(config.ema_long_period, config.trend_floor_pct),
            sizer: AllocationSizer::new(config.target_allocation_pct, config.min_notional),
            risk: RiskMonitor::new(config.hard_stop_loss_pct, config.trailing_stop_pct),
            rebalancer: MonthlyRebalancer::new(config.enable_monthly_rebalance),
            commission_pct: 0.0,
            config,
        })
    }

    /// Caps buys so `notional * (1 + commission_pct)` never exceeds cash.
    pub fn with_commission_pct(mut self, commission_pct: f64) -> Self {
        self.commission_pct = commission_pct.max(0.0);
        self
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Fresh flat state with this generator's history capacity.
    pub fn initial_state(&self, cash: f64) -> EngineState {
        EngineState::new(cash, self.config.history_capacity)
    }

    /// Conforms a restored state to this generator's history capacity,
    /// keeping the newest prices.
    pub fn resume(&self, mut state: EngineState) -> EngineState {
        let capacity = self.config.history_capacity;
        if state.history.capacity() != capacity {
            warn!(
                stored = state.history.capacity(),
                configured = capacity,
                "history capacity changed, resizing restored history"
            );
            state.history = state.history.resized(capacity);
        }
        state
    }

    /// Decides and applies the action for one bar.
    ///
    /// A bar with a non-positive or non-finite price is rejected with
    /// `InvalidPrice` before anything in `state` is touched.
    pub fn on_bar(&self, state: &mut EngineState, bar: &Bar) -> Result<Signal, AlloctraderError> {
        bar.validate()?;
        let price = bar.price;

        state.history.push(price);

        let risk_exit = match state.portfolio.position.as_mut() {
            Some(position) => self.risk.observe(position, price),
            None => None,
        };

        if let Some(reason) = risk_exit {
            // still roll the month so a re-entry later this month is not rebalanced
            self.rebalancer.advance(&mut state.monthly, &bar.timestamp, false);
            return Ok(self.exit(state, bar, reason));
        }

        let position_open = !state.portfolio.is_flat();
        if self
            .rebalancer
            .observe(&mut state.monthly, &bar.timestamp, position_open)
        {
            return Ok(self.exit(state, bar, SignalReason::MonthlyRebalance));
        }

        let portfolio_value = state.portfolio.total_value(price);
        let position_value = state.portfolio.position_value(price);

        if !state.portfolio.is_flat() && !self.sizer.below_target(portfolio_value, position_value)
        {
            return Ok(Signal::hold(SignalReason::AtTarget));
        }

        if !self.trend.acceptable(&state.history, price) {
            debug!(
                price,
                ema = ?self.trend.ema(&state.history),
                "entry rejected by trend filter"
            );
            return Ok(Signal::hold(SignalReason::TrendRejected));
        }

        let affordable = (state.portfolio.cash / (1.0 + self.commission_pct) / price).max(0.0);
        let quantity = self
            .sizer
            .size_buy(portfolio_value, position_value, price)?
            .min(affordable);
        if quantity <= 0.0 || quantity * price < self.config.min_notional {
            return Ok(Signal::hold(SignalReason::AtTarget));
        }

        let notional = state.portfolio.apply_buy(price, quantity, bar.timestamp);
        if let Some(position) = state.portfolio.position.as_ref() {
            info!(
                ts = %bar.timestamp,
                price,
                size = quantity,
                notional,
                total_size = position.quantity,
                avg_entry = position.entry_price,
                "BUY"
            );
        }

        Ok(Signal::buy(quantity))
    }

    fn exit(&self, state: &mut EngineState, bar: &Bar, reason: SignalReason) -> Signal {
        match state.portfolio.close_position(bar.price) {
            Some((position, proceeds)) => {
                info!(
                    ts = %bar.timestamp,
                    price = bar.price,
                    size = position.quantity,
                    proceeds,
                    gain_pct = position.gain_from_entry(bar.price) * 100.0,
                    %reason,
                    "SELL"
                );
                Signal::sell(position.quantity, reason)
            }
            None => Signal::hold(SignalReason::AtTarget),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::domain::signal::Action;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn generator(config: StrategyConfig) -> SignalGenerator {
        SignalGenerator::new(config).unwrap()
    }

    fn default_generator() -> SignalGenerator {
        generator(StrategyConfig::default())
    }

    #[test]
    fn invalid_config_rejected_at_construction() {
        let err = SignalGenerator::new(StrategyConfig {
            trailing_stop_pct: 1.2,
            ..StrategyConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, AlloctraderError::InvalidConfiguration { .. }));
    }

    #[test]
    fn first_bar_buys_target_allocation() {
        let g = default_generator();
        let mut state = g.initial_state(5_000.0);
        let signal = g.on_bar(&mut state, &Bar::new(ts(2024, 1, 1, 0), 40_000.0)).unwrap();

        assert_eq!(signal.action, Action::Buy);
        assert_relative_eq!(signal.size, 0.06875);
        let pos = state.portfolio.position.as_ref().unwrap();
        assert_relative_eq!(pos.entry_price, 40_000.0);
        assert_relative_eq!(pos.highest_price_since_entry, 40_000.0);
        assert_relative_eq!(state.portfolio.cash, 2_250.0);
    }

    #[test]
    fn holds_at_target() {
        let g = default_generator();
        let mut state = g.initial_state(5_000.0);
        g.on_bar(&mut state, &Bar::new(ts(2024, 1, 1, 0), 40_000.0)).unwrap();
        let signal = g.on_bar(&mut state, &Bar::new(ts(2024, 1, 1, 1), 40_000.0)).unwrap();
        assert_eq!(signal, Signal::hold(SignalReason::AtTarget));
    }

    #[test]
    fn tops_up_after_price_drop() {
        let g = default_generator();
        let mut state = g.initial_state(10_000.0);
        g.on_bar(&mut state, &Bar::new(ts(2024, 1, 1, 0), 100.0)).unwrap();
        // 55 units, cash 4500; at 80: value 8900, target 4895, held 4400 → add 495
        let signal = g.on_bar(&mut state, &Bar::new(ts(2024, 1, 1, 1), 80.0)).unwrap();
        assert_eq!(signal.action, Action::Buy);
        assert_relative_eq!(signal.size, 495.0 / 80.0, epsilon = 1e-9);

        let pos = state.portfolio.position.as_ref().unwrap();
        let expected_entry = (100.0 * 55.0 + 80.0 * signal.size) / (55.0 + signal.size);
        assert_relative_eq!(pos.entry_price, expected_entry, epsilon = 1e-9);
        assert_relative_eq!(pos.highest_price_since_entry, 100.0);
    }

    #[test]
    fn invalid_price_leaves_state_unchanged() {
        let g = default_generator();
        let mut state = g.initial_state(5_000.0);
        g.on_bar(&mut state, &Bar::new(ts(2024, 1, 1, 0), 40_000.0)).unwrap();
        let before = state.snapshot();

        for price in [0.0, -1.0, f64::NAN] {
            let err = g.on_bar(&mut state, &Bar::new(ts(2024, 2, 1, 0), price)).unwrap_err();
            assert!(matches!(err, AlloctraderError::InvalidPrice { .. }));
            assert_eq!(state, before);
        }
    }

    #[test]
    fn hard_stop_sells_full_position() {
        let g = default_generator();
        let mut state = g.initial_state(5_000.0);
        g.on_bar(&mut state, &Bar::new(ts(2024, 1, 1, 0), 40_000.0)).unwrap();
        let qty = state.portfolio.quantity();

        let signal = g.on_bar(&mut state, &Bar::new(ts(2024, 1, 2, 0), 21_999.0)).unwrap();
        assert_eq!(signal.action, Action::Sell);
        assert_eq!(signal.reason, SignalReason::HardStop);
        assert_relative_eq!(signal.size, qty);
        assert!(state.portfolio.is_flat());
    }

    #[test]
    fn trailing_stop_after_rally() {
        let g = default_generator();
        let mut state = g.initial_state(10_000.0);
        g.on_bar(&mut state, &Bar::new(ts(2024, 1, 1, 0), 30_000.0)).unwrap();
        g.on_bar(&mut state, &Bar::new(ts(2024, 1, 2, 0), 50_000.0)).unwrap();
        assert_relative_eq!(
            state.portfolio.position.as_ref().unwrap().highest_price_since_entry,
            50_000.0
        );

        let signal = g.on_bar(&mut state, &Bar::new(ts(2024, 1, 3, 0), 30_000.0)).unwrap();
        assert_eq!(signal.action, Action::Sell);
        assert_eq!(signal.reason, SignalReason::TrailingStop);
    }

    #[test]
    fn monthly_rebalance_fires_once() {
        let g = default_generator();
        let mut state = g.initial_state(5_000.0);
        g.on_bar(&mut state, &Bar::new(ts(2024, 1, 31, 23), 40_000.0)).unwrap();

        let signal = g.on_bar(&mut state, &Bar::new(ts(2024, 2, 1, 0), 40_000.0)).unwrap();
        assert_eq!(signal.action, Action::Sell);
        assert_eq!(signal.reason, SignalReason::MonthlyRebalance);
        assert!(state.monthly.rebalanced_this_month);

        // re-entry on the next bar, then no further rebalance in February
        let signal = g.on_bar(&mut state, &Bar::new(ts(2024, 2, 1, 1), 40_000.0)).unwrap();
        assert_eq!(signal.action, Action::Buy);
        let mut t = ts(2024, 2, 1, 2);
        while t < ts(2024, 3, 1, 0) {
            let s = g.on_bar(&mut state, &Bar::new(t, 40_000.0)).unwrap();
            assert_ne!(s.action, Action::Sell);
            t += Duration::hours(6);
        }
        let signal = g.on_bar(&mut state, &Bar::new(ts(2024, 3, 1, 0), 40_000.0)).unwrap();
        assert_eq!(signal.reason, SignalReason::MonthlyRebalance);
    }

    #[test]
    fn monthly_rebalance_disabled() {
        let g = generator(StrategyConfig {
            enable_monthly_rebalance: false,
            ..StrategyConfig::default()
        });
        let mut state = g.initial_state(5_000.0);
        g.on_bar(&mut state, &Bar::new(ts(2024, 1, 31, 23), 40_000.0)).unwrap();
        let signal = g.on_bar(&mut state, &Bar::new(ts(2024, 2, 1, 0), 40_000.0)).unwrap();
        assert_eq!(signal.action, Action::Hold);
    }

    #[test]
    fn risk_exit_on_month_boundary_consumes_the_bar() {
        let g = default_generator();
        let mut state = g.initial_state(5_000.0);
        g.on_bar(&mut state, &Bar::new(ts(2024, 1, 31, 23), 40_000.0)).unwrap();

        let signal = g.on_bar(&mut state, &Bar::new(ts(2024, 2, 1, 0), 20_000.0)).unwrap();
        assert_eq!(signal.reason, SignalReason::HardStop);
        assert_eq!(state.monthly.current_month.unwrap().month, 2);

        // re-entry later in February is never monthly-rebalanced
        let signal = g.on_bar(&mut state, &Bar::new(ts(2024, 2, 1, 1), 20_000.0)).unwrap();
        assert_eq!(signal.action, Action::Buy);
        let signal = g.on_bar(&mut state, &Bar::new(ts(2024, 2, 2, 0), 20_000.0)).unwrap();
        assert_eq!(signal.action, Action::Hold);
    }

    #[test]
    fn trend_filter_blocks_entry_in_deep_bear() {
        let g = generator(StrategyConfig {
            ema_long_period: 3,
            history_capacity: 10,
            ..StrategyConfig::default()
        });
        let mut state = g.initial_state(5_000.0);
        state.history.push(100.0);
        state.history.push(100.0);
        let signal = g.on_bar(&mut state, &Bar::new(ts(2024, 1, 1, 0), 60.0)).unwrap();
        // EMA of [100, 100, 60] = 86.67; 60 < 0.7 * 86.67
        assert_eq!(signal, Signal::hold(SignalReason::TrendRejected));
        assert!(state.portfolio.is_flat());
    }

    #[test]
    fn fail_open_with_insufficient_history() {
        let g = default_generator();
        let mut state = g.initial_state(5_000.0);
        for _ in 0..10 {
            state.history.push(100_000.0);
        }
        let signal = g.on_bar(&mut state, &Bar::new(ts(2024, 1, 1, 0), 1.0)).unwrap();
        assert_eq!(signal.action, Action::Buy);
    }

    #[test]
    fn peak_resets_on_fresh_open() {
        let g = default_generator();
        let mut state = g.initial_state(5_000.0);
        g.on_bar(&mut state, &Bar::new(ts(2024, 1, 1, 0), 100.0)).unwrap();
        g.on_bar(&mut state, &Bar::new(ts(2024, 1, 2, 0), 150.0)).unwrap();
        g.on_bar(&mut state, &Bar::new(ts(2024, 1, 3, 0), 50.0)).unwrap();
        assert!(state.portfolio.is_flat());

        g.on_bar(&mut state, &Bar::new(ts(2024, 1, 4, 0), 55.0)).unwrap();
        let pos = state.portfolio.position.as_ref().unwrap();
        assert_relative_eq!(pos.highest_price_since_entry, 55.0);
        assert_relative_eq!(pos.entry_price, 55.0);
    }

    #[test]
    fn dust_top_up_holds() {
        let g = generator(StrategyConfig {
            min_notional: 100.0,
            ..StrategyConfig::default()
        });
        let mut state = g.initial_state(1_000.0);
        g.on_bar(&mut state, &Bar::new(ts(2024, 1, 1, 0), 100.0)).unwrap();
        // small dip leaves only a few dollars to add
        let signal = g.on_bar(&mut state, &Bar::new(ts(2024, 1, 1, 1), 99.0)).unwrap();
        assert_eq!(signal, Signal::hold(SignalReason::AtTarget));
    }

    #[test]
    fn snapshot_is_detached() {
        let g = default_generator();
        let mut state = g.initial_state(5_000.0);
        let snap = state.snapshot();
        g.on_bar(&mut state, &Bar::new(ts(2024, 1, 1, 0), 40_000.0)).unwrap();
        assert!(snap.portfolio.is_flat());
        assert!(!state.portfolio.is_flat());
    }

    #[test]
    fn full_allocation_reserves_commission() {
        let g = generator(StrategyConfig {
            target_allocation_pct: 1.0,
            ..StrategyConfig::default()
        })
        .with_commission_pct(0.001);
        let mut state = g.initial_state(10_000.0);
        let signal = g.on_bar(&mut state, &Bar::new(ts(2024, 1, 1, 0), 100.0)).unwrap();

        assert_eq!(signal.action, Action::Buy);
        let notional = signal.size * 100.0;
        assert_relative_eq!(notional, 10_000.0 / 1.001, epsilon = 1e-9);
        assert!(state.portfolio.cash - notional * 0.001 >= -1e-9);
    }

    #[test]
    fn buys_never_spend_more_than_cash() {
        let g = generator(StrategyConfig {
            target_allocation_pct: 1.0,
            ..StrategyConfig::default()
        });
        let mut state = g.initial_state(10_000.0);
        g.on_bar(&mut state, &Bar::new(ts(2024, 1, 1, 0), 100.0)).unwrap();
        assert!(state.portfolio.cash >= -1e-9);

        // flat cash with nothing left to spend holds instead of buying
        let signal = g.on_bar(&mut state, &Bar::new(ts(2024, 1, 1, 1), 90.0)).unwrap();
        assert_eq!(signal, Signal::hold(SignalReason::AtTarget));
    }

    #[test]
    fn resume_resizes_history_to_config() {
        let small = generator(StrategyConfig {
            ema_long_period: 3,
            history_capacity: 3,
            ..StrategyConfig::default()
        });
        let mut state = small.initial_state(1_000.0);
        for h in 0..6 {
            small.on_bar(&mut state, &Bar::new(ts(2024, 1, 1, h), 100.0)).unwrap();
        }
        assert_eq!(state.history.len(), 3);

        let large = generator(StrategyConfig {
            ema_long_period: 5,
            history_capacity: 5,
            ..StrategyConfig::default()
        });
        let mut resumed = large.resume(state);
        assert_eq!(resumed.history.capacity(), 5);
        for h in 6..10 {
            large.on_bar(&mut resumed, &Bar::new(ts(2024, 1, 1, h), 100.0)).unwrap();
        }
        assert_eq!(resumed.history.len(), 5);
        assert!(large.trend.ema(&resumed.history).is_some());
    }
}
