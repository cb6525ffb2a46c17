//! Backtest driver.
//!
//! Feeds bars through a [`SignalGenerator`], charges a proportional
//! commission on every fill and records fills, round-trip trades and the
//! per-bar equity curve. Each symbol runs on its own `EngineState`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::bar::Bar;
use super::config_validation::validate_backtest_config;
use super::engine::{EngineState, SignalGenerator};
use super::error::AlloctraderError;
use super::position::ClosedTrade;
use super::signal::{Action, SignalReason};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Fraction of notional charged per fill (0.001 = 0.1%).
    pub commission_pct: f64,
    pub periods_per_year: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 10_000.0,
            commission_pct: 0.001,
            periods_per_year: 252.0,
            start_date: None,
            end_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub timestamp: DateTime<Utc>,
    pub side: Action,
    pub price: f64,
    pub size: f64,
    pub notional: f64,
    pub commission: f64,
    pub reason: SignalReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
    pub cash: f64,
    pub position_value: f64,
    pub price: f64,
}

impl EquityPoint {
    pub fn allocation(&self) -> f64 {
        if self.equity > 0.0 {
            self.position_value / self.equity
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub initial_capital: f64,
    pub fills: Vec<Fill>,
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub final_state: EngineState,
    pub skipped_bars: usize,
}

impl BacktestResult {
    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.initial_capital)
    }

    pub fn total_commission(&self) -> f64 {
        self.fills.iter().map(|f| f.commission).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolResult {
    pub symbol: String,
    pub result: BacktestResult,
}

/// Runs one symbol from a flat state holding `config.initial_capital`.
pub fn run_backtest(
    generator: &SignalGenerator,
    bars: &[Bar],
    config: &BacktestConfig,
) -> Result<BacktestResult, AlloctraderError> {
    validate_backtest_config(config)?;
    let state = generator.initial_state(config.initial_capital);
    Ok(run_from_state(generator, bars, config, state))
}

/// Runs `bars` starting from an existing state (e.g. a restored snapshot).
pub fn run_from_state(
    generator: &SignalGenerator,
    bars: &[Bar],
    config: &BacktestConfig,
    state: EngineState,
) -> BacktestResult {
    let generator = &generator.clone().with_commission_pct(config.commission_pct);
    let mut state = generator.resume(state);
    let initial_capital = bars
        .first()
        .map(|b| state.portfolio.total_value(b.price))
        .unwrap_or(state.portfolio.cash);

    let mut fills = Vec::new();
    let mut closed_trades = Vec::new();
    let mut equity_curve = Vec::with_capacity(bars.len());
    let mut skipped_bars = 0usize;
    let mut open_commission = 0.0_f64;

    for bar in bars {
        let position_before = state.portfolio.position.clone();

        let signal = match generator.on_bar(&mut state, bar) {
            Ok(s) => s,
            Err(e) => {
                warn!(ts = %bar.timestamp, error = %e, "skipping bar");
                skipped_bars += 1;
                continue;
            }
        };

        match signal.action {
            Action::Buy => {
                let notional = signal.size * bar.price;
                let commission = notional * config.commission_pct;
                state.portfolio.debit_fee(commission);
                open_commission += commission;
                fills.push(Fill {
                    timestamp: bar.timestamp,
                    side: Action::Buy,
                    price: bar.price,
                    size: signal.size,
                    notional,
                    commission,
                    reason: signal.reason,
                });
            }
            Action::Sell => {
                let notional = signal.size * bar.price;
                let commission = notional * config.commission_pct;
                state.portfolio.debit_fee(commission);
                fills.push(Fill {
                    timestamp: bar.timestamp,
                    side: Action::Sell,
                    price: bar.price,
                    size: signal.size,
                    notional,
                    commission,
                    reason: signal.reason,
                });

                if let Some(pos) = position_before {
                    let cost = pos.entry_price * signal.size;
                    closed_trades.push(ClosedTrade {
                        quantity: signal.size,
                        entry_price: pos.entry_price,
                        exit_price: bar.price,
                        opened_at: pos.opened_at,
                        closed_at: bar.timestamp,
                        pnl: notional - cost - open_commission - commission,
                        exit_reason: signal.reason,
                    });
                }
                open_commission = 0.0;
            }
            Action::Hold => {}
        }

        let position_value = state.portfolio.position_value(bar.price);
        equity_curve.push(EquityPoint {
            timestamp: bar.timestamp,
            equity: state.portfolio.cash + position_value,
            cash: state.portfolio.cash,
            position_value,
            price: bar.price,
        });
    }

    let result = BacktestResult {
        initial_capital,
        fills,
        closed_trades,
        equity_curve,
        final_state: state,
        skipped_bars,
    };

    info!(
        bars = bars.len(),
        fills = result.fills.len(),
        trades = result.closed_trades.len(),
        skipped = result.skipped_bars,
        final_equity = result.final_equity(),
        "backtest complete"
    );

    result
}

/// Runs each symbol on an independent engine state, splitting
/// `config.initial_capital` evenly across symbols.
pub fn run_multi(
    generator: &SignalGenerator,
    series: &[(String, Vec<Bar>)],
    config: &BacktestConfig,
) -> Result<Vec<SymbolResult>, AlloctraderError> {
    validate_backtest_config(config)?;
    if series.is_empty() {
        return Ok(Vec::new());
    }

    let per_symbol = BacktestConfig {
        initial_capital: config.initial_capital / series.len() as f64,
        ..config.clone()
    };

    series
        .iter()
        .map(|(symbol, bars)| {
            info!(symbol = %symbol, bars = bars.len(), capital = per_symbol.initial_capital, "running symbol");
            run_backtest(generator, bars, &per_symbol).map(|result| SymbolResult {
                symbol: symbol.clone(),
                result,
            })
        })
        .collect()
}
