//! Performance metrics and statistics.

use serde::{Deserialize, Serialize};

use super::backtest::{BacktestResult, EquityPoint, SymbolResult};
use super::signal::Action;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub initial_capital: f64,
    pub final_equity: f64,
    pub total_pnl: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub buy_fills: usize,
    pub sell_fills: usize,
    pub total_fills: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub total_commission: f64,
    pub peak_allocation: f64,
}

impl Metrics {
    pub fn compute(result: &BacktestResult, periods_per_year: f64) -> Self {
        let initial_capital = result.initial_capital;
        let final_equity = result.final_equity();
        let total_pnl = final_equity - initial_capital;
        let total_return = if initial_capital > 0.0 {
            total_pnl / initial_capital
        } else {
            0.0
        };

        let buy_fills = result
            .fills
            .iter()
            .filter(|f| f.side == Action::Buy)
            .count();
        let sell_fills = result.fills.len() - buy_fills;

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;

        for trade in &result.closed_trades {
            if trade.pnl > 0.0 {
                trades_won += 1;
                total_wins += trade.pnl;
            } else {
                trades_lost += 1;
                total_losses += trade.pnl.abs();
            }
        }

        let total_trades = trades_won + trades_lost;
        let win_rate = if total_trades > 0 {
            trades_won as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            total_wins / trades_won as f64
        } else {
            0.0
        };
        let avg_loss = if trades_lost > 0 {
            total_losses / trades_lost as f64
        } else {
            0.0
        };

        let peak_allocation = result
            .equity_curve
            .iter()
            .map(EquityPoint::allocation)
            .fold(0.0_f64, f64::max);

        Metrics {
            initial_capital,
            final_equity,
            total_pnl,
            total_return,
            max_drawdown: compute_max_drawdown(&result.equity_curve),
            sharpe_ratio: compute_sharpe(&result.equity_curve, periods_per_year),
            buy_fills,
            sell_fills,
            total_fills: result.fills.len(),
            trades_won,
            trades_lost,
            win_rate,
            profit_factor,
            avg_win,
            avg_loss,
            total_commission: result.total_commission(),
            peak_allocation,
        }
    }
}

/// Largest peak-to-trough fall of equity, as a fraction of the peak.
pub fn compute_max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = match equity_curve.first() {
        Some(p) => p.equity,
        None => return 0.0,
    };
    let mut max_dd = 0.0_f64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
        }
    }

    max_dd
}

/// Mean over sample standard deviation of bar-to-bar returns, annualised by
/// sqrt(periods_per_year). Zero with fewer than two returns or flat equity.
pub fn compute_sharpe(equity_curve: &[EquityPoint], periods_per_year: f64) -> f64 {
    let returns: Vec<f64> = equity_curve
        .windows(2)
        .filter(|w| w[0].equity > 0.0)
        .map(|w| (w[1].equity - w[0].equity) / w[0].equity)
        .collect();

    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    if std_dev > 0.0 {
        mean / std_dev * periods_per_year.sqrt()
    } else {
        0.0
    }
}

/// Aggregate over independently run symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedSummary {
    pub initial_capital: f64,
    pub final_equity: f64,
    pub total_pnl: f64,
    pub total_return: f64,
    /// Worst single-symbol drawdown.
    pub max_drawdown: f64,
    pub total_fills: usize,
    pub win_rate: f64,
    pub avg_sharpe: f64,
}

impl CombinedSummary {
    pub fn compute(results: &[SymbolResult], periods_per_year: f64) -> Self {
        let metrics: Vec<Metrics> = results
            .iter()
            .map(|r| Metrics::compute(&r.result, periods_per_year))
            .collect();

        let initial_capital: f64 = metrics.iter().map(|m| m.initial_capital).sum();
        let final_equity: f64 = metrics.iter().map(|m| m.final_equity).sum();
        let total_pnl = final_equity - initial_capital;
        let total_return = if initial_capital > 0.0 {
            total_pnl / initial_capital
        } else {
            0.0
        };

        let won: usize = metrics.iter().map(|m| m.trades_won).sum();
        let lost: usize = metrics.iter().map(|m| m.trades_lost).sum();
        let win_rate = if won + lost > 0 {
            won as f64 / (won + lost) as f64
        } else {
            0.0
        };

        let avg_sharpe = if metrics.is_empty() {
            0.0
        } else {
            metrics.iter().map(|m| m.sharpe_ratio).sum::<f64>() / metrics.len() as f64
        };

        CombinedSummary {
            initial_capital,
            final_equity,
            total_pnl,
            total_return,
            max_drawdown: metrics.iter().map(|m| m.max_drawdown).fold(0.0, f64::max),
            total_fills: metrics.iter().map(|m| m.total_fills).sum(),
            win_rate,
            avg_sharpe,
        }
    }
}
