//! Per-bar engine output.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

/// Why the engine emitted a given signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalReason {
    TargetAllocation,
    HardStop,
    TrailingStop,
    MonthlyRebalance,
    TrendRejected,
    AtTarget,
}

impl SignalReason {
    pub fn is_exit(self) -> bool {
        matches!(
            self,
            SignalReason::HardStop | SignalReason::TrailingStop | SignalReason::MonthlyRebalance
        )
    }
}

impl std::fmt::Display for SignalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignalReason::TargetAllocation => "target allocation",
            SignalReason::HardStop => "hard stop",
            SignalReason::TrailingStop => "trailing stop",
            SignalReason::MonthlyRebalance => "monthly rebalance",
            SignalReason::TrendRejected => "trend rejected",
            SignalReason::AtTarget => "at target",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub action: Action,
    /// Quantity for BUY, full position quantity for SELL, 0 for HOLD.
    pub size: f64,
    pub reason: SignalReason,
}

impl Signal {
    pub fn buy(size: f64) -> Self {
        Signal {
            action: Action::Buy,
            size,
            reason: SignalReason::TargetAllocation,
        }
    }

    pub fn sell(size: f64, reason: SignalReason) -> Self {
        Signal {
            action: Action::Sell,
            size,
            reason,
        }
    }

    pub fn hold(reason: SignalReason) -> Self {
        Signal {
            action: Action::Hold,
            size: 0.0,
            reason,
        }
    }

    pub fn is_trade(&self) -> bool {
        self.action != Action::Hold
    }
}
