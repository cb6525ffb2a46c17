//! Forced monthly rebalance.
//!
//! Month transitions are a pure function of the previously observed month
//! key and the bar's month key; no wall clock is read. The month only moves
//! forward, so replayed or out-of-order bars never fire twice for one month.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bar::MonthKey;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyState {
    pub current_month: Option<MonthKey>,
    pub rebalanced_this_month: bool,
}

impl MonthlyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `key` is later than the current month.
    pub fn is_new_month(&self, key: MonthKey) -> bool {
        self.current_month.is_some_and(|current| key > current)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyRebalancer {
    pub enabled: bool,
}

impl MonthlyRebalancer {
    pub fn new(enabled: bool) -> Self {
        MonthlyRebalancer { enabled }
    }

    /// Whether the bar at `timestamp` is the first of a new month with an open
    /// position that has not been rebalanced yet.
    pub fn should_rebalance(
        &self,
        state: &MonthlyState,
        timestamp: &DateTime<Utc>,
        position_open: bool,
    ) -> bool {
        self.enabled && position_open && state.is_new_month(MonthKey::of(timestamp))
    }

    /// Moves `state` to the bar's month. A month change resets the flag;
    /// `rebalanced` then marks whether this bar performed the rebalance.
    /// Bars from the current or an earlier month leave the month untouched.
    pub fn advance(&self, state: &mut MonthlyState, timestamp: &DateTime<Utc>, rebalanced: bool) {
        let key = MonthKey::of(timestamp);
        match state.current_month {
            None => {
                state.current_month = Some(key);
                state.rebalanced_this_month = rebalanced;
            }
            Some(current) if key > current => {
                state.current_month = Some(key);
                state.rebalanced_this_month = rebalanced;
            }
            Some(_) => {
                if rebalanced {
                    state.rebalanced_this_month = true;
                }
            }
        }
    }

    /// `should_rebalance` followed by `advance`; returns whether it fired.
    pub fn observe(
        &self,
        state: &mut MonthlyState,
        timestamp: &DateTime<Utc>,
        position_open: bool,
    ) -> bool {
        let fire = self.should_rebalance(state, timestamp, position_open);
        self.advance(state, timestamp, fire);
        fire
    }
}
