//! Long-period EMA trend filter.
//!
//! k = 2/(n+1), seeded with the SMA of the first n prices, then
//! EMA[i] = P[i]*k + EMA[i-1]*(1-k). Undefined until n prices are available,
//! in which case the filter lets entries through.

use super::history::PriceHistory;

/// Last EMA value over `prices`, or `None` with fewer than `period` prices.
pub fn ema<I>(prices: I, period: usize) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    if period == 0 {
        return None;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut sum = 0.0;
    let mut ema = None;

    for (i, price) in prices.into_iter().enumerate() {
        if i < period - 1 {
            sum += price;
        } else if i == period - 1 {
            sum += price;
            ema = Some(sum / period as f64);
        } else if let Some(prev) = ema {
            ema = Some(price * k + prev * (1.0 - k));
        }
    }

    ema
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendFilter {
    pub period: usize,
    pub floor_pct: f64,
}

impl TrendFilter {
    pub fn new(period: usize, floor_pct: f64) -> Self {
        TrendFilter { period, floor_pct }
    }

    pub fn ema(&self, history: &PriceHistory) -> Option<f64> {
        ema(history.iter(), self.period)
    }

    /// False only when the EMA is defined and `current_price` sits below
    /// `floor_pct * ema` (extreme bear regime).
    pub fn acceptable(&self, history: &PriceHistory, current_price: f64) -> bool {
        match self.ema(history) {
            Some(ema) => current_price >= self.floor_pct * ema,
            None => true,
        }
    }
}
