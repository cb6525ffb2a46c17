//! Bounded price history feeding the trend filter.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    capacity: usize,
    prices: VecDeque<f64>,
}

impl PriceHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        PriceHistory {
            capacity,
            prices: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends a price, evicting the oldest once full.
    pub fn push(&mut self, price: f64) {
        while self.prices.len() >= self.capacity.max(1) {
            self.prices.pop_front();
        }
        self.prices.push_back(price);
    }

    /// Copy with a new capacity, keeping the newest prices.
    pub fn resized(&self, capacity: usize) -> Self {
        let mut resized = PriceHistory::with_capacity(capacity);
        let skip = self.prices.len().saturating_sub(resized.capacity);
        for price in self.prices.iter().skip(skip) {
            resized.push(*price);
        }
        resized
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<f64> {
        self.prices.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.prices.iter().copied()
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_evicts_oldest() {
        let mut h = PriceHistory::with_capacity(3);
        for p in [1.0, 2.0, 3.0, 4.0] {
            h.push(p);
        }
        assert_eq!(h.iter().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
        assert_eq!(h.len(), 3);
        assert_eq!(h.last(), Some(4.0));
    }

    #[test]
    fn zero_capacity_clamped_to_one() {
        let mut h = PriceHistory::with_capacity(0);
        h.push(1.0);
        h.push(2.0);
        assert_eq!(h.capacity(), 1);
        assert_eq!(h.iter().collect::<Vec<_>>(), vec![2.0]);
    }

    #[test]
    fn resized_keeps_newest() {
        let mut h = PriceHistory::with_capacity(5);
        for p in [1.0, 2.0, 3.0, 4.0, 5.0] {
            h.push(p);
        }
        let small = h.resized(2);
        assert_eq!(small.capacity(), 2);
        assert_eq!(small.iter().collect::<Vec<_>>(), vec![4.0, 5.0]);

        let mut large = small.resized(4);
        large.push(6.0);
        large.push(7.0);
        large.push(8.0);
        assert_eq!(large.len(), 4);
        assert_eq!(large.iter().collect::<Vec<_>>(), vec![5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn zero_capacity_snapshot_stays_bounded() {
        let mut h: PriceHistory =
            serde_json::from_str(r#"{"capacity":0,"prices":[]}"#).unwrap();
        for p in [1.0, 2.0, 3.0] {
            h.push(p);
        }
        assert_eq!(h.len(), 1);
        assert_eq!(h.last(), Some(3.0));
    }

    #[test]
    fn empty_history() {
        let h = PriceHistory::with_capacity(10);
        assert!(h.is_empty());
        assert_eq!(h.last(), None);
    }
}
