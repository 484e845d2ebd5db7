// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Peg Collapse Simulation Suite - Oracle History Buffer

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum number of past volatile prices retained.
pub const HISTORY_CAPACITY: usize = 1024;

/// Fixed-capacity ring of past volatile prices, oldest evicted first.
///
/// Only used for the delayed read that prices newly minted volatile supply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    prices: VecDeque<f64>,
}

impl PriceHistory {
    pub fn new() -> Self {
        Self {
            prices: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// History seeded with a single observation.
    pub fn seeded(price: f64) -> Self {
        let mut history = Self::new();
        history.push(price);
        history
    }

    /// Append the newest price, evicting the oldest once at capacity.
    pub fn push(&mut self, price: f64) {
        if self.prices.len() == HISTORY_CAPACITY {
            self.prices.pop_front();
        }
        self.prices.push_back(price);
    }

    /// The entry `delay` positions back from the newest, or `current` when the
    /// history is too short to look that far back.
    pub fn delayed(&self, delay: usize, current: f64) -> f64 {
        let len = self.prices.len();
        if len < delay + 1 {
            return current;
        }
        self.prices[len - 1 - delay]
    }

    pub fn latest(&self) -> Option<f64> {
        self.prices.back().copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl Default for PriceHistory {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delayed_read_falls_back_to_current_price() {
        let history = PriceHistory::seeded(80.0);
        assert_eq!(history.delayed(0, 50.0), 80.0);
        assert_eq!(history.delayed(1, 50.0), 50.0);
        assert_eq!(PriceHistory::new().delayed(0, 42.0), 42.0);
    }

    #[test]
    fn delayed_read_counts_back_from_newest() {
        let mut history = PriceHistory::new();
        for p in [10.0, 20.0, 30.0, 40.0] {
            history.push(p);
        }
        assert_eq!(history.delayed(0, 0.0), 40.0);
        assert_eq!(history.delayed(2, 0.0), 20.0);
        assert_eq!(history.delayed(3, 0.0), 10.0);
        assert_eq!(history.delayed(4, 99.0), 99.0);
    }

    #[test]
    fn capacity_evicts_oldest_first() {
        let mut history = PriceHistory::new();
        for i in 0..(HISTORY_CAPACITY + 10) {
            history.push(i as f64);
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.latest(), Some((HISTORY_CAPACITY + 9) as f64));
        // Oldest surviving entry is the 11th pushed.
        assert_eq!(history.delayed(HISTORY_CAPACITY - 1, 0.0), 10.0);
    }
}
