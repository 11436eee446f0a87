use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceTick {
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub volume: f64,
    pub high: f64,
    pub low: f64,
}

/// Capacity-bounded FIFO of ticks; the oldest tick is evicted on overflow.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory {
    ticks: VecDeque<PriceTick>,
    capacity: usize,
}

impl Default for PriceHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl PriceHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ticks: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn from_ticks(capacity: usize, ticks: impl IntoIterator<Item = PriceTick>) -> Self {
        let mut history = Self::new(capacity);
        for tick in ticks {
            history.push(tick);
        }
        history
    }

    pub fn push(&mut self, tick: PriceTick) {
        if self.ticks.len() >= self.capacity {
            self.ticks.pop_front();
        }
        self.ticks.push_back(tick);
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&PriceTick> {
        self.ticks.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriceTick> {
        self.ticks.iter()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.ticks.iter().map(|t| t.price).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.ticks.iter().map(|t| t.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.ticks.iter().map(|t| t.low).collect()
    }

    /// Percent change of the latest price against the price `periods` ticks
    /// earlier (or the oldest retained tick when fewer are available).
    pub fn change_pct(&self, periods: usize) -> f64 {
        let Some(latest) = self.ticks.back() else {
            return 0.0;
        };
        let back = periods.min(self.ticks.len() - 1);
        let reference = self.ticks[self.ticks.len() - 1 - back].price;
        if reference == 0.0 {
            return 0.0;
        }
        (latest.price - reference) / reference * 100.0
    }
}
