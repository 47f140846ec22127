//! Bounded RSSI history with population mean and variance.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Ordered RSSI history for one anchor, oldest first.
///
/// With a capacity the history behaves as a ring: pushing onto a full history
/// drops the oldest reading. Without a capacity it grows for the whole session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RssiHistory {
    values: VecDeque<f64>,
    capacity: Option<usize>,
}

impl RssiHistory {
    /// Create an empty history, bounded when `capacity` is `Some`.
    pub fn new(capacity: Option<usize>) -> Self {
        let values = match capacity {
            Some(cap) => VecDeque::with_capacity(cap),
            None => VecDeque::new(),
        };
        Self { values, capacity }
    }

    /// Append the latest reading, evicting the oldest if the window is full.
    pub fn push(&mut self, value: f64) {
        if let Some(cap) = self.capacity {
            while self.values.len() >= cap.max(1) {
                self.values.pop_front();
            }
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }

    /// Arithmetic mean of the stored readings, 0 when empty.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Population variance (divides by `n`, not `n - 1`), 0 when empty.
    pub fn variance(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let sum_sq: f64 = self.values.iter().map(|v| (v - mean).powi(2)).sum();
        sum_sq / self.values.len() as f64
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
