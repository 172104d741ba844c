use std::collections::VecDeque;

use parking_lot::Mutex;

/// Fixed-capacity ring of recent values for sparkline trends.
///
/// No time-based expiry: once full, each `add` drops the oldest value.
pub struct HistorySampler {
    samples: Mutex<VecDeque<f64>>,
    capacity: usize,
}

impl HistorySampler {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity + 1)),
            capacity,
        }
    }

    pub fn add(&self, value: f64) {
        if self.capacity == 0 {
            return;
        }
        let mut samples = self.samples.lock();
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(value);
    }

    /// Owned copy, oldest first.
    pub fn values(&self) -> Vec<f64> {
        self.samples.lock().iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
