use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::clock::SharedClock;

/// Time-bounded sample log answering "how much arrived in the last D seconds".
///
/// Every write prunes samples older than `retention`, so memory is bounded
/// by one retention period of traffic.
pub struct SlidingWindow {
    samples: Mutex<VecDeque<WindowSample>>,
    retention: Duration,
    clock: SharedClock,
}

#[derive(Debug, Clone, Copy)]
struct WindowSample {
    at: Instant,
    value: f64,
}

impl SlidingWindow {
    pub fn new(retention: Duration, clock: SharedClock) -> Self {
        Self {
            samples: Mutex::new(VecDeque::with_capacity(1024)),
            retention,
            clock,
        }
    }

    pub fn add(&self, value: f64) {
        let now = self.clock.now();
        let mut samples = self.samples.lock();
        samples.push_back(WindowSample { at: now, value });
        prune(&mut samples, now, self.retention);
    }

    /// Sum of values newer than `window`, per second of `window`.
    pub fn rate(&self, window: Duration) -> f64 {
        if window.is_zero() {
            return 0.0;
        }
        let sum = self.sum(window);
        if sum <= 0.0 {
            return 0.0;
        }
        sum / window.as_secs_f64()
    }

    /// Sum of values newer than `window`.
    pub fn sum(&self, window: Duration) -> f64 {
        let now = self.clock.now();
        let mut samples = self.samples.lock();
        prune(&mut samples, now, self.retention);

        samples
            .iter()
            .filter(|s| now.saturating_duration_since(s.at) < window)
            .map(|s| s.value)
            .sum()
    }

    /// Samples currently retained (after the last prune).
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Samples are appended in time order, so expired ones sit at the front.
fn prune(samples: &mut VecDeque<WindowSample>, now: Instant, retention: Duration) {
    while let Some(front) = samples.front() {
        if now.saturating_duration_since(front.at) < retention {
            break;
        }
        samples.pop_front();
    }
}
