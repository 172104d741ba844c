use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::clock::SharedClock;

/// Recent payload sizes, bounded by both age and count.
pub struct PayloadSampler {
    samples: Mutex<VecDeque<(Instant, i64)>>,
    max_samples: usize,
    retention: Duration,
    clock: SharedClock,
}

impl PayloadSampler {
    pub fn new(max_samples: usize, retention: Duration, clock: SharedClock) -> Self {
        Self {
            samples: Mutex::new(VecDeque::with_capacity(max_samples + 1)),
            max_samples,
            retention,
            clock,
        }
    }

    pub fn add(&self, size: i64) {
        let now = self.clock.now();
        let mut samples = self.samples.lock();

        while let Some((at, _)) = samples.front() {
            if now.saturating_duration_since(*at) < self.retention {
                break;
            }
            samples.pop_front();
        }

        samples.push_back((now, size));
        while samples.len() > self.max_samples {
            samples.pop_front();
        }
    }

    /// Mean of the retained sizes; 0 when nothing is retained.
    pub fn average(&self) -> f64 {
        let samples = self.samples.lock();
        if samples.is_empty() {
            return 0.0;
        }
        // Summed as f64: a few sizes near i64::MAX would overflow an integer sum
        let sum: f64 = samples.iter().map(|(_, size)| *size as f64).sum();
        sum / samples.len() as f64
    }

    pub fn last(&self) -> Option<i64> {
        self.samples.lock().back().map(|(_, size)| *size)
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::metrics::clock::ManualClock;

    #[test]
    fn average_of_retained_samples() {
        let clock = Arc::new(ManualClock::new());
        let p = PayloadSampler::new(1000, Duration::from_secs(300), clock);
        assert_eq!(p.average(), 0.0);
        assert_eq!(p.last(), None);

        p.add(100);
        p.add(200);
        p.add(600);
        assert!((p.average() - 300.0).abs() < 1e-9);
        assert_eq!(p.last(), Some(600));
    }

    #[test]
    fn count_cap_evicts_oldest() {
        let clock = Arc::new(ManualClock::new());
        let p = PayloadSampler::new(3, Duration::from_secs(300), clock);
        for size in [1000, 10, 20, 30] {
            p.add(size);
        }
        assert_eq!(p.len(), 3);
        assert!((p.average() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn aged_samples_drop_out_on_next_add() {
        let clock = Arc::new(ManualClock::new());
        let p = PayloadSampler::new(1000, Duration::from_secs(300), clock.clone());
        p.add(5000);
        clock.advance(Duration::from_secs(301));
        p.add(100);
        assert_eq!(p.len(), 1);
        assert!((p.average() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn huge_sizes_do_not_overflow_the_mean() {
        let clock = Arc::new(ManualClock::new());
        let p = PayloadSampler::new(1000, Duration::from_secs(300), clock);
        p.add(i64::MAX);
        p.add(i64::MAX);
        p.add(i64::MAX);

        let avg = p.average();
        assert!(avg.is_finite());
        assert!(avg > 0.0);
        assert!((avg - i64::MAX as f64).abs() / (i64::MAX as f64) < 1e-9);
    }
}
