use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::clock::SharedClock;

/// Per-request LLM usage: lifetime token totals plus a rolling latency log.
///
/// Totals cover the whole session; the latency log only feeds the averages
/// and ages out after `retention` (or once `max_samples` is exceeded).
pub struct TokenSampler {
    inner: Mutex<TokenInner>,
    max_samples: usize,
    retention: Duration,
    clock: SharedClock,
}

/// Point-in-time read of a [`TokenSampler`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TokenStats {
    pub input_total: u64,
    pub output_total: u64,
    pub input_last: i64,
    pub output_last: i64,
    pub ttft_last_ms: f64,
    pub ttft_avg_ms: f64,
    pub gen_time_last_ms: f64,
    pub gen_time_avg_ms: f64,
}

#[derive(Default)]
struct TokenInner {
    latencies: VecDeque<LatencySample>,
    total_input: u64,
    total_output: u64,
    last_input: i64,
    last_output: i64,
    last_ttft_ms: f64,
    last_gen_time_ms: f64,
}

#[derive(Debug, Clone, Copy)]
struct LatencySample {
    at: Instant,
    ttft_ms: f64,
    gen_time_ms: f64,
}

impl TokenSampler {
    pub fn new(max_samples: usize, retention: Duration, clock: SharedClock) -> Self {
        Self {
            inner: Mutex::new(TokenInner {
                latencies: VecDeque::with_capacity(max_samples + 1),
                ..TokenInner::default()
            }),
            max_samples,
            retention,
            clock,
        }
    }

    pub fn add(&self, input_tokens: i64, output_tokens: i64, ttft_ms: f64, gen_time_ms: f64) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        // Totals only ever grow
        if input_tokens > 0 {
            inner.total_input = inner.total_input.saturating_add(input_tokens as u64);
        }
        if output_tokens > 0 {
            inner.total_output = inner.total_output.saturating_add(output_tokens as u64);
        }

        // "Last" reflects exactly what was reported
        inner.last_input = input_tokens;
        inner.last_output = output_tokens;
        inner.last_ttft_ms = ttft_ms;
        inner.last_gen_time_ms = gen_time_ms;

        while let Some(front) = inner.latencies.front() {
            if now.saturating_duration_since(front.at) < self.retention {
                break;
            }
            inner.latencies.pop_front();
        }

        // Averages stay >= 0 even if a caller reports garbage (negative or NaN)
        inner.latencies.push_back(LatencySample {
            at: now,
            ttft_ms: ttft_ms.max(0.0),
            gen_time_ms: gen_time_ms.max(0.0),
        });
        while inner.latencies.len() > self.max_samples {
            inner.latencies.pop_front();
        }
    }

    pub fn stats(&self) -> TokenStats {
        let inner = self.inner.lock();

        let mut stats = TokenStats {
            input_total: inner.total_input,
            output_total: inner.total_output,
            input_last: inner.last_input,
            output_last: inner.last_output,
            ttft_last_ms: inner.last_ttft_ms,
            gen_time_last_ms: inner.last_gen_time_ms,
            ..TokenStats::default()
        };

        let count = inner.latencies.len();
        if count == 0 {
            return stats;
        }

        let (ttft_sum, gen_sum) = inner
            .latencies
            .iter()
            .fold((0.0, 0.0), |(t, g), s| (t + s.ttft_ms, g + s.gen_time_ms));
        stats.ttft_avg_ms = ttft_sum / count as f64;
        stats.gen_time_avg_ms = gen_sum / count as f64;
        stats
    }

    /// Latency samples currently in the averaging window.
    pub fn window_len(&self) -> usize {
        self.inner.lock().latencies.len()
    }
}
