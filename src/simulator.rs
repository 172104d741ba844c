use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::feed::{BoundedFeedBuffer, FeedEntry};
use crate::handlers::simulation::SimulationConfig;
use crate::metrics::{LlmRequest, MetricsCollector};

/// Roughly how many characters make one token
const CHARS_PER_TOKEN: usize = 4;

/// Chance (per mille) that a feed's socket drops on a given tick
const DISCONNECT_PER_MILLE: u32 = 5;

/// Chance (percent) that a synthetic LLM request fails
const LLM_ERROR_PCT: u8 = 5;

const EVENT_NAMES: &[&str] = &["trade", "quote", "status", "alert", "heartbeat"];

// ─── Public entry point ──────────────────────────────────────────

/// Spawns one Tokio task per synthetic feed and runs them until the
/// deadline or the `running` flag is set to false.
pub async fn run(running: Arc<AtomicBool>, metrics: Arc<MetricsCollector>, config: SimulationConfig) {
    let deadline = Instant::now() + Duration::from_secs(config.duration_secs);
    let buffer_capacity = metrics.config().feed_buffer_capacity;

    let mut handles = Vec::with_capacity(config.feeds as usize);

    for feed_no in 0..config.feeds {
        let running = running.clone();
        let metrics = metrics.clone();
        let config = config.clone();

        handles.push(tokio::spawn(async move {
            let feed = SimFeed::new(feed_no, buffer_capacity);
            feed.run(running, metrics, config, deadline).await;
        }));
    }

    // Wait for all feeds to finish
    for h in handles {
        let _ = h.await;
    }

    // Mark simulation as finished
    running.store(false, Ordering::SeqCst);
    info!("simulation finished");
}

// ─── Per-feed worker ─────────────────────────────────────────────

/// Stands in for one WebSocket reader plus the completion handler that
/// queries an LLM with the feed's buffered context.
struct SimFeed {
    id: String,
    name: String,
    buffer: BoundedFeedBuffer,
    rng: StdRng,
}

impl SimFeed {
    fn new(feed_no: u32, buffer_capacity: usize) -> Self {
        Self {
            // Stable ids: a rerun continues the same feeds instead of adding new ones
            id: format!("sim-{feed_no:03}"),
            name: format!("Simulated feed {feed_no:02}"),
            buffer: BoundedFeedBuffer::new(buffer_capacity),
            // Each feed gets its own deterministic RNG seeded uniquely.
            rng: StdRng::seed_from_u64(1000 + feed_no as u64),
        }
    }

    async fn run(
        mut self,
        running: Arc<AtomicBool>,
        metrics: Arc<MetricsCollector>,
        config: SimulationConfig,
        deadline: Instant,
    ) {
        metrics.init_feed(&self.id, &self.name);
        metrics.record_ws_status(&self.id, true);

        let tick = Duration::from_secs_f64(1.0 / config.messages_per_sec as f64);
        let llm_every = Duration::from_secs(config.llm_every_secs);
        let mut last_llm = Instant::now();

        while running.load(Ordering::Relaxed) && Instant::now() < deadline {
            tokio::time::sleep(tick).await;

            if self.rng.gen_ratio(DISCONNECT_PER_MILLE, 1000) {
                debug!(feed_id = %self.id, "simulated disconnect");
                metrics.record_ws_status(&self.id, false);
                metrics.record_ws_status(&self.id, true);
            }

            self.receive(&metrics, config.drop_pct);

            if last_llm.elapsed() >= llm_every {
                last_llm = Instant::now();
                let request = self.llm_request();
                metrics.record_llm_request(&self.id, request);
            }
        }

        metrics.record_ws_status(&self.id, false);
    }

    /// One inbound message: either dropped, or cached with the resulting
    /// eviction and cache stats forwarded to the collector.
    fn receive(&mut self, metrics: &MetricsCollector, drop_pct: u8) {
        let size = self.rng.gen_range(64..4096usize);
        let event = EVENT_NAMES[self.rng.gen_range(0..EVENT_NAMES.len())];

        metrics.record_message(&self.id, size as i64);

        if self.rng.gen_range(0u8..100) < drop_pct {
            metrics.record_packet_loss(&self.id);
            return;
        }

        let now = Instant::now();
        let evicted = self.buffer.add_entry(FeedEntry {
            feed_id: self.id.clone(),
            event: event.to_owned(),
            data: "x".repeat(size),
            received_at: now,
        });
        metrics.record_context_eviction(&self.id, evicted as i64);
        metrics.record_cache_stats(
            &self.id,
            self.buffer.len(),
            self.buffer.approx_bytes(),
            self.buffer.oldest_age_secs(now),
        );
    }

    /// Token counts are estimated from character counts, the way a client
    /// without a tokenizer would.
    fn llm_request(&mut self) -> LlmRequest {
        if self.rng.gen_range(0u8..100) < LLM_ERROR_PCT {
            return LlmRequest::failed();
        }

        // Each cached entry goes into the prompt as an "event: data" line
        let context_chars: usize = self
            .buffer
            .entries()
            .map(|e| e.event.len() + 2 + e.data.len() + 1)
            .sum();
        let prompt_chars = self.rng.gen_range(200..2000usize) + context_chars;
        let answer_chars = self.rng.gen_range(100..4000usize);
        let ttft_ms = self.rng.gen_range(80.0..900.0);
        let gen_time_ms = ttft_ms + self.rng.gen_range(400.0..6000.0);

        LlmRequest {
            input_tokens: (prompt_chars / CHARS_PER_TOKEN) as i64,
            output_tokens: (answer_chars / CHARS_PER_TOKEN) as i64,
            ttft_ms,
            gen_time_ms,
            events_in_context: self.buffer.len() as i64,
            is_error: false,
        }
    }
}
