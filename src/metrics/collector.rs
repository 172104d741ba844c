use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use super::clock::{SharedClock, SystemClock};
use super::history::HistorySampler;
use super::payload::PayloadSampler;
use super::snapshot::FeedMetrics;
use super::tokens::TokenSampler;
use super::window::SlidingWindow;
use super::LlmRequest;
use crate::config::MetricsConfig;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe per-feed metrics engine.
/// Producers call the `record_*` methods, the dashboard ticker calls `snapshot()`.
///
/// Locking is two-tier: the feed map lock is held only to find or insert a
/// feed, and every sampler guards its own buffers, so unrelated feeds never
/// wait on each other's pruning.
pub struct MetricsCollector {
    feeds: RwLock<HashMap<String, Arc<FeedState>>>,
    config: MetricsConfig,
    clock: SharedClock,
}

// ─── Internal state ──────────────────────────────────────────────

struct FeedState {
    meta: Mutex<FeedMeta>,

    // Rate windows
    messages: SlidingWindow,
    bytes: SlidingWindow,

    // Rolling samplers
    payloads: PayloadSampler,
    tokens: TokenSampler,

    // Sparkline trends
    msg_rate_history: HistorySampler,
    cache_bytes_history: HistorySampler,
    gen_time_history: HistorySampler,
}

/// Scalars written directly by ingestion calls.
struct FeedMeta {
    metrics: FeedMetrics,
    started_at: Instant,
    last_message_at: Option<Instant>,
}

impl FeedState {
    fn new(feed_id: &str, name: &str, config: &MetricsConfig, clock: &SharedClock) -> Self {
        Self {
            meta: Mutex::new(FeedMeta {
                metrics: FeedMetrics::new(feed_id, name),
                started_at: clock.now(),
                last_message_at: None,
            }),
            messages: SlidingWindow::new(config.message_window(), clock.clone()),
            bytes: SlidingWindow::new(config.message_window(), clock.clone()),
            payloads: PayloadSampler::new(
                config.payload_max_samples,
                config.payload_retention(),
                clock.clone(),
            ),
            tokens: TokenSampler::new(
                config.token_max_samples,
                config.token_retention(),
                clock.clone(),
            ),
            msg_rate_history: HistorySampler::new(config.history_capacity),
            cache_bytes_history: HistorySampler::new(config.history_capacity),
            gen_time_history: HistorySampler::new(config.history_capacity),
        }
    }
}

// ─── MetricsCollector impl ───────────────────────────────────────

impl MetricsCollector {
    pub fn new() -> Self {
        Self::with_config(MetricsConfig::default())
    }

    pub fn with_config(config: MetricsConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: MetricsConfig, clock: SharedClock) -> Self {
        Self {
            feeds: RwLock::new(HashMap::new()),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    pub fn feed_count(&self) -> usize {
        self.feeds.read().len()
    }

    pub fn contains(&self, feed_id: &str) -> bool {
        self.feeds.read().contains_key(feed_id)
    }

    // ── Ingestion ───────────────────────────────────────────────

    /// Register a feed. The first registration wins; repeated calls for a
    /// known id keep its name and every accumulated value.
    pub fn init_feed(&self, feed_id: &str, name: &str) {
        if self.contains(feed_id) {
            return;
        }

        let mut feeds = self.feeds.write();
        if feeds.contains_key(feed_id) {
            return;
        }
        feeds.insert(
            feed_id.to_owned(),
            Arc::new(FeedState::new(feed_id, name, &self.config, &self.clock)),
        );
        debug!(feed_id, name, "registered feed");
    }

    pub fn record_message(&self, feed_id: &str, payload_size: i64) {
        let Some(feed) = self.feed(feed_id) else { return };
        let now = self.clock.now();

        {
            let mut meta = feed.meta.lock();
            let m = &mut meta.metrics;
            m.messages_received_total = m.messages_received_total.saturating_add(1);
            if payload_size > 0 {
                m.bytes_received_total = m.bytes_received_total.saturating_add(payload_size as u64);
            }
            m.payload_size_last_bytes = payload_size;
            m.payload_size_max_bytes = m.payload_size_max_bytes.max(payload_size);
            m.last_updated = Utc::now();
            meta.last_message_at = Some(now);
        }

        // Negative sizes would pull rates and averages below zero
        let size = payload_size.max(0);
        feed.messages.add(1.0);
        feed.bytes.add(size as f64);
        feed.payloads.add(size);
    }

    /// Track connection transitions. Uptime always measures time since the
    /// most recent state change; a drop counts as a reconnect.
    pub fn record_ws_status(&self, feed_id: &str, connected: bool) {
        let Some(feed) = self.feed(feed_id) else { return };
        let now = self.clock.now();

        let mut meta = feed.meta.lock();
        let was_connected = meta.metrics.ws_connected;
        if was_connected == connected {
            return;
        }

        meta.metrics.ws_connected = connected;
        if was_connected {
            meta.metrics.reconnects_total = meta.metrics.reconnects_total.saturating_add(1);
        }
        meta.started_at = now;
    }

    /// Overwrite the cache-health values; they are caller-computed snapshots.
    pub fn record_cache_stats(
        &self,
        feed_id: &str,
        item_count: usize,
        approx_bytes: u64,
        oldest_item_age_secs: f64,
    ) {
        let Some(feed) = self.feed(feed_id) else { return };
        let mut meta = feed.meta.lock();
        meta.metrics.cache_items_current = item_count;
        meta.metrics.cache_approx_bytes = approx_bytes;
        meta.metrics.oldest_item_age_seconds = oldest_item_age_secs;
    }

    /// A message that never made it into the local context.
    pub fn record_packet_loss(&self, feed_id: &str) {
        let Some(feed) = self.feed(feed_id) else { return };
        let mut meta = feed.meta.lock();
        let m = &mut meta.metrics;
        m.messages_dropped_total = m.messages_dropped_total.saturating_add(1);
        if m.messages_received_total > 0 {
            m.drop_rate_percent =
                m.messages_dropped_total as f64 / m.messages_received_total as f64 * 100.0;
        }
    }

    pub fn record_context_eviction(&self, feed_id: &str, count: i64) {
        if count <= 0 {
            return;
        }
        let Some(feed) = self.feed(feed_id) else { return };
        let mut meta = feed.meta.lock();
        meta.metrics.context_evictions_total =
            meta.metrics.context_evictions_total.saturating_add(count as u64);
    }

    pub fn record_llm_request(&self, feed_id: &str, request: LlmRequest) {
        let Some(feed) = self.feed(feed_id) else { return };

        {
            let mut meta = feed.meta.lock();
            let m = &mut meta.metrics;
            m.llm_requests_total = m.llm_requests_total.saturating_add(1);
            m.events_in_context_current = request.events_in_context;
            if request.is_error {
                m.llm_errors_total = m.llm_errors_total.saturating_add(1);
            }
            // Last known good: a request without a prompt count keeps the
            // previous utilization on display
            if request.input_tokens > 0 && self.config.model_context_limit > 0 {
                m.context_utilization_percent = request.input_tokens as f64
                    / self.config.model_context_limit as f64
                    * 100.0;
            }
        }

        feed.tokens.add(
            request.input_tokens,
            request.output_tokens,
            request.ttft_ms,
            request.gen_time_ms,
        );
    }

    // ── Snapshots ───────────────────────────────────────────────

    /// Derived metrics for every feed, sorted by name.
    ///
    /// Each call appends one point to every trend history, so call it from
    /// a fixed-cadence ticker rather than on demand.
    pub fn snapshot(&self) -> Vec<FeedMetrics> {
        let feeds: Vec<Arc<FeedState>> = self.feeds.read().values().cloned().collect();

        let mut out: Vec<FeedMetrics> = feeds
            .iter()
            .map(|feed| self.derive(feed, true))
            .collect();

        out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.feed_id.cmp(&b.feed_id)));
        out
    }

    /// Derived metrics for one feed. Trend histories are read, not advanced.
    pub fn feed_snapshot(&self, feed_id: &str) -> Option<FeedMetrics> {
        let feed = self.feed(feed_id)?;
        Some(self.derive(&feed, false))
    }

    // ── Helpers ─────────────────────────────────────────────────

    /// Clone the feed handle out so the map lock is released before any
    /// sampler work starts.
    fn feed(&self, feed_id: &str) -> Option<Arc<FeedState>> {
        let feed = self.feeds.read().get(feed_id).cloned();
        if feed.is_none() {
            trace!(feed_id, "ignoring event for unknown feed");
        }
        feed
    }

    fn derive(&self, feed: &FeedState, advance_history: bool) -> FeedMetrics {
        let now = self.clock.now();

        let (mut m, started_at, last_message_at) = {
            let meta = feed.meta.lock();
            (meta.metrics.clone(), meta.started_at, meta.last_message_at)
        };

        // ── Rates ───────────────────────────────────────────────
        let window = self.config.rate_window();
        m.messages_per_second_10s = feed.messages.rate(window);
        m.bytes_per_second_10s = feed.bytes.rate(window);
        m.payload_size_avg_bytes = feed.payloads.average();

        // ── LLM usage ───────────────────────────────────────────
        let tokens = feed.tokens.stats();
        m.input_tokens_total = tokens.input_total;
        m.output_tokens_total = tokens.output_total;
        m.input_tokens_last = tokens.input_last;
        m.output_tokens_last = tokens.output_last;
        m.ttft_ms = tokens.ttft_last_ms;
        m.ttft_avg_ms = tokens.ttft_avg_ms;
        m.generation_time_ms = tokens.gen_time_last_ms;
        m.generation_time_avg_ms = tokens.gen_time_avg_ms;

        // ── Ages ────────────────────────────────────────────────
        m.current_uptime_seconds = now.saturating_duration_since(started_at).as_secs_f64();
        m.last_message_age_seconds = last_message_at
            .map(|t| now.saturating_duration_since(t).as_secs_f64())
            .unwrap_or(0.0);

        // ── Trends ──────────────────────────────────────────────
        if advance_history {
            feed.msg_rate_history.add(m.messages_per_second_10s);
            feed.cache_bytes_history.add(m.cache_approx_bytes as f64);
            feed.gen_time_history.add(m.generation_time_ms);
        }
        m.msg_rate_history = feed.msg_rate_history.values();
        m.cache_bytes_history = feed.cache_bytes_history.values();
        m.gen_time_history = feed.gen_time_history.values();

        m
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
