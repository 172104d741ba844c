use chrono::{DateTime, Utc};
use serde::Serialize;

/// Derived metrics for one feed, shipped to the dashboard on every tick.
///
/// Always an owned copy: nothing in here aliases collector state.
#[derive(Debug, Clone, Serialize)]
pub struct FeedMetrics {
    // Identity
    pub feed_id: String,
    pub name: String,
    pub last_updated: DateTime<Utc>,

    // Stream health
    pub messages_received_total: u64,
    pub messages_per_second_10s: f64,
    pub bytes_received_total: u64,
    pub bytes_per_second_10s: f64,
    pub last_message_age_seconds: f64,
    pub ws_connected: bool,
    pub reconnects_total: u64,
    pub current_uptime_seconds: f64,

    // Local cache health
    pub cache_items_current: usize,
    pub cache_approx_bytes: u64,
    pub oldest_item_age_seconds: f64,
    pub messages_dropped_total: u64,
    pub context_evictions_total: u64,
    pub drop_rate_percent: f64,

    // Payload sizes
    pub payload_size_last_bytes: i64,
    pub payload_size_max_bytes: i64,
    pub payload_size_avg_bytes: f64,

    // LLM usage
    pub llm_requests_total: u64,
    pub input_tokens_total: u64,
    pub output_tokens_total: u64,
    pub input_tokens_last: i64,
    pub output_tokens_last: i64,
    pub context_utilization_percent: f64,
    pub llm_errors_total: u64,
    pub events_in_context_current: i64,
    pub ttft_ms: f64,
    pub ttft_avg_ms: f64,
    pub generation_time_ms: f64,
    pub generation_time_avg_ms: f64,

    // Sparkline trends, oldest first
    pub msg_rate_history: Vec<f64>,
    pub cache_bytes_history: Vec<f64>,
    pub gen_time_history: Vec<f64>,
}

impl FeedMetrics {
    /// Zeroed metrics for a freshly registered feed.
    pub fn new(feed_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            feed_id: feed_id.into(),
            name: name.into(),
            last_updated: Utc::now(),
            messages_received_total: 0,
            messages_per_second_10s: 0.0,
            bytes_received_total: 0,
            bytes_per_second_10s: 0.0,
            last_message_age_seconds: 0.0,
            ws_connected: false,
            reconnects_total: 0,
            current_uptime_seconds: 0.0,
            cache_items_current: 0,
            cache_approx_bytes: 0,
            oldest_item_age_seconds: 0.0,
            messages_dropped_total: 0,
            context_evictions_total: 0,
            drop_rate_percent: 0.0,
            payload_size_last_bytes: 0,
            payload_size_max_bytes: 0,
            payload_size_avg_bytes: 0.0,
            llm_requests_total: 0,
            input_tokens_total: 0,
            output_tokens_total: 0,
            input_tokens_last: 0,
            output_tokens_last: 0,
            context_utilization_percent: 0.0,
            llm_errors_total: 0,
            events_in_context_current: 0,
            ttft_ms: 0.0,
            ttft_avg_ms: 0.0,
            generation_time_ms: 0.0,
            generation_time_avg_ms: 0.0,
            msg_rate_history: Vec::new(),
            cache_bytes_history: Vec::new(),
            gen_time_history: Vec::new(),
        }
    }

    /// Share of LLM requests that failed, in percent.
    pub fn llm_error_rate_percent(&self) -> f64 {
        if self.llm_requests_total == 0 {
            return 0.0;
        }
        self.llm_errors_total as f64 / self.llm_requests_total as f64 * 100.0
    }
}
