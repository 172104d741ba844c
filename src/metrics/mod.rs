pub mod clock;
pub mod collector;
pub mod history;
pub mod payload;
pub mod snapshot;
pub mod stream;
pub mod tokens;
pub mod window;

use std::time::Duration;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use collector::MetricsCollector;
pub use history::HistorySampler;
pub use payload::PayloadSampler;
pub use snapshot::FeedMetrics;
pub use tokens::{TokenSampler, TokenStats};
pub use window::SlidingWindow;

// ─── Configuration ───────────────────────────────────────────────

/// Message and byte samples are kept this long for rate queries
pub const MESSAGE_WINDOW_RETENTION: Duration = Duration::from_secs(60);

/// Window behind `messages_per_second_10s` / `bytes_per_second_10s`
pub const RATE_WINDOW: Duration = Duration::from_secs(10);

pub const PAYLOAD_RETENTION: Duration = Duration::from_secs(5 * 60);
pub const PAYLOAD_MAX_SAMPLES: usize = 1000;

pub const TOKEN_RETENTION: Duration = Duration::from_secs(5 * 60);
pub const TOKEN_MAX_SAMPLES: usize = 100;

/// Points per sparkline
pub const HISTORY_CAPACITY: usize = 30;

/// Context window (tokens) used for the utilization percentage
pub const MODEL_CONTEXT_LIMIT: u64 = 128_000;

/// One completed (or failed) LLM request against a feed's context.
/// This is the "write" side: the completion handler builds one and pushes it in.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LlmRequest {
    /// Prompt tokens (may be an estimate)
    pub input_tokens: i64,
    /// Response tokens
    pub output_tokens: i64,
    /// Time to first token in milliseconds
    pub ttft_ms: f64,
    /// Total generation wall time in milliseconds
    pub gen_time_ms: f64,
    /// Feed entries that were included in the prompt
    pub events_in_context: i64,
    /// true when the request errored out
    pub is_error: bool,
}

impl LlmRequest {
    /// A request that failed before producing anything.
    pub fn failed() -> Self {
        Self {
            is_error: true,
            ..Self::default()
        }
    }
}
