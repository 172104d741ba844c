use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use crate::feed::FEED_BUFFER_CAPACITY;
use crate::metrics::{
    HISTORY_CAPACITY, MESSAGE_WINDOW_RETENTION, MODEL_CONTEXT_LIMIT, PAYLOAD_MAX_SAMPLES,
    PAYLOAD_RETENTION, RATE_WINDOW, TOKEN_MAX_SAMPLES, TOKEN_RETENTION,
};

// ─── Engine tuning ───────────────────────────────────────────────

/// Every retention, window and capacity the collector uses.
/// Durations are whole seconds so the struct reads naturally from JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// How long message/byte samples are kept for rate queries
    pub message_window_secs: u64,
    /// Window the `*_per_second_10s` rates are computed over
    pub rate_window_secs: u64,
    pub payload_retention_secs: u64,
    pub payload_max_samples: usize,
    pub token_retention_secs: u64,
    pub token_max_samples: usize,
    /// Points kept per sparkline
    pub history_capacity: usize,
    /// Denominator for context utilization, in tokens
    pub model_context_limit: u64,
    /// Raw entries a producer keeps per feed before evicting
    pub feed_buffer_capacity: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            message_window_secs: MESSAGE_WINDOW_RETENTION.as_secs(),
            rate_window_secs: RATE_WINDOW.as_secs(),
            payload_retention_secs: PAYLOAD_RETENTION.as_secs(),
            payload_max_samples: PAYLOAD_MAX_SAMPLES,
            token_retention_secs: TOKEN_RETENTION.as_secs(),
            token_max_samples: TOKEN_MAX_SAMPLES,
            history_capacity: HISTORY_CAPACITY,
            model_context_limit: MODEL_CONTEXT_LIMIT,
            feed_buffer_capacity: FEED_BUFFER_CAPACITY,
        }
    }
}

impl MetricsConfig {
    pub fn message_window(&self) -> Duration {
        Duration::from_secs(self.message_window_secs)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    pub fn payload_retention(&self) -> Duration {
        Duration::from_secs(self.payload_retention_secs)
    }

    pub fn token_retention(&self) -> Duration {
        Duration::from_secs(self.token_retention_secs)
    }
}

// ─── Server CLI ──────────────────────────────────────────────────

#[derive(Debug, Clone, Parser)]
#[command(name = "feed-pulse", about = "Live per-feed metrics dashboard")]
pub struct ServerArgs {
    /// Address the HTTP server binds to
    #[arg(long, default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Snapshot cadence in milliseconds (one sparkline point per tick)
    #[arg(long, default_value_t = 500)]
    pub tick_ms: u64,

    /// Points kept per sparkline
    #[arg(long, default_value_t = HISTORY_CAPACITY)]
    pub history_capacity: usize,

    /// Model context window used for the utilization percentage
    #[arg(long, default_value_t = MODEL_CONTEXT_LIMIT)]
    pub context_limit: u64,

    /// Directory served as the dashboard front end
    #[arg(long, default_value = "static")]
    pub static_dir: PathBuf,
}

impl ServerArgs {
    pub fn metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            history_capacity: self.history_capacity,
            model_context_limit: self.context_limit,
            ..MetricsConfig::default()
        }
    }

    /// Never zero, so the ticker interval is always valid.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}
