//! Real-time per-feed metrics aggregation.
//!
//! [`metrics::MetricsCollector`] is the engine: producers push events in,
//! a fixed-cadence ticker pulls sorted [`metrics::FeedMetrics`] snapshots out.
//! The remaining modules host it behind an HTTP dashboard.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::watch;

pub mod config;
pub mod feed;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod simulator;

use metrics::{FeedMetrics, MetricsCollector};

/// Latest published snapshot, shared with every reader.
pub type SnapshotReceiver = watch::Receiver<Arc<Vec<FeedMetrics>>>;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Central metrics engine: producers record events, the ticker snapshots.
    pub metrics: Arc<MetricsCollector>,

    /// Snapshots published by the ticker; handlers never call `snapshot()` themselves.
    pub latest: SnapshotReceiver,

    /// Flag checked by every simulator worker on each iteration.
    pub sim_running: Arc<AtomicBool>,

    /// Handle to the spawned simulator task so we can await clean shutdown.
    pub sim_handle: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl AppState {
    pub fn new(metrics: Arc<MetricsCollector>, latest: SnapshotReceiver) -> Self {
        Self {
            metrics,
            latest,
            sim_running: Arc::new(AtomicBool::new(false)),
            sim_handle: tokio::sync::Mutex::new(None),
        }
    }
}
