use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use std::any::Any;
use std::convert::Infallible;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;
use tracing::{debug, error};

use super::collector::MetricsCollector;
use super::snapshot::FeedMetrics;
use crate::{AppState, SnapshotReceiver};

// ─── Snapshot ticker ─────────────────────────────────────────────
/// The only caller of `MetricsCollector::snapshot()`.
/// Each tick advances the trend histories by exactly one point, so the
/// sparklines stay evenly sampled no matter how many clients are reading.

pub fn spawn_publisher(
    metrics: Arc<MetricsCollector>,
    tick: Duration,
) -> (SnapshotReceiver, JoinHandle<()>) {
    spawn_ticker(tick, move || metrics.snapshot())
}

/// Runs `take_snapshot` on every tick and publishes the result.
///
/// A panicking tick is logged and skipped; the cadence continues and readers
/// keep the previous snapshot until the next good one. The task only ends
/// once every receiver is gone.
fn spawn_ticker<F>(tick: Duration, take_snapshot: F) -> (SnapshotReceiver, JoinHandle<()>)
where
    F: Fn() -> Vec<FeedMetrics> + Send + 'static,
{
    let (tx, rx) = watch::channel(Arc::new(Vec::new()));

    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if tx.is_closed() {
                debug!("no snapshot readers left, stopping publisher");
                break;
            }

            let snapshot = match panic::catch_unwind(AssertUnwindSafe(&take_snapshot)) {
                Ok(snapshot) => snapshot,
                Err(cause) => {
                    error!(cause = panic_message(&*cause), "snapshot tick panicked, skipping");
                    continue;
                }
            };
            if tx.send(Arc::new(snapshot)).is_err() {
                debug!("no snapshot readers left, stopping publisher");
                break;
            }
        }
    });

    (rx, handle)
}

fn panic_message(cause: &(dyn Any + Send)) -> &str {
    cause
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| cause.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

// ─── GET /api/metrics ────────────────────────────────────────────
/// Returns the most recently published snapshot — useful for curl / debugging.

pub async fn get_metrics(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<FeedMetrics>> {
    let latest = state.latest.borrow().clone();
    Json(latest.as_ref().clone())
}

// ─── GET /api/metrics/stream ─────────────────────────────────────
/// Server-Sent Events endpoint.
/// Pushes every published snapshot as JSON, one event per ticker tick.

pub async fn metrics_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(state.latest.clone()).map(|snapshot| {
        let json = serde_json::to_string(snapshot.as_ref()).unwrap_or_default();
        Ok(Event::default().data(json))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
