use axum::{
    extract::State,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

use crate::AppState;

use super::AppError;

// ─── Request / response types ────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Number of synthetic feeds, one Tokio task each
    #[serde(default = "default_feeds")]
    pub feeds: u32,

    /// How long the simulation runs (seconds)
    #[serde(default = "default_duration")]
    pub duration_secs: u64,

    /// Messages each feed produces per second
    #[serde(default = "default_messages_per_sec")]
    pub messages_per_sec: u32,

    /// Percentage of messages that are dropped instead of cached (0–100)
    #[serde(default = "default_drop_pct")]
    pub drop_pct: u8,

    /// Seconds between synthetic LLM requests per feed
    #[serde(default = "default_llm_every")]
    pub llm_every_secs: u64,
}

fn default_feeds() -> u32 {
    4
}
fn default_duration() -> u64 {
    60
}
fn default_messages_per_sec() -> u32 {
    5
}
fn default_drop_pct() -> u8 {
    2
}
fn default_llm_every() -> u64 {
    10
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            duration_secs: default_duration(),
            messages_per_sec: default_messages_per_sec(),
            drop_pct: default_drop_pct(),
            llm_every_secs: default_llm_every(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.feeds == 0 || self.feeds > 100 {
            return Err(AppError::BadRequest(
                "feeds must be between 1 and 100".into(),
            ));
        }
        if self.duration_secs == 0 || self.duration_secs > 3600 {
            return Err(AppError::BadRequest(
                "duration_secs must be between 1 and 3600".into(),
            ));
        }
        if self.messages_per_sec == 0 || self.messages_per_sec > 1000 {
            return Err(AppError::BadRequest(
                "messages_per_sec must be between 1 and 1000".into(),
            ));
        }
        if self.drop_pct > 100 {
            return Err(AppError::BadRequest(
                "drop_pct must be between 0 and 100".into(),
            ));
        }
        if self.llm_every_secs == 0 {
            return Err(AppError::BadRequest(
                "llm_every_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct SimulationStatus {
    pub running: bool,
    pub feeds: usize,
    pub message: String,
}

// ─── POST /api/simulation/start ──────────────────────────────────

pub async fn start_simulation(
    State(state): State<Arc<AppState>>,
    Json(config): Json<SimulationConfig>,
) -> Result<Json<SimulationStatus>, AppError> {
    config.validate()?;

    // Only one simulation at a time
    if state
        .sim_running
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(AppError::AlreadyRunning);
    }

    let msg = format!(
        "Started: {} feeds × {}s, {} msg/s, {}% dropped, LLM every {}s",
        config.feeds,
        config.duration_secs,
        config.messages_per_sec,
        config.drop_pct,
        config.llm_every_secs,
    );
    info!("{msg}");

    let running = state.sim_running.clone();
    let metrics = state.metrics.clone();

    let handle = tokio::spawn(async move {
        crate::simulator::run(running, metrics, config).await;
    });

    // Stash the handle so `stop` can await clean shutdown
    let mut guard = state.sim_handle.lock().await;
    *guard = Some(handle);

    Ok(Json(SimulationStatus {
        running: true,
        feeds: state.metrics.feed_count(),
        message: msg,
    }))
}

// ─── POST /api/simulation/stop ───────────────────────────────────

pub async fn stop_simulation(
    State(state): State<Arc<AppState>>,
) -> Json<SimulationStatus> {
    if !state.sim_running.load(Ordering::SeqCst) {
        return Json(SimulationStatus {
            running: false,
            feeds: state.metrics.feed_count(),
            message: "No simulation is running".into(),
        });
    }

    // Signal all workers to stop
    state.sim_running.store(false, Ordering::SeqCst);

    let mut guard = state.sim_handle.lock().await;
    if let Some(handle) = guard.take() {
        // Ignore JoinError — the task may have already finished
        let _ = handle.await;
    }
    info!("simulation stopped");

    Json(SimulationStatus {
        running: false,
        feeds: state.metrics.feed_count(),
        message: "Simulation stopped".into(),
    })
}

// ─── GET /api/simulation/status ──────────────────────────────────

pub async fn simulation_status(
    State(state): State<Arc<AppState>>,
) -> Json<SimulationStatus> {
    let running = state.sim_running.load(Ordering::SeqCst);
    Json(SimulationStatus {
        running,
        feeds: state.metrics.feed_count(),
        message: if running {
            "Simulation in progress".into()
        } else {
            "Idle".into()
        },
    })
}
