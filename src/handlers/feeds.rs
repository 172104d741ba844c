use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::metrics::FeedMetrics;
use crate::AppState;

use super::AppError;

// ─── Request types ───────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterFeed {
    /// Generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageReceived {
    /// Raw payload length in bytes, as reported by the reader
    pub payload_size: i64,
}

// ─── POST /api/feeds ─────────────────────────────────────────────

pub async fn register_feed(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterFeed>,
) -> Result<(StatusCode, Json<FeedMetrics>), AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }

    let id = match req.id {
        Some(id) if !id.trim().is_empty() => id.trim().to_owned(),
        _ => Uuid::new_v4().to_string(),
    };

    state.metrics.init_feed(&id, name);
    let metrics = lookup(&state, &id)?;
    Ok((StatusCode::CREATED, Json(metrics)))
}

// ─── GET /api/feeds/:id ──────────────────────────────────────────
/// Read-only view of one feed; does not advance the trend histories.

pub async fn get_feed(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FeedMetrics>, AppError> {
    lookup(&state, &id).map(Json)
}

// ─── POST /api/feeds/:id/messages ────────────────────────────────

pub async fn record_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<MessageReceived>,
) -> Result<Json<FeedMetrics>, AppError> {
    // The engine ignores unknown feeds silently; the API tells the caller
    if !state.metrics.contains(&id) {
        return Err(not_found(&id));
    }
    state.metrics.record_message(&id, req.payload_size);
    lookup(&state, &id).map(Json)
}

fn lookup(state: &AppState, id: &str) -> Result<FeedMetrics, AppError> {
    state.metrics.feed_snapshot(id).ok_or_else(|| not_found(id))
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Feed {id} not found"))
}
