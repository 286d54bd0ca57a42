use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use serde::Serialize;
use std::sync::OnceLock;
use std::time::Instant;

use crate::AppState;

/// Tracks application start time for uptime calculation
static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Initialize the start time (call this on application startup)
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

/// Liveness response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub store_backend: String,
    pub feed_observers: usize,
}

/// Liveness probe. Never touches the record stores.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let uptime_secs = START_TIME
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
        uptime_secs,
        store_backend: state.config.store_backend.to_string(),
        feed_observers: state.feed.observer_count(),
    })
}
