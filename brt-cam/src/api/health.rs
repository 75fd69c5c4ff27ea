//! Service root, health check and line listing

use axum::{extract::State, routing::get, Json, Router};
use brt_common::config::RecognizerKind;
use brt_common::LineEntry;
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub service: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct RecognizerStatus {
    pub name: String,
    pub available: bool,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" when the store or a recognizer engine is down
    pub status: String,
    pub module: String,
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Configured recognizers, in run order
    pub recognizers: Vec<RecognizerStatus>,
    /// Text recognizer engine state; null when none is configured
    pub ocr_available: Option<bool>,
    pub database_connected: bool,
    /// Prediction strategy in use ("fixed" or "route")
    pub strategy: String,
    pub registry_size: usize,
}

/// GET /
pub async fn service_root() -> Json<RootResponse> {
    Json(RootResponse {
        service: "BRT webcam line detection".to_string(),
        status: "running".to_string(),
    })
}

/// GET /health
///
/// Starts each recognizer engine once and pings the store.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let pipeline = &state.pipeline;

    let recognizers: Vec<RecognizerStatus> = pipeline
        .recognizer_status()
        .await
        .into_iter()
        .map(|(name, available)| RecognizerStatus {
            name: name.to_string(),
            available,
        })
        .collect();
    let ocr_available = recognizers
        .iter()
        .filter(|r| r.name == RecognizerKind::Text.as_str())
        .map(|r| r.available)
        .reduce(|a, b| a && b);
    let database_connected = pipeline.store_reachable().await;

    let healthy = database_connected && recognizers.iter().all(|r| r.available);

    Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        module: "brt-cam".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
        recognizers,
        ocr_available,
        database_connected,
        strategy: pipeline.strategy_name().to_string(),
        registry_size: pipeline.registry().len(),
    })
}

/// GET /lines
///
/// Known lines in registry order.
pub async fn list_lines(State(state): State<AppState>) -> Json<Vec<LineEntry>> {
    Json(state.pipeline.registry().entries().to_vec())
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(service_root))
        .route("/health", get(health_check))
}
