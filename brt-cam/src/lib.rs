//! brt-cam library - BRT webcam line detection and arrival prediction
//!
//! Capture points upload still images; each image is run through the
//! configured recognizers, resolved to a transit line, given an arrival
//! estimate and stored as an observation.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use brt_common::config::HttpConfig;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod pipeline;
pub mod prediction;
pub mod recognition;
pub mod resolver;
pub mod retention;
pub mod store;

pub use error::{ApiError, ApiResult};
pub use pipeline::IngestionPipeline;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub http: HttpConfig,
    /// Window used by the manual retention trigger
    pub retention_window: Duration,
    /// Service startup time (for uptime)
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(pipeline: Arc<IngestionPipeline>, http: HttpConfig, retention_window: Duration) -> Self {
        Self {
            pipeline,
            http,
            retention_window,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// The Portuguese paths are kept as aliases for existing capture clients.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let body_limit = state.http.max_upload_bytes;

    let routes = Router::new()
        .route("/lines", get(api::list_lines))
        .route("/upload", post(api::upload_image))
        .route("/detections/manual", post(api::register_manual))
        .route("/deteccao/manual", post(api::register_manual))
        .route("/observations/recent", get(api::recent_observations))
        .route("/ultimos", get(api::recent_observations))
        .route("/predictions/:stop", get(api::stop_predictions))
        .route("/previsoes/:stop", get(api::stop_predictions))
        .route("/maintenance/retention", post(api::run_retention));

    Router::new()
        .merge(routes)
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
