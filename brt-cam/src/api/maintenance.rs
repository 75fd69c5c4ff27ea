//! Manual retention trigger

use axum::{extract::State, Json};
use brt_common::time;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ApiResult;
use crate::retention;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RetentionResponse {
    pub deleted: u64,
    pub cutoff: DateTime<Utc>,
}

/// POST /maintenance/retention
///
/// Runs one sweep now with the configured window.
pub async fn run_retention(State(state): State<AppState>) -> ApiResult<Json<RetentionResponse>> {
    let now = time::now();
    let cutoff = retention::cutoff_for(state.retention_window, now)?;
    let deleted =
        retention::sweep(state.pipeline.store().as_ref(), state.retention_window, now).await?;

    Ok(Json(RetentionResponse { deleted, cutoff }))
}
