//! Recent observations and per-stop predictions
//!
//! Read-only views over the observation store.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use brt_common::{Observation, ObservationSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Wire form of a stored observation
#[derive(Debug, Serialize, Deserialize)]
pub struct ObservationView {
    pub id: Uuid,
    pub observed_at: DateTime<Utc>,
    pub origin_stop: Option<String>,
    pub destination_stop: Option<String>,
    pub line: Option<String>,
    pub display_name: String,
    pub eta_minutes: Option<u32>,
    pub arrival_at: Option<DateTime<Utc>>,
    pub payload_size_bytes: u64,
    pub source: ObservationSource,
}

impl From<Observation> for ObservationView {
    fn from(observation: Observation) -> Self {
        let (eta_minutes, arrival_at) = match &observation.prediction {
            Some(p) => (Some(p.eta_minutes), Some(p.arrival_at)),
            None => (None, None),
        };

        Self {
            id: observation.id,
            observed_at: observation.observed_at,
            origin_stop: observation.origin_stop,
            destination_stop: observation.destination_stop,
            line: observation.line_id,
            display_name: observation.display_name,
            eta_minutes,
            arrival_at,
            payload_size_bytes: observation.payload_size_bytes,
            source: observation.source,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct StopPredictionsResponse {
    pub stop: String,
    pub total: usize,
    pub predictions: Vec<ObservationView>,
}

/// GET /observations/recent?limit=N
///
/// Newest first. Missing limit uses the configured default; any value is
/// clamped to `1..=recent_max_limit`.
pub async fn recent_observations(
    State(state): State<AppState>,
    query: Result<Query<RecentQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ObservationView>>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let limit = effective_limit(
        query.limit,
        state.http.recent_default_limit,
        state.http.recent_max_limit,
    );

    let observations = state.pipeline.recent(limit).await?;
    Ok(Json(observations.into_iter().map(ObservationView::from).collect()))
}

/// GET /predictions/:stop
///
/// Oldest first, with the total count.
pub async fn stop_predictions(
    State(state): State<AppState>,
    Path(stop): Path<String>,
) -> ApiResult<Json<StopPredictionsResponse>> {
    let result = state.pipeline.stop_predictions(&stop).await?;

    Ok(Json(StopPredictionsResponse {
        total: result.total(),
        stop: result.stop_id,
        predictions: result
            .observations
            .into_iter()
            .map(ObservationView::from)
            .collect(),
    }))
}

fn effective_limit(requested: Option<u32>, default: u32, max: u32) -> u32 {
    let max = max.max(1);
    requested.unwrap_or(default).clamp(1, max)
}
