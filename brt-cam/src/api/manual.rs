//! Manual line registration

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::pipeline::ManualRegistration;
use crate::AppState;

/// Request body; the Portuguese field names are accepted too
#[derive(Debug, Default, Deserialize)]
pub struct ManualRequest {
    #[serde(default, alias = "linha")]
    pub line: Option<String>,
    #[serde(default, alias = "parada_origem")]
    pub origin_stop: Option<String>,
    #[serde(default, alias = "parada_destino")]
    pub destination_stop: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ManualResponse {
    pub status: String,
    pub id: Uuid,
    pub line: String,
    pub display_name: String,
    pub eta_minutes: u32,
    pub arrival_at: DateTime<Utc>,
    /// Observations for this destination and line, this one included
    pub queue_position: u64,
}

/// POST /detections/manual
pub async fn register_manual(
    State(state): State<AppState>,
    body: Result<Json<ManualRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ManualResponse>)> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let receipt = state
        .pipeline
        .register_manual(ManualRegistration {
            line_id: request.line.unwrap_or_default(),
            origin_stop: request.origin_stop,
            destination_stop: request.destination_stop,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ManualResponse {
            status: "registered".to_string(),
            id: receipt.observation_id,
            line: receipt.line_id,
            display_name: receipt.display_name,
            eta_minutes: receipt.prediction.eta_minutes,
            arrival_at: receipt.prediction.arrival_at,
            queue_position: receipt.queue_position,
        }),
    ))
}
