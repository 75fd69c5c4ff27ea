//! Image upload
//!
//! `multipart/form-data` fields:
//! - `image` (alias `imagem`): the file; its name is passed to recognizers
//! - `origin_stop` (alias `parada_origem`)
//! - `destination_stop` (alias `parada_destino`)
//! - `line_override` (alias `simulate_line`)
//! - `source`: `upload` (default) or `replay`
//!
//! Unknown fields are ignored. A body over `http.max_upload_bytes` is
//! answered with 413.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use brt_common::ObservationSource;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::pipeline::UploadRequest;
use crate::resolver::ResolutionMethod;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PredictionView {
    pub eta_minutes: u32,
    pub arrival_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: String,
    pub id: Uuid,
    pub line: Option<String>,
    pub display_name: String,
    pub prediction: Option<PredictionView>,
    /// How the line was decided; absent when unresolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ResolutionMethod>,
}

/// POST /upload
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let request = read_upload(multipart).await?;
    let receipt = state.pipeline.ingest(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            status: "processed".to_string(),
            id: receipt.observation_id,
            line: receipt.line_id,
            display_name: receipt.display_name,
            prediction: receipt.prediction.map(|p| PredictionView {
                eta_minutes: p.eta_minutes,
                arrival_at: p.arrival_at,
            }),
            method: receipt.method,
        }),
    ))
}

async fn read_upload(mut multipart: Multipart) -> ApiResult<UploadRequest> {
    let mut request = UploadRequest::new(Vec::new());

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" | "imagem" => {
                request.filename = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                request.image = bytes.to_vec();
            }
            "origin_stop" | "parada_origem" => {
                request.origin_stop = Some(field_text(field).await?);
            }
            "destination_stop" | "parada_destino" => {
                request.destination_stop = Some(field_text(field).await?);
            }
            "line_override" | "simulate_line" => {
                request.line_override = Some(field_text(field).await?);
            }
            "source" => {
                request.source = parse_source(&field_text(field).await?)?;
            }
            other => debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    Ok(request)
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> ApiResult<String> {
    Ok(field.text().await?)
}

/// Upload sources; manual registrations have their own route
fn parse_source(raw: &str) -> ApiResult<ObservationSource> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(ObservationSource::Upload);
    }
    match trimmed.parse::<ObservationSource>() {
        Ok(ObservationSource::Manual) | Err(_) => Err(ApiError::BadRequest(format!(
            "Unsupported upload source: {}",
            trimmed
        ))),
        Ok(source) => Ok(source),
    }
}
