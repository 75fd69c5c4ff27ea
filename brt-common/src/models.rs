//! Observation and prediction models
//!
//! An [`Observation`] is written exactly once per ingestion or manual
//! registration and never updated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::registry::UNKNOWN_LINE_NAME;
use crate::Error;

/// Arrival estimate for a resolved line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub line_id: String,
    pub eta_minutes: u32,
    pub arrival_at: DateTime<Utc>,
}

impl Prediction {
    /// Prediction made at `now`: arrival is exactly `eta_minutes` later
    pub fn starting_at(line_id: impl Into<String>, eta_minutes: u32, now: DateTime<Utc>) -> Self {
        Self {
            line_id: line_id.into(),
            eta_minutes,
            arrival_at: now + chrono::Duration::minutes(i64::from(eta_minutes)),
        }
    }
}

/// Where an observation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationSource {
    /// Image posted by a capture point
    Upload,
    /// Line registered by hand, no image
    Manual,
    /// Image posted by the webcam replay tool
    SimulatedReplay,
}

impl ObservationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationSource::Upload => "upload",
            ObservationSource::Manual => "manual",
            ObservationSource::SimulatedReplay => "simulated_replay",
        }
    }
}

impl fmt::Display for ObservationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObservationSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upload" => Ok(ObservationSource::Upload),
            "manual" => Ok(ObservationSource::Manual),
            "simulated_replay" | "replay" => Ok(ObservationSource::SimulatedReplay),
            other => Err(Error::InvalidInput(format!(
                "Unknown observation source: {}",
                other
            ))),
        }
    }
}

/// Persisted ingestion or manual-registration event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub id: Uuid,
    pub observed_at: DateTime<Utc>,
    pub origin_stop: Option<String>,
    pub destination_stop: Option<String>,
    pub line_id: Option<String>,
    pub display_name: String,
    pub prediction: Option<Prediction>,
    pub payload_size_bytes: u64,
    pub source: ObservationSource,
}

impl Observation {
    /// Observation for a resolved line
    ///
    /// The line id is taken from the prediction so the two cannot disagree.
    pub fn resolved(
        observed_at: DateTime<Utc>,
        origin_stop: Option<String>,
        destination_stop: Option<String>,
        prediction: Prediction,
        display_name: impl Into<String>,
        payload_size_bytes: u64,
        source: ObservationSource,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            observed_at,
            origin_stop: normalize_stop(origin_stop),
            destination_stop: normalize_stop(destination_stop),
            line_id: Some(prediction.line_id.clone()),
            display_name: display_name.into(),
            prediction: Some(prediction),
            payload_size_bytes,
            source,
        }
    }

    /// Observation where no line could be resolved
    pub fn unresolved(
        observed_at: DateTime<Utc>,
        origin_stop: Option<String>,
        destination_stop: Option<String>,
        payload_size_bytes: u64,
        source: ObservationSource,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            observed_at,
            origin_stop: normalize_stop(origin_stop),
            destination_stop: normalize_stop(destination_stop),
            line_id: None,
            display_name: UNKNOWN_LINE_NAME.to_string(),
            prediction: None,
            payload_size_bytes,
            source,
        }
    }
}

/// Trim a stop id, mapping blank values to `None`
pub fn normalize_stop(stop: Option<String>) -> Option<String> {
    stop.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
