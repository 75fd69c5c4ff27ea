//! Ingestion orchestrator
//!
//! Per-request sequencing for uploads and manual registrations:
//!
//! ```text
//! ReceivedBytes -> (empty? Rejected "no image")
//!   -> RunRecognizers -> ResolveLine -> ComputePrediction (if resolved)
//!   -> PersistObservation -> Succeeded
//! ```
//!
//! The only side effect is the single store insert. Recognizer faults and
//! the recognition timeout are absorbed here and never reach the caller.
//!
//! The pipeline is an explicit context object: everything it uses is
//! handed to [`IngestionPipeline::new`] at startup.

use crate::prediction::Predictor;
use crate::recognition::{RecognitionInput, Recognizer};
use crate::resolver::{LineResolver, Resolution, ResolutionMethod};
use crate::store::ObservationStore;
use brt_common::{time, LineRegistry, Observation, ObservationSource, Prediction};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Rejection message for uploads without image bytes
pub const NO_IMAGE: &str = "no image";

/// Rejection message for manual registrations without a line
pub const LINE_REQUIRED: &str = "line required";

/// Why a request did not succeed
#[derive(Debug, Error)]
pub enum IngestError {
    /// Missing required input; nothing was persisted
    #[error("{0}")]
    Rejected(String),

    /// Store unreachable or write refused; the observation is lost
    #[error("persistence failure: {0}")]
    Persistence(#[from] brt_common::Error),
}

/// One image delivered by the upload boundary
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub image: Vec<u8>,
    pub origin_stop: Option<String>,
    pub destination_stop: Option<String>,
    pub line_override: Option<String>,
    pub filename: Option<String>,
    pub source: ObservationSource,
}

impl UploadRequest {
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            image,
            origin_stop: None,
            destination_stop: None,
            line_override: None,
            filename: None,
            source: ObservationSource::Upload,
        }
    }
}

/// What an accepted upload produced
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub observation_id: Uuid,
    pub line_id: Option<String>,
    pub display_name: String,
    pub prediction: Option<Prediction>,
    pub method: Option<ResolutionMethod>,
}

/// Line registered by hand
#[derive(Debug, Clone)]
pub struct ManualRegistration {
    pub line_id: String,
    pub origin_stop: Option<String>,
    pub destination_stop: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ManualReceipt {
    pub observation_id: Uuid,
    pub line_id: String,
    pub display_name: String,
    pub prediction: Prediction,
    /// Observations for this destination and line, this one included
    pub queue_position: u64,
}

/// Observations for one destination stop, oldest first
#[derive(Debug, Clone)]
pub struct StopPredictions {
    pub stop_id: String,
    pub observations: Vec<Observation>,
}

impl StopPredictions {
    pub fn total(&self) -> usize {
        self.observations.len()
    }
}

pub struct IngestionPipeline {
    registry: Arc<LineRegistry>,
    recognizers: Vec<Arc<dyn Recognizer>>,
    resolver: LineResolver,
    predictor: Predictor,
    store: Arc<dyn ObservationStore>,
    recognition_timeout: Duration,
}

impl IngestionPipeline {
    pub fn new(
        registry: Arc<LineRegistry>,
        recognizers: Vec<Arc<dyn Recognizer>>,
        predictor: Predictor,
        store: Arc<dyn ObservationStore>,
        recognition_timeout: Duration,
    ) -> Self {
        Self {
            resolver: LineResolver::new(registry.clone()),
            registry,
            recognizers,
            predictor,
            store,
            recognition_timeout,
        }
    }

    pub fn registry(&self) -> &LineRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn ObservationStore> {
        &self.store
    }

    pub fn strategy_name(&self) -> &'static str {
        self.predictor.strategy_name()
    }

    /// Each configured recognizer with whether its engine can start
    pub async fn recognizer_status(&self) -> Vec<(&'static str, bool)> {
        let mut status = Vec::with_capacity(self.recognizers.len());
        for recognizer in &self.recognizers {
            let available = recognizer.is_available().await;
            if !available {
                warn!(recognizer = recognizer.name(), "Recognizer engine unavailable");
            }
            status.push((recognizer.name(), available));
        }
        status
    }

    /// Whether the observation store answers a round trip
    pub async fn store_reachable(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                error!("Observation store unreachable: {}", e);
                false
            }
        }
    }

    /// Run one upload through recognition, resolution, prediction and storage
    pub async fn ingest(&self, request: UploadRequest) -> Result<UploadReceipt, IngestError> {
        if request.image.is_empty() {
            return Err(IngestError::Rejected(NO_IMAGE.to_string()));
        }

        let observed_at = time::now();
        let payload_size_bytes = request.image.len() as u64;
        let has_override = request
            .line_override
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());

        let input = RecognitionInput {
            image: request.image,
            filename: request.filename,
            line_override: request.line_override,
        };

        let candidates = if has_override {
            debug!("Line override present, skipping recognizers");
            Vec::new()
        } else {
            self.run_recognizers(&input).await
        };

        let Resolution { line, method } =
            self.resolver
                .resolve(&candidates, input.line_override.as_deref(), &input.image);

        let observation = match line.line_id() {
            Some(line_id) => {
                let prediction = self.predictor.predict_at(line_id, observed_at);
                Observation::resolved(
                    observed_at,
                    request.origin_stop,
                    request.destination_stop,
                    prediction,
                    self.registry.display_name(line_id),
                    payload_size_bytes,
                    request.source,
                )
            }
            None => Observation::unresolved(
                observed_at,
                request.origin_stop,
                request.destination_stop,
                payload_size_bytes,
                request.source,
            ),
        };

        let observation_id = self.persist(&observation).await?;

        info!(
            id = %observation_id,
            line = observation.line_id.as_deref().unwrap_or("-"),
            eta_minutes = observation.prediction.as_ref().map(|p| p.eta_minutes),
            method = ?method,
            source = %observation.source,
            bytes = payload_size_bytes,
            "Observation recorded"
        );

        Ok(UploadReceipt {
            observation_id,
            line_id: observation.line_id,
            display_name: observation.display_name,
            prediction: observation.prediction,
            method,
        })
    }

    /// Record a line reported by hand, bypassing recognition
    pub async fn register_manual(
        &self,
        registration: ManualRegistration,
    ) -> Result<ManualReceipt, IngestError> {
        let line_id = registration.line_id.trim();
        if line_id.is_empty() {
            return Err(IngestError::Rejected(LINE_REQUIRED.to_string()));
        }

        let observed_at = time::now();
        let prediction = self.predictor.predict_at(line_id, observed_at);
        let display_name = self.registry.display_name(line_id).to_string();
        let observation = Observation::resolved(
            observed_at,
            registration.origin_stop,
            registration.destination_stop,
            prediction.clone(),
            display_name.clone(),
            0,
            ObservationSource::Manual,
        );

        let observation_id = self.persist(&observation).await?;
        let queue_position = self
            .store
            .count_matching(observation.destination_stop.as_deref(), line_id)
            .await?;

        info!(
            id = %observation_id,
            line = line_id,
            eta_minutes = prediction.eta_minutes,
            queue_position,
            "Manual detection recorded"
        );

        Ok(ManualReceipt {
            observation_id,
            line_id: line_id.to_string(),
            display_name,
            prediction,
            queue_position,
        })
    }

    /// Most recent observations, newest first
    pub async fn recent(&self, limit: u32) -> Result<Vec<Observation>, IngestError> {
        Ok(self.store.find_recent(limit).await?)
    }

    /// Observations heading to `stop_id`, oldest first
    pub async fn stop_predictions(&self, stop_id: &str) -> Result<StopPredictions, IngestError> {
        let observations = self.store.find_by_destination_stop(stop_id).await?;
        Ok(StopPredictions {
            stop_id: stop_id.to_string(),
            observations,
        })
    }

    /// Run every recognizer in order under one shared time budget
    ///
    /// A faulting recognizer contributes nothing; the others still count.
    /// Running out of time discards everything gathered so far.
    async fn run_recognizers(&self, input: &RecognitionInput) -> Vec<String> {
        let gather = async {
            let mut candidates = Vec::new();
            for recognizer in &self.recognizers {
                match recognizer.recognize(input).await {
                    Ok(found) => {
                        debug!(recognizer = recognizer.name(), ?found, "Recognizer candidates");
                        candidates.extend(found);
                    }
                    Err(fault) => {
                        warn!(recognizer = recognizer.name(), "Recognizer abstained: {}", fault);
                    }
                }
            }
            candidates
        };

        match tokio::time::timeout(self.recognition_timeout, gather).await {
            Ok(candidates) => candidates,
            Err(_) => {
                warn!(
                    timeout_ms = self.recognition_timeout.as_millis() as u64,
                    "Recognition timed out, treating as abstained"
                );
                Vec::new()
            }
        }
    }

    async fn persist(&self, observation: &Observation) -> Result<Uuid, IngestError> {
        self.store.insert(observation).await.map_err(|e| {
            error!("Failed to persist observation: {}", e);
            IngestError::Persistence(e)
        })
    }
}
