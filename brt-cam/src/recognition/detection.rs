//! Object-detection recognizer (presence only)
//!
//! Runs a detector program that prints a JSON array of
//! `{"label": "...", "confidence": 0.0..1.0}` objects. It reports whether a
//! transit vehicle is in frame but never identifies a line, so it always
//! emits zero candidates.

use super::{program_available, run_with_stdin, RecognitionInput, Recognizer, RecognizerFault};
use async_trait::async_trait;
use brt_common::config::RecognizerKind;
use serde::Deserialize;
use tracing::info;

/// One detected object
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
}

pub struct DetectionRecognizer {
    program: Option<String>,
    args: Vec<String>,
    labels: Vec<String>,
    min_confidence: f32,
}

impl DetectionRecognizer {
    pub fn new(
        program: Option<String>,
        args: Vec<String>,
        labels: Vec<String>,
        min_confidence: f32,
    ) -> Self {
        Self {
            program,
            args,
            labels,
            min_confidence,
        }
    }

    /// Run the detector and return the detections it reported
    pub async fn detect(&self, image: &[u8]) -> Result<Vec<Detection>, RecognizerFault> {
        let program = self.program.as_deref().ok_or_else(|| {
            RecognizerFault::Unavailable("no detector command configured".to_string())
        })?;

        let stdout = run_with_stdin(program, &self.args, image).await?;
        serde_json::from_slice(&stdout)
            .map_err(|e| RecognizerFault::Failed(format!("unreadable detector output: {}", e)))
    }

    /// Number of detections that count as a transit vehicle
    pub fn vehicles_in(&self, detections: &[Detection]) -> usize {
        detections
            .iter()
            .filter(|d| d.confidence >= self.min_confidence)
            .filter(|d| self.labels.iter().any(|l| l.eq_ignore_ascii_case(&d.label)))
            .count()
    }
}

#[async_trait]
impl Recognizer for DetectionRecognizer {
    fn name(&self) -> &'static str {
        RecognizerKind::Detection.as_str()
    }

    async fn recognize(&self, input: &RecognitionInput) -> Result<Vec<String>, RecognizerFault> {
        let detections = self.detect(&input.image).await?;
        let vehicles = self.vehicles_in(&detections);
        info!(
            vehicles,
            objects = detections.len(),
            present = vehicles > 0,
            "Vehicle presence check"
        );
        Ok(Vec::new())
    }

    async fn is_available(&self) -> bool {
        match self.program.as_deref() {
            Some(program) => program_available(program, &self.args).await,
            None => false,
        }
    }
}
