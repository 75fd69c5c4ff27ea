//! Recognizer capability
//!
//! A recognizer inspects raw image bytes (plus optional hints) and proposes
//! zero or more candidate line identifiers. Candidates are unvalidated
//! strings; the [`crate::resolver`] decides what they mean.
//!
//! Variants:
//! - [`TextRecognizer`]: OCR via an external program
//! - [`DetectionRecognizer`]: object detection, presence only (no candidates)
//! - [`FilenameRecognizer`]: digits in the uploaded file name
//! - [`SimulatedRecognizer`]: deterministic choice from the image hash
//!
//! A recognizer that cannot run returns a [`RecognizerFault`]. The ingestion
//! pipeline treats every fault as "recognizer abstained".

use async_trait::async_trait;
use brt_common::config::{RecognitionConfig, RecognizerKind};
use brt_common::LineRegistry;
use std::sync::Arc;
use thiserror::Error;

mod command;
mod detection;
mod filename;
mod simulated;
mod text;

pub use command::{program_available, run_with_stdin};
pub use detection::{Detection, DetectionRecognizer};
pub use filename::{digits_in_filename, FilenameRecognizer};
pub use simulated::SimulatedRecognizer;
pub use text::{digits_in_text, TextRecognizer};

/// Everything a recognizer may look at for one upload
#[derive(Debug, Clone, Default)]
pub struct RecognitionInput {
    pub image: Vec<u8>,
    pub filename: Option<String>,
    pub line_override: Option<String>,
}

impl RecognitionInput {
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            image,
            ..Self::default()
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Why a recognizer produced nothing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecognizerFault {
    /// Backing engine missing or not configured
    #[error("recognizer unavailable: {0}")]
    Unavailable(String),

    /// Engine ran and failed
    #[error("recognizer failed: {0}")]
    Failed(String),
}

/// Pluggable line recognizer
///
/// Candidate order is emission order. Implementations document whether it
/// reflects confidence; callers must not assume so otherwise.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Short identifier used in logs and health output
    fn name(&self) -> &'static str;

    async fn recognize(&self, input: &RecognitionInput) -> Result<Vec<String>, RecognizerFault>;

    /// Whether the backing engine can be started
    ///
    /// Recognizers with no external engine are always available.
    async fn is_available(&self) -> bool {
        true
    }
}

/// Build the configured recognizers in configuration order
pub fn build_recognizers(
    config: &RecognitionConfig,
    registry: Arc<LineRegistry>,
) -> Vec<Arc<dyn Recognizer>> {
    config
        .recognizers
        .iter()
        .map(|kind| -> Arc<dyn Recognizer> {
            match kind {
                RecognizerKind::Text => Arc::new(TextRecognizer::tesseract(&config.tesseract_command)),
                RecognizerKind::Detection => Arc::new(DetectionRecognizer::new(
                    config.detector_command.clone(),
                    config.detector_args.clone(),
                    config.detector_labels.clone(),
                    config.detector_min_confidence,
                )),
                RecognizerKind::Filename => Arc::new(FilenameRecognizer),
                RecognizerKind::Simulated => Arc::new(SimulatedRecognizer::new(registry.clone())),
            }
        })
        .collect()
}
