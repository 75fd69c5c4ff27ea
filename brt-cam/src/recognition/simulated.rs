//! Hash-simulation recognizer
//!
//! Stands in for a real engine in demos: proposes the same registry line
//! the resolver's hash fallback would pick for these bytes.

use super::{RecognitionInput, Recognizer, RecognizerFault};
use crate::resolver::simulate_line;
use async_trait::async_trait;
use brt_common::config::RecognizerKind;
use brt_common::LineRegistry;
use std::sync::Arc;

pub struct SimulatedRecognizer {
    registry: Arc<LineRegistry>,
}

impl SimulatedRecognizer {
    pub fn new(registry: Arc<LineRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Recognizer for SimulatedRecognizer {
    fn name(&self) -> &'static str {
        RecognizerKind::Simulated.as_str()
    }

    async fn recognize(&self, input: &RecognitionInput) -> Result<Vec<String>, RecognizerFault> {
        Ok(simulate_line(&input.image, &self.registry)
            .map(str::to_string)
            .into_iter()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_candidate_is_registry_line() {
        let registry = Arc::new(LineRegistry::builtin());
        let recognizer = SimulatedRecognizer::new(registry.clone());
        let candidates = recognizer
            .recognize(&RecognitionInput::new(b"frame-001".to_vec()))
            .await
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert!(registry.contains(&candidates[0]));
    }

    #[tokio::test]
    async fn test_empty_registry_abstains() {
        let recognizer = SimulatedRecognizer::new(Arc::new(LineRegistry::default()));
        let candidates = recognizer
            .recognize(&RecognitionInput::new(b"frame".to_vec()))
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }
}
