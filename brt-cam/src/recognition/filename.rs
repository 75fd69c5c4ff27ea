//! Filename-heuristic recognizer
//!
//! Capture scripts name frames after the line they show (`bus_644.jpg`).
//! All digits of the file name, joined, form the single candidate.

use super::{RecognitionInput, Recognizer, RecognizerFault};
use async_trait::async_trait;
use brt_common::config::RecognizerKind;

pub struct FilenameRecognizer;

#[async_trait]
impl Recognizer for FilenameRecognizer {
    fn name(&self) -> &'static str {
        RecognizerKind::Filename.as_str()
    }

    async fn recognize(&self, input: &RecognitionInput) -> Result<Vec<String>, RecognizerFault> {
        Ok(input
            .filename
            .as_deref()
            .and_then(digits_in_filename)
            .into_iter()
            .collect())
    }
}

/// Digits of `filename` in order, or `None` when it has none
pub fn digits_in_filename(filename: &str) -> Option<String> {
    let digits: String = filename.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_in_filename() {
        assert_eq!(digits_in_filename("onibus_644.jpg"), Some("644".to_string()));
        assert_eq!(digits_in_filename("2441-cdu.png"), Some("2441".to_string()));
        assert_eq!(digits_in_filename("frame.jpg"), None);
    }

    #[tokio::test]
    async fn test_recognize_with_and_without_filename() {
        let with_name = RecognitionInput::new(vec![0]).with_filename("linha_437.jpg");
        assert_eq!(
            FilenameRecognizer.recognize(&with_name).await.unwrap(),
            vec!["437".to_string()]
        );

        let without = RecognitionInput::new(vec![0]);
        assert!(FilenameRecognizer.recognize(&without).await.unwrap().is_empty());
    }
}
