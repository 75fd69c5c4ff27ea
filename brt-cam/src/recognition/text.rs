//! Text recognition (OCR) recognizer
//!
//! Runs an OCR program restricted to digits and turns everything it read
//! into a single candidate made of all digit runs, in reading order.

use super::{program_available, run_with_stdin, RecognitionInput, Recognizer, RecognizerFault};
use async_trait::async_trait;
use brt_common::config::RecognizerKind;
use tracing::debug;

/// Tesseract arguments: image on stdin, text on stdout, single block, digits only
const TESSERACT_ARGS: &[&str] = &[
    "stdin",
    "stdout",
    "--psm",
    "6",
    "-c",
    "tessedit_char_whitelist=0123456789",
];

const VERSION_ARG: &str = "--version";

pub struct TextRecognizer {
    program: String,
    args: Vec<String>,
}

impl TextRecognizer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Tesseract invocation reading digits only
    pub fn tesseract(program: &str) -> Self {
        Self::new(
            program,
            TESSERACT_ARGS.iter().map(|a| a.to_string()).collect(),
        )
    }
}

#[async_trait]
impl Recognizer for TextRecognizer {
    fn name(&self) -> &'static str {
        RecognizerKind::Text.as_str()
    }

    /// Emits at most one candidate
    async fn recognize(&self, input: &RecognitionInput) -> Result<Vec<String>, RecognizerFault> {
        let stdout = run_with_stdin(&self.program, &self.args, &input.image).await?;
        let text = String::from_utf8_lossy(&stdout);
        let digits = digits_in_text(&text);
        debug!(raw = %text.trim(), digits = %digits, "OCR output");

        if digits.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(vec![digits])
        }
    }

    async fn is_available(&self) -> bool {
        program_available(&self.program, &[VERSION_ARG.to_string()]).await
    }
}

/// Concatenate every ASCII digit in `text`
pub fn digits_in_text(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}
