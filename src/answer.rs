//! Question and answer values for one compare cycle

use serde::{Serialize, Serializer};
use std::time::Duration;

use crate::error::{CompareError, ProviderError};
use crate::llm::Source;

/// A validated, non-blank user question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question(String);

impl Question {
    pub fn new(text: &str) -> Result<Self, CompareError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(CompareError::EmptyQuestion);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One provider's reply to the question.
#[derive(Debug, Clone)]
pub struct RawAnswer {
    pub source: Source,
    pub outcome: Result<String, ProviderError>,
    pub elapsed: Duration,
}

impl RawAnswer {
    pub fn new(source: Source, outcome: Result<String, ProviderError>, elapsed: Duration) -> Self {
        Self {
            source,
            outcome,
            elapsed,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }

    pub fn error(&self) -> Option<&ProviderError> {
        self.outcome.as_ref().err()
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Text shown to the user and embedded in the synthesis prompt;
    /// failures render as `[<Source> Error] <details>`.
    pub fn display_text(&self) -> String {
        match &self.outcome {
            Ok(text) => text.clone(),
            Err(e) => format!("[{} Error] {}", self.source, e),
        }
    }
}

/// The synthesized answer written by the designated provider.
#[derive(Debug, Clone)]
pub struct MergedAnswer {
    pub synthesizer: Source,
    pub outcome: Result<String, ProviderError>,
}

impl MergedAnswer {
    pub fn text(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }

    pub fn display_text(&self) -> String {
        match &self.outcome {
            Ok(text) => text.clone(),
            Err(e) => format!("[Final Answer Error] {}", e),
        }
    }
}

#[derive(Serialize)]
struct AnswerView<'a> {
    source: Source,
    text: Option<&'a str>,
    error: Option<String>,
    elapsed_ms: u64,
}

impl Serialize for RawAnswer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        AnswerView {
            source: self.source,
            text: self.text(),
            error: self.error().map(ToString::to_string),
            elapsed_ms: self.elapsed.as_millis() as u64,
        }
        .serialize(serializer)
    }
}

#[derive(Serialize)]
struct MergedView<'a> {
    synthesizer: Source,
    text: Option<&'a str>,
    error: Option<String>,
}

impl Serialize for MergedAnswer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        MergedView {
            synthesizer: self.synthesizer,
            text: self.text(),
            error: self.outcome.as_ref().err().map(ToString::to_string),
        }
        .serialize(serializer)
    }
}
