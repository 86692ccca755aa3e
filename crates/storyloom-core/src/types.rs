//! Value objects passed between pipeline stages.
//!
//! Each is produced by exactly one component and read-only afterwards.

use serde::{Deserialize, Serialize};

use crate::intake::ImageSet;
use crate::story::{Genre, WordLimit};

/// Everything the user submitted for one story.
#[derive(Debug, Clone, Default)]
pub struct StoryRequest {
    /// Optional free-text context
    pub context: Option<String>,
    /// Ordered images, already clamped to the configured maximum
    pub images: ImageSet,
    /// Requested genre (may still be `Random`)
    pub genre: Genre,
    /// Advisory story length
    pub word_limit: WordLimit,
}

impl StoryRequest {
    /// Context text if it contains anything besides whitespace.
    pub fn context_text(&self) -> Option<&str> {
        self.context
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Verdict on whether the context text is usable story direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptEvaluation {
    pub is_valid: bool,
    pub reason: String,
}

impl PromptEvaluation {
    pub fn valid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            reason: reason.into(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: reason.into(),
        }
    }
}

/// Outcome of story generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum StoryResult {
    /// Trimmed story text
    Success(String),
    /// Human-readable failure message
    Failure(String),
}

impl StoryResult {
    pub fn succeeded(&self) -> bool {
        matches!(self, StoryResult::Success(_))
    }

    /// The story on success, the failure message otherwise.
    pub fn text_or_error(&self) -> &str {
        match self {
            StoryResult::Success(text) | StoryResult::Failure(text) => text,
        }
    }
}

/// Outcome of narration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioResult {
    /// WAV-encoded waveform
    Success(Vec<u8>),
    /// Human-readable failure message
    Failure(String),
}

impl AudioResult {
    pub fn succeeded(&self) -> bool {
        matches!(self, AudioResult::Success(_))
    }

    pub fn audio(&self) -> Option<&[u8]> {
        match self {
            AudioResult::Success(bytes) => Some(bytes),
            AudioResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AudioResult::Success(_) => None,
            AudioResult::Failure(message) => Some(message),
        }
    }
}
