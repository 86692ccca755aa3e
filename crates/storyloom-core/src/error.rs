//! Error types for the Storyloom pipeline.
//!
//! Errors are organized by concern: configuration, image intake, and the
//! story pipeline itself. Provider-specific failures (HTTP status codes,
//! transport errors, malformed bodies) are normalized into [`StoryError`]
//! inside each adapter, so no backend-specific type leaks past it.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Storyloom operations.
#[derive(Error, Debug)]
pub enum StoryloomError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Image or form input errors
    #[error("Input error: {0}")]
    Intake(#[from] IntakeError),

    /// Pipeline stage errors
    #[error("Pipeline error: {0}")]
    Story(#[from] StoryError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// A backend was selected but its credentials are missing
    #[error("{backend} API key not set. Set {env_var} env var.")]
    MissingApiKey {
        backend: &'static str,
        env_var: &'static str,
    },
}

/// Errors raised while accepting user input (images, genre, word limit).
#[derive(Error, Debug)]
pub enum IntakeError {
    /// File could not be read
    #[error("Cannot read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    /// File is not a PNG or JPEG image
    #[error("Unsupported image format for {name}: only PNG, JPG, and JPEG are allowed")]
    UnsupportedFormat { name: String },

    /// Image exceeds the configured per-file size limit
    #[error("Image too large: {name} ({size_mb}MB > {max_mb}MB)")]
    TooLarge {
        name: String,
        size_mb: u64,
        max_mb: u64,
    },

    /// Word limit outside the allowed set
    #[error("Invalid word limit {0}: choose one of 50, 100, 150, 200, 250, 300")]
    InvalidWordLimit(u32),
}

/// Failures of a single pipeline stage or provider call.
///
/// Each component converts these into its result value object at its
/// boundary; the orchestrator only ever sees human-readable messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoryError {
    /// Context text was empty or whitespace-only
    #[error("Empty prompt")]
    EmptyInput,

    /// Story generation attempted without any images
    #[error("no images provided")]
    NoImagesProvided,

    /// Text/vision backend reported exhausted quota
    #[error("AI quota exceeded")]
    UpstreamQuotaExceeded,

    /// Speech backend reported rate limiting
    #[error("rate limit exceeded")]
    UpstreamRateLimited,

    /// Any other upstream failure
    #[error("{message}")]
    Upstream {
        message: String,
        status_code: Option<u16>,
    },

    /// Structured-output decoding failed
    #[error("could not parse model output: {0}")]
    Parse(String),

    /// Local speech engine failed
    #[error("local synthesis failed: {0}")]
    LocalSynthesis(String),

    /// Request exceeds what the backend accepts
    #[error("{0}")]
    ImageLimit(String),

    /// Local model asset could not be acquired or verified
    #[error("speech asset error: {0}")]
    Asset(String),
}

impl StoryError {
    /// Shorthand for an upstream failure without a status code.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            status_code: None,
        }
    }
}

/// Convenience type alias for Storyloom results.
pub type Result<T> = std::result::Result<T, StoryloomError>;
