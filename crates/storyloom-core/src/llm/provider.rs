//! Text/vision provider trait and request/response types.
//!
//! Defines the interface every text/vision backend implements, plus the
//! factory that builds the configured backend.

use crate::config::{Config, TextBackend};
use crate::error::{ConfigError, StoryError};
use crate::intake::ImageUpload;
use async_trait::async_trait;
use base64::Engine;
use std::time::Duration;

/// Base64-encoded image ready to send to a provider.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type ("image/jpeg" or "image/png")
    pub media_type: String,
}

impl ImageInput {
    /// Encode an accepted upload.
    pub fn from_upload(upload: &ImageUpload) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(&upload.bytes),
            media_type: upload.kind.media_type().to_string(),
        }
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }

    /// Decode back to raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.data)
    }
}

/// Shape the model is asked to answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// A single JSON object
    Json,
}

/// One call to a text/vision model.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// System instruction
    pub system: Option<String>,
    /// User text, sent before the images
    pub prompt: String,
    /// Images in upload order
    pub images: Vec<ImageInput>,
    /// Requested response shape
    pub response_format: ResponseFormat,
    /// Output token cap; `None` leaves it to the backend
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: f32,
}

impl LlmRequest {
    /// Total size of the base64 image payload in bytes.
    pub fn encoded_image_bytes(&self) -> usize {
        self.images.iter().map(|i| i.data.len()).sum()
    }
}

/// The response from a text/vision call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text, trimmed
    pub text: String,
    /// Model identifier used
    pub model: String,
    /// Number of tokens used (input + output), if reported
    pub tokens_used: Option<u32>,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// What a backend accepts per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLimits {
    pub max_images: Option<usize>,
    /// Cap on the base64-encoded image payload
    pub max_encoded_bytes: Option<usize>,
}

impl ImageLimits {
    pub const UNLIMITED: ImageLimits = ImageLimits {
        max_images: None,
        max_encoded_bytes: None,
    };

    /// Reject requests the backend would refuse anyway.
    pub fn check(&self, provider: &str, request: &LlmRequest) -> Result<(), StoryError> {
        if let Some(max) = self.max_images {
            if request.images.len() > max {
                return Err(StoryError::ImageLimit(format!(
                    "{provider} accepts at most {max} images per request ({} given)",
                    request.images.len()
                )));
            }
        }
        if let Some(max) = self.max_encoded_bytes {
            let size = request.encoded_image_bytes();
            if size > max {
                return Err(StoryError::ImageLimit(format!(
                    "{provider} accepts at most {:.1}MB of encoded images ({:.1}MB given)",
                    max as f64 / 1_000_000.0,
                    size as f64 / 1_000_000.0
                )));
            }
        }
        Ok(())
    }
}

/// Trait that all text/vision providers implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn LlmProvider>` for dynamic dispatch).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging (e.g., "gemini", "groq").
    fn name(&self) -> &str;

    /// Per-request image constraints.
    fn image_limits(&self) -> ImageLimits {
        ImageLimits::UNLIMITED
    }

    /// Run one completion.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, StoryError>;

    /// Per-request timeout for this provider.
    fn timeout(&self) -> Duration;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Factory that creates the configured text/vision provider.
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Create a provider for `backend`.
    ///
    /// # Arguments
    /// * `backend` - Which text/vision backend to build
    /// * `config` - The full configuration
    /// * `model_override` - Optional model name that overrides the config default
    pub fn create(
        backend: TextBackend,
        config: &Config,
        model_override: Option<&str>,
    ) -> Result<Box<dyn LlmProvider>, ConfigError> {
        let timeout = Duration::from_millis(config.limits.llm_timeout_ms);
        match backend {
            TextBackend::Gemini => {
                let cfg = config.llm.gemini.clone().unwrap_or_default();
                let api_key =
                    resolve_env_var(&cfg.api_key).ok_or(ConfigError::MissingApiKey {
                        backend: "Gemini",
                        env_var: "GOOGLE_API_KEY",
                    })?;
                let model = model_override
                    .map(String::from)
                    .unwrap_or(cfg.model.clone());
                Ok(Box::new(super::gemini::GeminiProvider::new(
                    &cfg.endpoint,
                    &api_key,
                    &model,
                    timeout,
                )))
            }
            TextBackend::Groq => {
                let cfg = config.llm.groq.clone().unwrap_or_default();
                let api_key =
                    resolve_env_var(&cfg.api_key).ok_or(ConfigError::MissingApiKey {
                        backend: "Groq",
                        env_var: "GROQ_API_KEY",
                    })?;
                let model = model_override
                    .map(String::from)
                    .unwrap_or(cfg.model.clone());
                Ok(Box::new(super::groq::GroqProvider::new(
                    &cfg.endpoint,
                    &api_key,
                    &model,
                    timeout,
                )))
            }
            TextBackend::Openai => {
                let cfg = config.llm.openai.clone().unwrap_or_default();
                let api_key =
                    resolve_env_var(&cfg.api_key).ok_or(ConfigError::MissingApiKey {
                        backend: "OpenAI",
                        env_var: "OPENAI_API_KEY",
                    })?;
                let model = model_override
                    .map(String::from)
                    .unwrap_or(cfg.model.clone());
                Ok(Box::new(super::openai::OpenAiProvider::new(
                    &cfg.endpoint,
                    &api_key,
                    &model,
                    timeout,
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GroqConfig;

    fn png_upload(bytes: &[u8]) -> ImageUpload {
        let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        data.extend_from_slice(bytes);
        ImageUpload::from_bytes("x.png", data).unwrap()
    }

    fn request_with(images: Vec<ImageInput>) -> LlmRequest {
        LlmRequest {
            system: None,
            prompt: "p".into(),
            images,
            response_format: ResponseFormat::Text,
            max_tokens: None,
            temperature: 0.0,
        }
    }

    #[test]
    fn test_image_input_round_trips_through_base64() {
        let upload = png_upload(&[0, 1, 2, 254, 255]);
        let input = ImageInput::from_upload(&upload);
        assert_eq!(input.media_type, "image/png");
        assert_eq!(input.decode().unwrap(), upload.bytes);
    }

    #[test]
    fn test_image_input_data_url() {
        let input = ImageInput::from_upload(&png_upload(&[1, 2, 3]));
        assert!(input.data_url().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_limits_reject_too_many_images() {
        let limits = ImageLimits {
            max_images: Some(2),
            max_encoded_bytes: None,
        };
        let image = ImageInput::from_upload(&png_upload(&[1]));
        let err = limits
            .check("groq", &request_with(vec![image.clone(), image.clone(), image]))
            .unwrap_err();
        assert!(matches!(err, StoryError::ImageLimit(ref m) if m.contains("at most 2")));
    }

    #[test]
    fn test_limits_reject_oversized_payload() {
        let limits = ImageLimits {
            max_images: None,
            max_encoded_bytes: Some(8),
        };
        let image = ImageInput::from_upload(&png_upload(&[0; 64]));
        assert!(limits.check("groq", &request_with(vec![image])).is_err());
    }

    #[test]
    fn test_unlimited_accepts_anything() {
        let image = ImageInput::from_upload(&png_upload(&[0; 64]));
        assert!(ImageLimits::UNLIMITED
            .check("gemini", &request_with(vec![image; 20]))
            .is_ok());
    }

    #[test]
    fn test_resolve_env_var() {
        // Non-env-var strings pass through
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        // Empty returns None
        assert_eq!(resolve_env_var(""), None);
        // Unset env var returns None
        assert_eq!(resolve_env_var("${DEFINITELY_NOT_SET_XYZ_123}"), None);
    }

    #[test]
    fn test_factory_reports_missing_key() {
        let mut config = Config::default();
        config.llm.groq = Some(GroqConfig {
            api_key: "${STORYLOOM_TEST_UNSET_GROQ_KEY}".into(),
            ..GroqConfig::default()
        });
        let err = LlmProviderFactory::create(TextBackend::Groq, &config, None)
            .err()
            .expect("missing key should fail");
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[test]
    fn test_factory_builds_with_literal_key() {
        let mut config = Config::default();
        config.llm.groq = Some(GroqConfig {
            api_key: "gsk-test".into(),
            ..GroqConfig::default()
        });
        let provider = LlmProviderFactory::create(TextBackend::Groq, &config, Some("m")).unwrap();
        assert_eq!(provider.name(), "groq");
    }
}
