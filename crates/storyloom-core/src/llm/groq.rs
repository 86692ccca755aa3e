//! Groq provider (OpenAI-compatible API).
//!
//! Groq uses the same Chat Completions format as OpenAI, so this delegates
//! to `OpenAiProvider`. Its vision models accept at most 5 images and 4MB
//! of base64 payload per request.

use super::openai::OpenAiProvider;
use super::provider::{ImageLimits, LlmProvider, LlmRequest, LlmResponse};
use crate::error::StoryError;
use async_trait::async_trait;
use std::time::Duration;

const MAX_IMAGES: usize = 5;
const MAX_ENCODED_BYTES: usize = 4 * 1024 * 1024;

/// Groq provider wrapping an OpenAI-compatible endpoint.
pub struct GroqProvider {
    inner: OpenAiProvider,
}

impl GroqProvider {
    pub fn new(endpoint: &str, api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            inner: OpenAiProvider::with_endpoint("groq", endpoint, api_key, model, timeout),
        }
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    fn image_limits(&self) -> ImageLimits {
        ImageLimits {
            max_images: Some(MAX_IMAGES),
            max_encoded_bytes: Some(MAX_ENCODED_BYTES),
        }
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, StoryError> {
        // The inner provider only knows OpenAI's (unlimited) constraints
        self.image_limits().check(self.name(), request)?;
        self.inner.complete(request).await
    }

    fn timeout(&self) -> Duration {
        self.inner.timeout()
    }
}
