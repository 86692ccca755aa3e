//! Story generator: one multimodal request per story.
//!
//! The request carries the storyteller system instruction, the per-call
//! instruction (genre, word limit, optional context), and every image inline
//! in upload order. There is no retry.

use super::options::{Genre, WordLimit};
use super::prompts::{story_instruction, STORY_SYSTEM_PROMPT};
use crate::error::StoryError;
use crate::intake::ImageSet;
use crate::llm::{classify, ImageInput, LlmProvider, LlmRequest, ResponseFormat};
use crate::types::StoryResult;
use std::sync::Arc;

/// Generates story text from images with a vision-capable provider.
pub struct StoryGenerator {
    provider: Arc<dyn LlmProvider>,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl StoryGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, temperature: f32, max_tokens: Option<u32>) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }

    /// Generate a story. `genre` must already be concrete; `Random` is sent
    /// through unchanged if the caller forgot to resolve it.
    pub async fn generate(
        &self,
        images: &ImageSet,
        genre: &Genre,
        word_limit: WordLimit,
        context: Option<&str>,
    ) -> StoryResult {
        match self.try_generate(images, genre, word_limit, context).await {
            Ok(text) => {
                tracing::info!(
                    "Generated {} words ({genre}, limit {word_limit})",
                    text.split_whitespace().count()
                );
                StoryResult::Success(text)
            }
            Err(e) => {
                tracing::warn!("Story generation failed: {e}");
                StoryResult::Failure(failure_message(&e))
            }
        }
    }

    async fn try_generate(
        &self,
        images: &ImageSet,
        genre: &Genre,
        word_limit: WordLimit,
        context: Option<&str>,
    ) -> Result<String, StoryError> {
        if images.is_empty() {
            return Err(StoryError::NoImagesProvided);
        }
        if genre.is_random() {
            tracing::warn!("Genre was not resolved before generation");
        }

        let context = context.map(str::trim).filter(|c| !c.is_empty());
        let request = LlmRequest {
            system: Some(STORY_SYSTEM_PROMPT.to_string()),
            prompt: story_instruction(genre, word_limit, context),
            images: images.iter().map(ImageInput::from_upload).collect(),
            response_format: ResponseFormat::Text,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        tracing::debug!(
            "Sending {} image(s) ({} bytes) to {}",
            images.len(),
            images.total_bytes(),
            self.provider.name()
        );
        let response = self.provider.complete(&request).await?;
        tracing::debug!(
            "Story response from {} in {}ms ({:?} tokens)",
            response.model,
            response.latency_ms,
            response.tokens_used
        );
        Ok(response.text.trim().to_string())
    }
}

fn failure_message(error: &StoryError) -> String {
    match error {
        StoryError::NoImagesProvided => {
            "Story Generation Failed. Please Attach Images.".to_string()
        }
        e if classify::is_quota_exhausted(e) => {
            "Story Generation Failed: AI Quota Exceeded, Please Try Again Tomorrow.".to_string()
        }
        e => format!("Story Generation Failed: {e}"),
    }
}
