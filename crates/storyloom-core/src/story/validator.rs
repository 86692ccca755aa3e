//! Prompt validator: decides whether the context text is story direction.
//!
//! The verdict is advisory. It is shown to the user but never gates
//! generation.

use super::prompts::EVALUATOR_SYSTEM_PROMPT;
use crate::error::StoryError;
use crate::llm::{classify, LlmProvider, LlmRequest, ResponseFormat};
use crate::types::PromptEvaluation;
use serde::Deserialize;
use std::sync::Arc;

/// Structured reply expected from the evaluator.
#[derive(Debug, Deserialize)]
struct EvaluatorReply {
    is_story_prompt: bool,
    #[serde(default)]
    reason: String,
}

/// Classifies free text with one JSON-mode model call.
pub struct PromptValidator {
    provider: Arc<dyn LlmProvider>,
    temperature: f32,
}

impl PromptValidator {
    pub fn new(provider: Arc<dyn LlmProvider>, temperature: f32) -> Self {
        Self {
            provider,
            temperature,
        }
    }

    /// Evaluate `text`. Never fails: errors become an invalid verdict whose
    /// reason describes the failure.
    pub async fn evaluate(&self, text: Option<&str>) -> PromptEvaluation {
        match self.try_evaluate(text).await {
            Ok(evaluation) => {
                tracing::debug!(
                    "Prompt evaluation: valid={} reason={:?}",
                    evaluation.is_valid,
                    evaluation.reason
                );
                evaluation
            }
            Err(e) => {
                if e != StoryError::EmptyInput {
                    tracing::warn!("Prompt evaluation failed: {e}");
                }
                PromptEvaluation::invalid(failure_message(&e))
            }
        }
    }

    async fn try_evaluate(&self, text: Option<&str>) -> Result<PromptEvaluation, StoryError> {
        let text = text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(StoryError::EmptyInput)?;

        let request = LlmRequest {
            system: Some(EVALUATOR_SYSTEM_PROMPT.to_string()),
            prompt: text.to_string(),
            images: Vec::new(),
            response_format: ResponseFormat::Json,
            max_tokens: None,
            temperature: self.temperature,
        };
        let response = self.provider.complete(&request).await?;
        parse_reply(&response.text)
    }
}

fn failure_message(error: &StoryError) -> String {
    match error {
        StoryError::EmptyInput => error.to_string(),
        e if classify::is_quota_exhausted(e) => {
            "Evaluation Failed: AI Quota Exceeded, Please Try Again Tomorrow.".to_string()
        }
        e => format!("Evaluation failed: {e}"),
    }
}

/// Parse the evaluator reply, tolerating a surrounding Markdown code fence.
fn parse_reply(raw: &str) -> Result<PromptEvaluation, StoryError> {
    let body = strip_code_fence(raw);
    let reply: EvaluatorReply =
        serde_json::from_str(body).map_err(|e| StoryError::Parse(e.to_string()))?;
    Ok(PromptEvaluation {
        is_valid: reply.is_story_prompt,
        reason: reply.reason,
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
