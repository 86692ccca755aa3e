//! Google Gemini provider using the Generative Language `generateContent` API.
//!
//! Images travel as provider-native `inline_data` parts after the prompt
//! text; the system instruction has its own top-level field.

use super::classify;
use super::provider::{LlmProvider, LlmRequest, LlmResponse, ResponseFormat};
use crate::error::StoryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Gemini provider.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(endpoint: &str, api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    fn build_body(request: &LlmRequest) -> GenerateRequest {
        let mut parts = Vec::with_capacity(request.images.len() + 1);
        parts.push(Part::Text {
            text: request.prompt.clone(),
        });
        parts.extend(request.images.iter().map(|image| Part::InlineData {
            inline_data: InlineData {
                mime_type: image.media_type.clone(),
                data: image.data.clone(),
            },
        }));

        GenerateRequest {
            system_instruction: request.system.as_ref().map(|text| SystemInstruction {
                parts: vec![Part::Text { text: text.clone() }],
            }),
            contents: vec![Content {
                role: "user",
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
                response_mime_type: match request.response_format {
                    ResponseFormat::Json => Some("application/json"),
                    ResponseFormat::Text => None,
                },
            },
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    /// Omitted unless capped: thinking tokens count against it, and a tight
    /// cap ends the reply before any text
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

// --- Response types ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn parse_response(
    resp: GenerateResponse,
    fallback_model: &str,
    latency_ms: u64,
) -> Result<LlmResponse, StoryError> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(StoryError::upstream(format!(
            "Gemini blocked the prompt: {reason}"
        )));
    }

    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| StoryError::upstream("Gemini returned no candidates"))?;

    // A reply may be split across several text parts
    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
        return Err(StoryError::upstream(format!(
            "Gemini returned no text (finish reason: {reason})"
        )));
    }

    Ok(LlmResponse {
        text: text.trim().to_string(),
        model: resp
            .model_version
            .unwrap_or_else(|| fallback_model.to_string()),
        tokens_used: resp.usage_metadata.and_then(|u| u.total_token_count),
        latency_ms,
    })
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, StoryError> {
        self.image_limits().check(self.name(), request)?;
        let start = Instant::now();
        let body = Self::build_body(request);

        tracing::debug!(
            "gemini request: model={} images={} format={:?}",
            self.model,
            request.images.len(),
            request.response_format
        );

        let resp = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| classify::transport("gemini", &e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(classify::text_status("gemini", status.as_u16(), &text));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| StoryError::upstream(format!("Failed to parse Gemini response: {e}")))?;

        parse_response(parsed, &self.model, start.elapsed().as_millis() as u64)
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
