//! OpenAI provider using the Chat Completions API.
//!
//! Images are sent as data URLs in the user message content array, after
//! the prompt text.

use super::classify;
use super::provider::{LlmProvider, LlmRequest, LlmResponse, ResponseFormat};
use crate::error::StoryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// OpenAI-compatible provider using Chat Completions.
pub struct OpenAiProvider {
    name: &'static str,
    api_key: String,
    model: String,
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(endpoint: &str, api_key: &str, model: &str, timeout: Duration) -> Self {
        Self::with_endpoint("openai", endpoint, api_key, model, timeout)
    }

    /// Create under another provider name (used by the Groq provider).
    pub fn with_endpoint(
        name: &'static str,
        endpoint: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            name,
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
            url: format!("{}/chat/completions", endpoint.trim_end_matches('/')),
            timeout,
        }
    }

    fn build_body(&self, request: &LlmRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: MessageContent::Text(system.clone()),
            });
        }

        let mut content = Vec::with_capacity(request.images.len() + 1);
        content.push(ChatContent::Text {
            text: request.prompt.clone(),
        });
        content.extend(request.images.iter().map(|image| ChatContent::ImageUrl {
            image_url: ImageUrl {
                url: image.data_url(),
            },
        }));
        messages.push(ChatMessage {
            role: "user",
            content: MessageContent::Parts(content),
        });

        ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: match request.response_format {
                ResponseFormat::Json => Some(JsonObjectFormat {
                    kind: "json_object",
                }),
                ResponseFormat::Text => None,
            },
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<JsonObjectFormat>,
}

#[derive(Serialize)]
struct JsonObjectFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

/// System messages must be plain strings on Groq; only user messages carry
/// content parts.
#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ChatContent>),
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ChatContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

// --- Response types ---

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: String,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

fn parse_response(
    provider: &str,
    chat_resp: ChatResponse,
    latency_ms: u64,
) -> Result<LlmResponse, StoryError> {
    let text = chat_resp
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .ok_or_else(|| StoryError::upstream(format!("{provider} returned no content")))?;

    Ok(LlmResponse {
        text: text.trim().to_string(),
        model: chat_resp.model,
        tokens_used: chat_resp.usage.map(|u| u.total_tokens),
        latency_ms,
    })
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, StoryError> {
        self.image_limits().check(self.name, request)?;
        let start = Instant::now();
        let body = self.build_body(request);

        tracing::debug!(
            "{} request: model={} images={} format={:?}",
            self.name,
            self.model,
            request.images.len(),
            request.response_format
        );

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| classify::transport(self.name, &e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(classify::text_status(self.name, status.as_u16(), &text));
        }

        let chat_resp: ChatResponse = resp.json().await.map_err(|e| {
            StoryError::upstream(format!("Failed to parse {} response: {e}", self.name))
        })?;

        parse_response(self.name, chat_resp, start.elapsed().as_millis() as u64)
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::ImageInput;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new(
            "https://api.openai.com/v1/",
            "sk-test",
            "gpt-4o-mini",
            Duration::from_secs(5),
        )
    }

    fn request(format: ResponseFormat) -> LlmRequest {
        LlmRequest {
            system: Some("You are a creative storyteller.".into()),
            prompt: "Genre: Horror".into(),
            images: vec![
                ImageInput {
                    data: "AAAA".into(),
                    media_type: "image/png".into(),
                },
                ImageInput {
                    data: "BBBB".into(),
                    media_type: "image/jpeg".into(),
                },
            ],
            response_format: format,
            max_tokens: Some(512),
            temperature: 0.8,
        }
    }

    #[test]
    fn test_url_joins_endpoint() {
        assert_eq!(provider().url, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_body_shape() {
        let body = serde_json::to_value(provider().build_body(&request(ResponseFormat::Text)))
            .unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        assert!(body.get("response_format").is_none());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(
            body["messages"][0]["content"],
            "You are a creative storyteller."
        );
        assert_eq!(body["max_tokens"], 512);

        let user = &body["messages"][1]["content"];
        assert!(user.is_array());
        assert_eq!(user[0]["type"], "text");
        assert_eq!(user[0]["text"], "Genre: Horror");
        assert_eq!(user[1]["image_url"]["url"], "data:image/png;base64,AAAA");
        assert_eq!(user[2]["image_url"]["url"], "data:image/jpeg;base64,BBBB");
    }

    #[test]
    fn test_system_message_is_plain_string() {
        let body = serde_json::to_value(provider().build_body(&request(ResponseFormat::Json)))
            .unwrap();
        let system = &body["messages"][0]["content"];
        assert!(system.is_string(), "system content must not be a parts array: {system}");
    }

    #[test]
    fn test_uncapped_request_omits_max_tokens() {
        let mut uncapped = request(ResponseFormat::Text);
        uncapped.max_tokens = None;
        let body = serde_json::to_value(provider().build_body(&uncapped)).unwrap();
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_json_mode_sets_response_format() {
        let body = serde_json::to_value(provider().build_body(&request(ResponseFormat::Json)))
            .unwrap();
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_parse_response_trims_text() {
        let raw = r#"{
            "model": "gpt-4o-mini",
            "choices": [{"message": {"content": "  The lighthouse kept its secret.\n"}}],
            "usage": {"total_tokens": 42}
        }"#;
        let chat: ChatResponse = serde_json::from_str(raw).unwrap();
        let resp = parse_response("openai", chat, 10).unwrap();
        assert_eq!(resp.text, "The lighthouse kept its secret.");
        assert_eq!(resp.tokens_used, Some(42));
    }

    #[test]
    fn test_parse_response_without_choices_fails() {
        let chat: ChatResponse =
            serde_json::from_str(r#"{"model": "m", "choices": []}"#).unwrap();
        assert!(parse_response("openai", chat, 0).is_err());
    }
}
