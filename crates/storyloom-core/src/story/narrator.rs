//! Narration synthesizer: story text to WAV audio.

use crate::config::{Config, SpeechBackend};
use crate::error::StoryError;
use crate::speech::{SpeechProvider, SpeechRequest};
use crate::types::AudioResult;
use std::sync::Arc;

/// Narrates text with a fixed voice through one speech provider.
pub struct NarrationSynthesizer {
    provider: Arc<dyn SpeechProvider>,
    /// Voice settings; `text` is replaced per call
    voice: SpeechRequest,
}

impl NarrationSynthesizer {
    pub fn new(provider: Arc<dyn SpeechProvider>, voice: SpeechRequest) -> Self {
        Self { provider, voice }
    }

    /// Use the voice configured for `backend`.
    pub fn configured(
        provider: Arc<dyn SpeechProvider>,
        backend: SpeechBackend,
        config: &Config,
    ) -> Self {
        Self::new(provider, SpeechRequest::configured(backend, config, ""))
    }

    pub async fn synthesize(&self, text: &str) -> AudioResult {
        match self.try_synthesize(text).await {
            Ok(audio) => {
                tracing::info!("Narration ready ({} bytes)", audio.len());
                AudioResult::Success(audio)
            }
            Err(e) => {
                tracing::warn!("Narration failed: {e}");
                AudioResult::Failure(failure_message(&e))
            }
        }
    }

    async fn try_synthesize(&self, text: &str) -> Result<Vec<u8>, StoryError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoryError::EmptyInput);
        }
        let request = SpeechRequest {
            text: text.to_string(),
            ..self.voice.clone()
        };
        tracing::debug!(
            "Narrating {} chars with {} (voice {})",
            text.len(),
            self.provider.name(),
            request.voice
        );
        self.provider.synthesize(&request).await
    }
}

fn failure_message(error: &StoryError) -> String {
    match error {
        StoryError::UpstreamRateLimited => {
            "Audio Generation Failed: Rate Limit Exceeded, Please Try Again Later.".to_string()
        }
        StoryError::Upstream {
            status_code: Some(code),
            ..
        } => format!("Audio Generation Failed: API Error {code}"),
        StoryError::EmptyInput => "Audio Generation Failed: no text to narrate".to_string(),
        e => format!("Audio Generation Failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::wav;
    use crate::testing::MockSpeech;

    fn narrator(mock: &Arc<MockSpeech>) -> NarrationSynthesizer {
        NarrationSynthesizer::configured(
            mock.clone(),
            SpeechBackend::Elevenlabs,
            &Config::default(),
        )
    }

    #[tokio::test]
    async fn test_success_returns_wav() {
        let mock = Arc::new(MockSpeech::ok());
        let result = narrator(&mock).synthesize("  Once upon a time. ").await;

        assert!(wav::is_wav(result.audio().unwrap()));
        assert_eq!(mock.texts.lock().unwrap().as_slice(), ["Once upon a time."]);
    }

    #[tokio::test]
    async fn test_empty_text_makes_no_call() {
        let mock = Arc::new(MockSpeech::ok());
        let result = narrator(&mock).synthesize("   ").await;
        assert!(!result.succeeded());
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_message() {
        let mock = Arc::new(MockSpeech::failing(StoryError::UpstreamRateLimited));
        let result = narrator(&mock).synthesize("text").await;
        assert_eq!(
            result.error(),
            Some("Audio Generation Failed: Rate Limit Exceeded, Please Try Again Later.")
        );
    }

    #[tokio::test]
    async fn test_status_code_message() {
        let mock = Arc::new(MockSpeech::failing(StoryError::Upstream {
            message: "ElevenLabs HTTP 401: bad key".into(),
            status_code: Some(401),
        }));
        let result = narrator(&mock).synthesize("text").await;
        assert_eq!(result.error(), Some("Audio Generation Failed: API Error 401"));
    }

    #[tokio::test]
    async fn test_other_error_message() {
        let mock = Arc::new(MockSpeech::failing(StoryError::upstream(
            "ElevenLabs timed out: operation timed out",
        )));
        let result = narrator(&mock).synthesize("text").await;
        assert_eq!(
            result.error(),
            Some("Audio Generation Failed: ElevenLabs timed out: operation timed out")
        );
    }
}
