//! Speech provider trait, request type, and factory.

use super::assets::LocalAssets;
use super::elevenlabs::ElevenLabsProvider;
use super::kokoro::KokoroEngine;
use super::local::{LocalSpeechProvider, SpeechEngine};
use crate::config::{Config, SpeechBackend};
use crate::error::{ConfigError, StoryError};
use crate::llm::resolve_env_var;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// One narration call.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    /// Voice identity (ElevenLabs voice id or local voice name)
    pub voice: String,
    /// Hosted model id; unused by the local backend
    pub model: Option<String>,
    pub speed: f32,
    pub language: String,
}

impl SpeechRequest {
    /// Build a request with the fixed voice settings configured for `backend`.
    pub fn configured(backend: SpeechBackend, config: &Config, text: impl Into<String>) -> Self {
        let text = text.into();
        match backend {
            SpeechBackend::Elevenlabs => {
                let cfg = config.speech.elevenlabs.clone().unwrap_or_default();
                Self {
                    text,
                    voice: cfg.voice_id,
                    model: Some(cfg.model_id),
                    speed: 1.0,
                    language: "en".to_string(),
                }
            }
            SpeechBackend::Local => {
                let cfg = config.speech.local.clone().unwrap_or_default();
                Self {
                    text,
                    voice: cfg.voice,
                    model: None,
                    speed: cfg.speed,
                    language: cfg.language,
                }
            }
        }
    }
}

/// Trait that all speech backends implement. Output is always WAV.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Provider name for logging (e.g., "elevenlabs", "local").
    fn name(&self) -> &str;

    /// Synthesize the request into a WAV buffer.
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, StoryError>;

    /// Per-request timeout for this provider.
    fn timeout(&self) -> Duration;
}

/// Factory that creates the configured speech provider.
pub struct SpeechProviderFactory;

impl SpeechProviderFactory {
    /// Create a provider for `backend`.
    ///
    /// The local backend runs `engine`, or a [`KokoroEngine`] over the
    /// configured assets when none is given.
    pub fn create(
        backend: SpeechBackend,
        config: &Config,
        engine: Option<Arc<dyn SpeechEngine>>,
    ) -> Result<Box<dyn SpeechProvider>, ConfigError> {
        let timeout = Duration::from_millis(config.limits.speech_timeout_ms);
        match backend {
            SpeechBackend::Elevenlabs => {
                let cfg = config.speech.elevenlabs.clone().unwrap_or_default();
                let api_key =
                    resolve_env_var(&cfg.api_key).ok_or(ConfigError::MissingApiKey {
                        backend: "ElevenLabs",
                        env_var: "ELEVENLABS_API_KEY",
                    })?;
                let provider =
                    ElevenLabsProvider::new(&cfg.endpoint, &api_key, &cfg.output_format, timeout)?;
                Ok(Box::new(provider))
            }
            SpeechBackend::Local => {
                let cfg = config.speech.local.clone().unwrap_or_default();
                let engine = engine
                    .unwrap_or_else(|| Arc::new(KokoroEngine::new(cfg.espeak_program.clone())));
                let assets = Arc::new(LocalAssets::from_config(config.asset_dir(), &cfg));
                Ok(Box::new(LocalSpeechProvider::new(engine, assets, timeout)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ElevenLabsConfig;

    #[test]
    fn test_configured_request_uses_fixed_voice() {
        let config = Config::default();
        let hosted = SpeechRequest::configured(SpeechBackend::Elevenlabs, &config, "Hello.");
        assert_eq!(hosted.voice, "cgSgspJ2msm6clMCkdW9");
        assert_eq!(hosted.model.as_deref(), Some("eleven_v3"));

        let local = SpeechRequest::configured(SpeechBackend::Local, &config, "Hello.");
        assert_eq!(local.voice, "af_heart");
        assert_eq!(local.language, "en-us");
        assert_eq!(local.model, None);
    }

    #[test]
    fn test_missing_elevenlabs_key() {
        let mut config = Config::default();
        config.speech.elevenlabs = Some(ElevenLabsConfig {
            api_key: "${STORYLOOM_TEST_UNSET_XI_KEY}".into(),
            ..ElevenLabsConfig::default()
        });
        let err = SpeechProviderFactory::create(SpeechBackend::Elevenlabs, &config, None)
            .err()
            .unwrap();
        assert!(err.to_string().contains("ELEVENLABS_API_KEY"));
    }

    #[test]
    fn test_local_defaults_to_kokoro_engine() {
        let config = Config::default();
        let provider = SpeechProviderFactory::create(SpeechBackend::Local, &config, None).unwrap();
        assert_eq!(provider.name(), "local");
        assert_eq!(
            provider.timeout(),
            Duration::from_millis(config.limits.speech_timeout_ms)
        );
    }
}
