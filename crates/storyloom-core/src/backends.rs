//! Backend facade: one text/vision provider plus one speech provider behind
//! the three uniform operations the pipeline needs.

use crate::config::{BackendsConfig, Config, SpeechBackend, StoryConfig, TextBackend};
use crate::error::ConfigError;
use crate::intake::ImageSet;
use crate::llm::{LlmProvider, LlmProviderFactory};
use crate::speech::{SpeechEngine, SpeechProvider, SpeechProviderFactory, SpeechRequest};
use crate::story::{Genre, NarrationSynthesizer, PromptValidator, StoryGenerator, WordLimit};
use crate::types::{AudioResult, PromptEvaluation, StoryResult};
use std::sync::Arc;

/// Which concrete backends to use for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendSelector {
    pub text: TextBackend,
    pub speech: SpeechBackend,
}

impl From<BackendsConfig> for BackendSelector {
    fn from(config: BackendsConfig) -> Self {
        Self {
            text: config.text,
            speech: config.speech,
        }
    }
}

/// Builds [`Backends`] from configuration.
#[derive(Default)]
pub struct ProviderFactory {
    engine: Option<Arc<dyn SpeechEngine>>,
    model_override: Option<String>,
}

impl ProviderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine used when the local speech backend is selected, in place of
    /// the default Kokoro engine.
    pub fn with_speech_engine(mut self, engine: Arc<dyn SpeechEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Text/vision model name overriding the configured one.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_override = Some(model.into());
        self
    }

    pub fn build(
        &self,
        selector: BackendSelector,
        config: &Config,
    ) -> Result<Backends, ConfigError> {
        let llm =
            LlmProviderFactory::create(selector.text, config, self.model_override.as_deref())?;
        let speech = SpeechProviderFactory::create(selector.speech, config, self.engine.clone())?;
        tracing::debug!("Backends: text={} speech={}", llm.name(), speech.name());

        Ok(Backends::new(
            Arc::from(llm),
            Arc::from(speech),
            SpeechRequest::configured(selector.speech, config, ""),
            &config.story,
        ))
    }
}

/// The adapter facade used by the pipeline.
pub struct Backends {
    validator: PromptValidator,
    generator: StoryGenerator,
    narrator: NarrationSynthesizer,
    text_name: String,
    speech_name: String,
}

impl Backends {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        speech: Arc<dyn SpeechProvider>,
        voice: SpeechRequest,
        story: &StoryConfig,
    ) -> Self {
        Self {
            text_name: llm.name().to_string(),
            speech_name: speech.name().to_string(),
            validator: PromptValidator::new(Arc::clone(&llm), story.evaluation_temperature),
            generator: StoryGenerator::new(llm, story.temperature, story.max_tokens),
            narrator: NarrationSynthesizer::new(speech, voice),
        }
    }

    /// Classify context text as story direction or not.
    pub async fn evaluate(&self, text: Option<&str>) -> PromptEvaluation {
        self.validator.evaluate(text).await
    }

    /// Generate a story from images. `genre` must be concrete.
    pub async fn generate_story(
        &self,
        images: &ImageSet,
        genre: &Genre,
        word_limit: WordLimit,
        context: Option<&str>,
    ) -> StoryResult {
        self.generator
            .generate(images, genre, word_limit, context)
            .await
    }

    /// Narrate story text into WAV audio.
    pub async fn synthesize(&self, text: &str) -> AudioResult {
        self.narrator.synthesize(text).await
    }

    pub fn text_backend_name(&self) -> &str {
        &self.text_name
    }

    pub fn speech_backend_name(&self) -> &str {
        &self.speech_name
    }
}
