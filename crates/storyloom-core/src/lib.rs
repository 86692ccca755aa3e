//! Storyloom Core - image-to-story narration pipeline.
//!
//! Storyloom takes a handful of images plus optional context, asks a
//! multimodal language model for a short story, and narrates it to WAV.
//!
//! # Architecture
//!
//! ```text
//! Images + context → Validate (advisory) → Generate story → Synthesize speech
//! ```
//!
//! Text/vision backends (Gemini, Groq, OpenAI) and speech backends
//! (ElevenLabs, local engine) sit behind [`llm::LlmProvider`] and
//! [`speech::SpeechProvider`]; [`Backends`] wraps one of each.
//!
//! # Usage
//!
//! ```rust,ignore
//! use storyloom_core::{BackendSelector, Config, ProviderFactory, StoryPipeline, StoryRequest};
//!
//! #[tokio::main]
//! async fn main() -> storyloom_core::Result<()> {
//!     let config = Config::load()?;
//!     let selector = BackendSelector::from(config.backends);
//!     let backends = ProviderFactory::new().build(selector, &config)?;
//!     let pipeline = StoryPipeline::new(backends);
//!
//!     let request = StoryRequest::default();
//!     let mut rng = storyloom_core::genre_rng(config.story.seed);
//!     let outcome = pipeline.run(&request, &mut rng, |stage| println!("{stage}")).await;
//!     println!("{:?}", outcome.story());
//!     Ok(())
//! }
//! ```

pub mod backends;
pub mod config;
pub mod error;
pub mod intake;
pub mod llm;
pub mod pipeline;
pub mod speech;
pub mod story;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use backends::{BackendSelector, Backends, ProviderFactory};
pub use config::{Config, SpeechBackend, TextBackend};
pub use error::{ConfigError, IntakeError, Result, StoryError, StoryloomError};
pub use intake::{load_images, ImageSet, ImageUpload, IntakeReport};
pub use pipeline::{PipelineOutcome, PipelineStage, StoryPipeline};
pub use story::{genre_rng, Genre, WordLimit};
pub use types::{AudioResult, PromptEvaluation, StoryRequest, StoryResult};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
