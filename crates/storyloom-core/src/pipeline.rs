//! Request orchestration: validate, generate, synthesize.
//!
//! ```text
//! Idle → Validating → Generating ─┬→ GenerationFailed
//!                                 └→ Synthesizing ─┬→ Completed
//!                                                  └→ SynthesisFailed
//! ```
//!
//! Validation is advisory and never stops generation. The first failing
//! stage ends the run with its message; nothing is retried.

use crate::backends::Backends;
use crate::story::Genre;
use crate::types::{AudioResult, PromptEvaluation, StoryRequest, StoryResult};
use rand::Rng;
use serde::{Serialize, Serializer};
use std::fmt;

/// Stage the pipeline is in, reported to the observer as each begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Validating,
    Generating,
    Synthesizing,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PipelineStage::Idle => "Waiting",
            PipelineStage::Validating => "Reading your context...",
            PipelineStage::Generating => {
                "Your story is being generated... This may take a few moments."
            }
            PipelineStage::Synthesizing => "Recording the narration...",
            PipelineStage::Done => "Done",
        };
        f.write_str(label)
    }
}

/// Final state of one run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Completed {
        evaluation: PromptEvaluation,
        genre: Genre,
        story: String,
        #[serde(rename = "audio_bytes", serialize_with = "serialize_len")]
        audio: Vec<u8>,
    },
    GenerationFailed {
        evaluation: PromptEvaluation,
        genre: Genre,
        message: String,
    },
    SynthesisFailed {
        evaluation: PromptEvaluation,
        genre: Genre,
        story: String,
        message: String,
    },
}

fn serialize_len<S: Serializer>(audio: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(audio.len() as u64)
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Completed { .. })
    }

    pub fn evaluation(&self) -> &PromptEvaluation {
        match self {
            PipelineOutcome::Completed { evaluation, .. }
            | PipelineOutcome::GenerationFailed { evaluation, .. }
            | PipelineOutcome::SynthesisFailed { evaluation, .. } => evaluation,
        }
    }

    /// The concrete genre the story was written in.
    pub fn genre(&self) -> &Genre {
        match self {
            PipelineOutcome::Completed { genre, .. }
            | PipelineOutcome::GenerationFailed { genre, .. }
            | PipelineOutcome::SynthesisFailed { genre, .. } => genre,
        }
    }

    /// Story text, kept even when narration failed.
    pub fn story(&self) -> Option<&str> {
        match self {
            PipelineOutcome::Completed { story, .. }
            | PipelineOutcome::SynthesisFailed { story, .. } => Some(story),
            PipelineOutcome::GenerationFailed { .. } => None,
        }
    }

    pub fn audio(&self) -> Option<&[u8]> {
        match self {
            PipelineOutcome::Completed { audio, .. } => Some(audio),
            _ => None,
        }
    }

    /// Message of the failing stage.
    pub fn error(&self) -> Option<&str> {
        match self {
            PipelineOutcome::Completed { .. } => None,
            PipelineOutcome::GenerationFailed { message, .. }
            | PipelineOutcome::SynthesisFailed { message, .. } => Some(message),
        }
    }

    /// Note shown when the user gave context that was judged unsuitable.
    pub fn advisory_note(&self, context: Option<&str>) -> Option<String> {
        let provided = context.is_some_and(|c| !c.trim().is_empty());
        let evaluation = self.evaluation();
        (provided && !evaluation.is_valid).then(|| {
            format!(
                "Note: The provided prompt was not suitable for story generation. Reason: {}",
                evaluation.reason
            )
        })
    }
}

/// Runs one request through the backends.
pub struct StoryPipeline {
    backends: Backends,
}

impl StoryPipeline {
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    /// Run the pipeline. `Random` is resolved once, up front, with `rng`.
    /// `on_stage` is called as each stage begins and once more with
    /// [`PipelineStage::Done`].
    pub async fn run<R, F>(
        &self,
        request: &StoryRequest,
        rng: &mut R,
        mut on_stage: F,
    ) -> PipelineOutcome
    where
        R: Rng + ?Sized,
        F: FnMut(PipelineStage),
    {
        let genre = request.genre.resolve(rng);
        if request.genre.is_random() {
            tracing::info!("Random genre resolved to {genre}");
        }
        let context = request.context_text();

        on_stage(PipelineStage::Validating);
        let evaluation = self.backends.evaluate(context).await;

        on_stage(PipelineStage::Generating);
        let story = match self
            .backends
            .generate_story(&request.images, &genre, request.word_limit, context)
            .await
        {
            StoryResult::Success(text) => text,
            StoryResult::Failure(message) => {
                on_stage(PipelineStage::Done);
                return PipelineOutcome::GenerationFailed {
                    evaluation,
                    genre,
                    message,
                };
            }
        };

        on_stage(PipelineStage::Synthesizing);
        let outcome = match self.backends.synthesize(&story).await {
            AudioResult::Success(audio) => PipelineOutcome::Completed {
                evaluation,
                genre,
                story,
                audio,
            },
            AudioResult::Failure(message) => PipelineOutcome::SynthesisFailed {
                evaluation,
                genre,
                story,
                message,
            },
        };
        on_stage(PipelineStage::Done);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, SpeechBackend, StoryConfig};
    use crate::error::StoryError;
    use crate::speech::{wav, SpeechRequest};
    use crate::story::{genre_rng, WordLimit};
    use crate::testing::{images, MockLlm, MockSpeech};
    use std::sync::Arc;

    const VALID: &str = r#"{"is_story_prompt": true, "reason": "story request"}"#;

    /// First call answers the evaluator, the rest answer the generator.
    fn llm(story: Result<&str, StoryError>) -> Arc<MockLlm> {
        let story = story.map(String::from);
        Arc::new(MockLlm::with(move |idx| {
            if idx == 0 {
                Ok(VALID.to_string())
            } else {
                story.clone()
            }
        }))
    }

    fn pipeline(llm: &Arc<MockLlm>, speech: &Arc<MockSpeech>) -> StoryPipeline {
        StoryPipeline::new(Backends::new(
            llm.clone(),
            speech.clone(),
            SpeechRequest::configured(SpeechBackend::Elevenlabs, &Config::default(), ""),
            &StoryConfig::default(),
        ))
    }

    fn request(image_count: usize, context: Option<&str>) -> StoryRequest {
        StoryRequest {
            context: context.map(String::from),
            images: images(image_count),
            genre: Genre::Fantasy,
            word_limit: WordLimit::default(),
        }
    }

    #[tokio::test]
    async fn test_completed_run() {
        let llm = llm(Ok("  A fox crossed the frozen river.  "));
        let speech = Arc::new(MockSpeech::ok());
        let mut stages = Vec::new();

        let outcome = pipeline(&llm, &speech)
            .run(&request(2, Some("a fox")), &mut genre_rng(Some(1)), |s| stages.push(s))
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.story(), Some("A fox crossed the frozen river."));
        assert!(wav::is_wav(outcome.audio().unwrap()));
        assert_eq!(
            stages,
            [
                PipelineStage::Validating,
                PipelineStage::Generating,
                PipelineStage::Synthesizing,
                PipelineStage::Done
            ]
        );
        assert_eq!(
            speech.texts.lock().unwrap().as_slice(),
            ["A fox crossed the frozen river."]
        );
    }

    #[tokio::test]
    async fn test_invalid_context_does_not_block_generation() {
        let llm = Arc::new(MockLlm::with(|idx| {
            Ok(if idx == 0 {
                r#"{"is_story_prompt": false, "reason": "math question"}"#.to_string()
            } else {
                "The end.".to_string()
            })
        }));
        let speech = Arc::new(MockSpeech::ok());
        let context = Some("what is 7 * 6");

        let outcome = pipeline(&llm, &speech)
            .run(&request(1, context), &mut genre_rng(Some(1)), |_| {})
            .await;

        assert!(outcome.is_success());
        assert_eq!(
            outcome.advisory_note(context).as_deref(),
            Some("Note: The provided prompt was not suitable for story generation. Reason: math question")
        );
        // Context still reaches the generator
        assert!(llm.last_request().unwrap().prompt.contains("what is 7 * 6"));
    }

    #[tokio::test]
    async fn test_empty_context_has_no_note() {
        let llm = llm(Ok("Story."));
        let speech = Arc::new(MockSpeech::ok());
        let outcome = pipeline(&llm, &speech)
            .run(&request(1, Some("  ")), &mut genre_rng(Some(1)), |_| {})
            .await;

        assert_eq!(outcome.evaluation().reason, "Empty prompt");
        assert_eq!(outcome.advisory_note(Some("  ")), None);
        // Only the generator was called
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_images_stops_before_synthesis() {
        let llm = llm(Ok("unused"));
        let speech = Arc::new(MockSpeech::ok());
        let outcome = pipeline(&llm, &speech)
            .run(&request(0, None), &mut genre_rng(Some(1)), |_| {})
            .await;

        assert_eq!(outcome.error(), Some("Story Generation Failed. Please Attach Images."));
        assert_eq!(outcome.story(), None);
        assert_eq!(llm.calls(), 0);
        assert_eq!(speech.calls(), 0);
    }

    #[tokio::test]
    async fn test_quota_is_distinguishable_end_to_end() {
        let llm = llm(Err(StoryError::UpstreamQuotaExceeded));
        let speech = Arc::new(MockSpeech::ok());
        let outcome = pipeline(&llm, &speech)
            .run(&request(1, Some("a dragon")), &mut genre_rng(Some(1)), |_| {})
            .await;

        assert!(matches!(outcome, PipelineOutcome::GenerationFailed { .. }));
        assert_eq!(
            outcome.error(),
            Some("Story Generation Failed: AI Quota Exceeded, Please Try Again Tomorrow.")
        );
        assert_eq!(speech.calls(), 0);
    }

    #[tokio::test]
    async fn test_synthesis_failure_keeps_story() {
        let llm = llm(Ok("Rain on the tin roof."));
        let speech = Arc::new(MockSpeech::failing(StoryError::UpstreamRateLimited));
        let outcome = pipeline(&llm, &speech)
            .run(&request(1, None), &mut genre_rng(Some(1)), |_| {})
            .await;

        assert!(matches!(outcome, PipelineOutcome::SynthesisFailed { .. }));
        assert_eq!(outcome.story(), Some("Rain on the tin roof."));
        assert_eq!(
            outcome.error(),
            Some("Audio Generation Failed: Rate Limit Exceeded, Please Try Again Later.")
        );
    }

    #[tokio::test]
    async fn test_random_genre_resolved_once() {
        let llm = llm(Ok("Story."));
        let speech = Arc::new(MockSpeech::ok());
        let mut req = request(1, None);
        req.genre = Genre::Random;

        let outcome = pipeline(&llm, &speech)
            .run(&req, &mut genre_rng(Some(5)), |_| {})
            .await;

        let genre = outcome.genre().clone();
        assert!(!genre.is_random());
        let prompt = llm.last_request().unwrap().prompt;
        assert!(prompt.starts_with(&format!("Genre: {genre}\n")));

        // Same seed, same genre
        let again = pipeline(&llm, &speech)
            .run(&req, &mut genre_rng(Some(5)), |_| {})
            .await;
        assert_eq!(again.genre(), &genre);
    }

    #[test]
    fn test_outcome_json_reports_audio_length() {
        let outcome = PipelineOutcome::Completed {
            evaluation: PromptEvaluation::valid("ok"),
            genre: Genre::Horror,
            story: "Boo.".into(),
            audio: vec![0; 128],
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "completed");
        assert_eq!(json["genre"], "Horror");
        assert_eq!(json["audio_bytes"], 128);
        assert!(json.get("audio").is_none());
    }
}
