//! In-process speech backend over the downloaded model assets.
//!
//! Inference itself sits behind [`SpeechEngine`]. The provider owns asset
//! acquisition, runs the engine on a blocking thread, and encodes its
//! samples to WAV.

use super::assets::{AssetPaths, LocalAssets};
use super::provider::{SpeechProvider, SpeechRequest};
use super::wav;
use crate::error::StoryError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// A synchronous text-to-speech engine.
pub trait SpeechEngine: Send + Sync + 'static {
    /// Load model state from the verified assets. Called once before the
    /// first synthesis.
    fn prepare(&self, _assets: &AssetPaths) -> Result<(), StoryError> {
        Ok(())
    }

    /// Render `text` to mono float samples and their sample rate.
    fn synthesize(
        &self,
        text: &str,
        voice: &str,
        speed: f32,
        language: &str,
    ) -> Result<(Vec<f32>, u32), StoryError>;
}

/// Local speech provider.
pub struct LocalSpeechProvider {
    engine: Arc<dyn SpeechEngine>,
    assets: Arc<LocalAssets>,
    prepared: OnceCell<()>,
    timeout: Duration,
}

impl LocalSpeechProvider {
    pub fn new(engine: Arc<dyn SpeechEngine>, assets: Arc<LocalAssets>, timeout: Duration) -> Self {
        Self {
            engine,
            assets,
            prepared: OnceCell::new(),
            timeout,
        }
    }

    async fn prepare(&self) -> Result<(), StoryError> {
        self.prepared
            .get_or_try_init(|| async {
                let paths = self.assets.ensure().await?.clone();
                let engine = Arc::clone(&self.engine);
                tokio::task::spawn_blocking(move || engine.prepare(&paths))
                    .await
                    .map_err(|e| StoryError::LocalSynthesis(format!("engine task failed: {e}")))?
            })
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl SpeechProvider for LocalSpeechProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, StoryError> {
        self.prepare().await?;

        let engine = Arc::clone(&self.engine);
        let request = request.clone();
        let task = tokio::task::spawn_blocking(move || {
            engine.synthesize(&request.text, &request.voice, request.speed, &request.language)
        });

        let (samples, sample_rate) = tokio::time::timeout(self.timeout, task)
            .await
            .map_err(|_| {
                StoryError::LocalSynthesis(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| StoryError::LocalSynthesis(format!("engine task failed: {e}")))??;

        if samples.is_empty() {
            return Err(StoryError::LocalSynthesis("engine produced no audio".into()));
        }
        tracing::debug!(
            "Local engine produced {:.1}s of audio",
            samples.len() as f32 / sample_rate as f32
        );
        wav::encode_f32(&samples, sample_rate)
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
