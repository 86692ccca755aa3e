//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::story::WordLimit;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_images == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_images must be > 0".into(),
            ));
        }
        if self.limits.max_image_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_size_mb must be > 0".into(),
            ));
        }
        if self.limits.llm_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.llm_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.speech_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.speech_timeout_ms must be > 0".into(),
            ));
        }
        if WordLimit::new(self.story.default_word_limit).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "story.default_word_limit must be one of {:?}",
                WordLimit::ALLOWED
            )));
        }
        if !(0.0..=2.0).contains(&self.story.temperature) {
            return Err(ConfigError::ValidationError(
                "story.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.story.evaluation_temperature) {
            return Err(ConfigError::ValidationError(
                "story.evaluation_temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.story.max_tokens == Some(0) {
            return Err(ConfigError::ValidationError(
                "story.max_tokens must be > 0".into(),
            ));
        }
        if let Some(local) = &self.speech.local {
            if local.speed <= 0.0 {
                return Err(ConfigError::ValidationError(
                    "speech.local.speed must be > 0".into(),
                ));
            }
        }
        Ok(())
    }
}
