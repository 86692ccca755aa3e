//! Configuration management for Storyloom.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. Every section implements `Default`, so a missing file or a
//! partial file both yield a complete configuration.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Storyloom.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Input and request limits
    pub limits: LimitsConfig,

    /// Story generation settings
    pub story: StoryConfig,

    /// Backend selection
    pub backends: BackendsConfig,

    /// Text/vision provider settings
    pub llm: LlmConfig,

    /// Speech provider settings
    pub speech: SpeechConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/com.storyloom.storyloom/config.toml
    /// - Linux: ~/.config/storyloom/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\storyloom\config\config.toml
    ///
    /// Falls back to ~/.storyloom/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "storyloom", "storyloom")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".storyloom").join("config.toml")
            })
    }

    /// Get the resolved local speech asset directory (with ~ expansion).
    pub fn asset_dir(&self) -> PathBuf {
        let path_str = self.general.asset_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.limits.max_images, 8);
        assert_eq!(config.story.default_word_limit, 100);
        assert_eq!(config.backends.text, TextBackend::Gemini);
        assert_eq!(config.backends.speech, SpeechBackend::Elevenlabs);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[limits]"));
        assert!(toml.contains("[story]"));
        assert!(toml.contains("[backends]"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[backends]\ntext = \"groq\"\n\n[llm.groq]\nendpoint = \"http://localhost:9\"\napi_key = \"k\"\nmodel = \"m\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.backends.text, TextBackend::Groq);
        assert_eq!(config.backends.speech, SpeechBackend::Elevenlabs);
        assert_eq!(config.llm.groq.unwrap().model, "m");
        assert_eq!(config.limits.max_images, 8);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[limits]\nmax_images = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("max_images"));
    }

    #[test]
    fn test_asset_dir_expands_tilde() {
        let config = Config::default();
        assert!(!config.asset_dir().to_string_lossy().starts_with('~'));
    }
}
