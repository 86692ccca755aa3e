//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where local speech model assets are stored
    pub asset_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::from("~/.storyloom/voices"),
        }
    }
}

/// Input and request limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum number of images per story; extra uploads are dropped
    pub max_images: usize,

    /// Maximum size of a single uploaded image in megabytes
    pub max_image_size_mb: u64,

    /// HTTP timeout for text/vision calls in milliseconds
    pub llm_timeout_ms: u64,

    /// HTTP timeout for speech synthesis calls in milliseconds
    pub speech_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_images: 8,
            max_image_size_mb: 20,
            llm_timeout_ms: 120_000,
            speech_timeout_ms: 180_000,
        }
    }
}

/// Story generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    /// Genre used when none is given ("Random" picks one per request)
    pub default_genre: String,

    /// Word limit used when none is given
    pub default_word_limit: u32,

    /// Sampling temperature for story generation
    pub temperature: f32,

    /// Sampling temperature for prompt evaluation
    pub evaluation_temperature: f32,

    /// Output token cap for a story (unset = backend default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Fixed seed for "Random" genre resolution (unset = fresh entropy)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            default_genre: "Random".to_string(),
            default_word_limit: 100,
            temperature: 0.8,
            evaluation_temperature: 0.0,
            max_tokens: None,
            seed: None,
        }
    }
}

/// Which text/vision backend generates and evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextBackend {
    #[default]
    Gemini,
    Groq,
    Openai,
}

impl fmt::Display for TextBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextBackend::Gemini => write!(f, "gemini"),
            TextBackend::Groq => write!(f, "groq"),
            TextBackend::Openai => write!(f, "openai"),
        }
    }
}

impl FromStr for TextBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::Openai),
            other => Err(format!("Unknown text backend: {other}")),
        }
    }
}

/// Which speech backend narrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechBackend {
    #[default]
    Elevenlabs,
    Local,
}

impl fmt::Display for SpeechBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechBackend::Elevenlabs => write!(f, "elevenlabs"),
            SpeechBackend::Local => write!(f, "local"),
        }
    }
}

impl FromStr for SpeechBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "elevenlabs" => Ok(Self::Elevenlabs),
            "local" | "kokoro" => Ok(Self::Local),
            other => Err(format!("Unknown speech backend: {other}")),
        }
    }
}

/// Backend selection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendsConfig {
    /// Text/vision backend for evaluation and story generation
    pub text: TextBackend,

    /// Speech backend for narration
    pub speech: SpeechBackend,
}

/// Text/vision provider configurations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LlmConfig {
    /// Google Gemini configuration
    pub gemini: Option<GeminiConfig>,

    /// Groq configuration
    pub groq: Option<GroqConfig>,

    /// OpenAI configuration
    pub openai: Option<OpenAiConfig>,
}

/// Gemini configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API endpoint
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: "${GOOGLE_API_KEY}".to_string(),
            model: "gemini-2.5-flash".to_string(),
        }
    }
}

/// Groq configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroqConfig {
    /// API endpoint
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name (must accept image input)
    pub model: String,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1".to_string(),
            api_key: "${GROQ_API_KEY}".to_string(),
            model: "meta-llama/llama-4-scout-17b-16e-instruct".to_string(),
        }
    }
}

/// OpenAI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API endpoint
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Speech provider configurations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SpeechConfig {
    /// ElevenLabs (hosted) configuration
    pub elevenlabs: Option<ElevenLabsConfig>,

    /// Local model configuration
    pub local: Option<LocalSpeechConfig>,
}

/// ElevenLabs configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevenLabsConfig {
    /// API endpoint
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Narration voice
    pub voice_id: String,

    /// Synthesis model
    pub model_id: String,

    /// Requested output format ("pcm_<rate>" is wrapped into WAV)
    pub output_format: String,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.elevenlabs.io/v1".to_string(),
            api_key: "${ELEVENLABS_API_KEY}".to_string(),
            voice_id: "cgSgspJ2msm6clMCkdW9".to_string(),
            model_id: "eleven_v3".to_string(),
            output_format: "pcm_24000".to_string(),
        }
    }
}

/// Local speech model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSpeechConfig {
    /// Download URL for the model weights
    pub weights_url: String,

    /// Download URL for the voice table
    pub voices_url: String,

    /// Expected BLAKE3 digest of the weights (pinned on first download if unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights_blake3: Option<String>,

    /// Expected BLAKE3 digest of the voice table (pinned on first download if unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voices_blake3: Option<String>,

    /// Voice name from the voice table
    pub voice: String,

    /// Speaking rate multiplier
    pub speed: f32,

    /// espeak-ng voice used for phonemization (e.g. "en-us", "en-gb")
    pub language: String,

    /// espeak-ng executable
    pub espeak_program: String,
}

impl Default for LocalSpeechConfig {
    fn default() -> Self {
        Self {
            weights_url: "https://github.com/thewh1teagle/kokoro-onnx/releases/download/model-files-v1.0/kokoro-v1.0.onnx".to_string(),
            voices_url: "https://github.com/thewh1teagle/kokoro-onnx/releases/download/model-files-v1.0/voices-v1.0.bin".to_string(),
            weights_blake3: None,
            voices_blake3: None,
            voice: "af_heart".to_string(),
            speed: 1.0,
            language: "en-us".to_string(),
            espeak_program: "espeak-ng".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("Gemini".parse::<TextBackend>(), Ok(TextBackend::Gemini));
        assert_eq!("groq".parse::<TextBackend>(), Ok(TextBackend::Groq));
        assert!("anthropic".parse::<TextBackend>().is_err());
        assert_eq!("kokoro".parse::<SpeechBackend>(), Ok(SpeechBackend::Local));
    }

    #[test]
    fn test_backend_display_round_trips_through_parse() {
        for backend in [TextBackend::Gemini, TextBackend::Groq, TextBackend::Openai] {
            assert_eq!(backend.to_string().parse::<TextBackend>(), Ok(backend));
        }
    }
}
