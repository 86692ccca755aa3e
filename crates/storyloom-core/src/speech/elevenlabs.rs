//! ElevenLabs text-to-speech over the streaming endpoint.
//!
//! Streamed chunks are concatenated. `pcm_<rate>` output is wrapped into a
//! 16-bit mono WAV; `wav_<rate>` output is already a WAV and passes through.

use super::provider::{SpeechProvider, SpeechRequest};
use super::wav;
use crate::error::{ConfigError, StoryError};
use crate::llm::classify;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Serialize;
use std::time::Duration;

/// Audio container requested from ElevenLabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pcm { sample_rate: u32 },
    Wav { sample_rate: u32 },
}

impl OutputFormat {
    /// Parse an ElevenLabs `output_format` value such as `pcm_24000`.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let unsupported = || {
            ConfigError::ValidationError(format!(
                "speech.elevenlabs.output_format '{value}' is not supported: \
                 use pcm_<rate> or wav_<rate>"
            ))
        };
        let (kind, rate) = value.split_once('_').ok_or_else(unsupported)?;
        let sample_rate: u32 = rate.parse().map_err(|_| unsupported())?;
        match kind {
            "pcm" => Ok(OutputFormat::Pcm { sample_rate }),
            "wav" => Ok(OutputFormat::Wav { sample_rate }),
            _ => Err(unsupported()),
        }
    }

    pub fn as_query(&self) -> String {
        match self {
            OutputFormat::Pcm { sample_rate } => format!("pcm_{sample_rate}"),
            OutputFormat::Wav { sample_rate } => format!("wav_{sample_rate}"),
        }
    }

    /// Turn the concatenated stream into WAV bytes.
    fn into_wav(self, bytes: Vec<u8>) -> Result<Vec<u8>, StoryError> {
        match self {
            OutputFormat::Pcm { sample_rate } => wav::wrap_pcm16(&bytes, sample_rate),
            OutputFormat::Wav { .. } if wav::is_wav(&bytes) => Ok(bytes),
            OutputFormat::Wav { .. } => Err(StoryError::upstream(
                "ElevenLabs returned audio that is not a WAV file",
            )),
        }
    }
}

/// ElevenLabs speech provider.
pub struct ElevenLabsProvider {
    api_key: String,
    endpoint: String,
    format: OutputFormat,
    client: reqwest::Client,
    timeout: Duration,
}

#[derive(Serialize)]
struct TtsBody<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_id: Option<&'a str>,
}

impl ElevenLabsProvider {
    pub fn new(
        endpoint: &str,
        api_key: &str,
        output_format: &str,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: api_key.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            format: OutputFormat::parse(output_format)?,
            client: reqwest::Client::new(),
            timeout,
        })
    }

    fn url(&self, voice: &str) -> String {
        format!("{}/text-to-speech/{voice}/stream", self.endpoint)
    }
}

#[async_trait]
impl SpeechProvider for ElevenLabsProvider {
    fn name(&self) -> &str {
        "elevenlabs"
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, StoryError> {
        let body = TtsBody {
            text: &request.text,
            model_id: request.model.as_deref(),
        };

        let resp = self
            .client
            .post(self.url(&request.voice))
            .query(&[("output_format", self.format.as_query())])
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| classify::transport("ElevenLabs", &e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(classify::speech_status("ElevenLabs", status.as_u16(), &text));
        }

        let mut audio = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| classify::transport("ElevenLabs", &e))?;
            audio.extend_from_slice(&chunk);
        }
        tracing::debug!("ElevenLabs streamed {} bytes", audio.len());

        if audio.is_empty() {
            return Err(StoryError::upstream("ElevenLabs returned no audio"));
        }
        self.format.into_wav(audio)
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(
            OutputFormat::parse("pcm_24000").unwrap(),
            OutputFormat::Pcm { sample_rate: 24_000 }
        );
        assert_eq!(
            OutputFormat::parse("wav_44100").unwrap(),
            OutputFormat::Wav { sample_rate: 44_100 }
        );
        assert!(OutputFormat::parse("mp3_44100_128").is_err());
        assert!(OutputFormat::parse("pcm").is_err());
    }

    #[test]
    fn test_pcm_is_wrapped() {
        let pcm = [0u8, 0, 1, 0, 2, 0];
        let out = OutputFormat::Pcm { sample_rate: 24_000 }
            .into_wav(pcm.to_vec())
            .unwrap();
        assert!(wav::is_wav(&out));
        assert_eq!(out.len(), 44 + pcm.len());
    }

    #[test]
    fn test_wav_passes_through() {
        let wav_bytes = wav::encode_f32(&[0.1, 0.2], 16_000).unwrap();
        let out = OutputFormat::Wav { sample_rate: 16_000 }
            .into_wav(wav_bytes.clone())
            .unwrap();
        assert_eq!(out, wav_bytes);
        assert!(OutputFormat::Wav { sample_rate: 16_000 }
            .into_wav(b"not audio".to_vec())
            .is_err());
    }

    #[test]
    fn test_url_and_body() {
        let provider = ElevenLabsProvider::new(
            "https://api.elevenlabs.io/v1/",
            "xi",
            "pcm_24000",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            provider.url("cgSgspJ2msm6clMCkdW9"),
            "https://api.elevenlabs.io/v1/text-to-speech/cgSgspJ2msm6clMCkdW9/stream"
        );

        let body = serde_json::to_value(TtsBody {
            text: "Once.",
            model_id: Some("eleven_v3"),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"text": "Once.", "model_id": "eleven_v3"}));
    }
}
