//! Mock providers shared by unit tests.

use crate::error::StoryError;
use crate::intake::{ImageSet, ImageUpload};
use crate::llm::{LlmProvider, LlmRequest, LlmResponse};
use crate::speech::{wav, SpeechProvider, SpeechRequest};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

pub(crate) fn images(count: usize) -> ImageSet {
    let uploads = (0..count)
        .map(|i| ImageUpload::from_bytes(format!("{i}.png"), PNG.to_vec()).unwrap())
        .collect();
    ImageSet::clamp(uploads, usize::MAX).0
}

type LlmFn = Box<dyn Fn(u32) -> Result<String, StoryError> + Send + Sync>;

/// Text/vision provider returning scripted responses.
pub(crate) struct MockLlm {
    response_fn: LlmFn,
    pub call_count: Arc<AtomicU32>,
    pub requests: Arc<Mutex<Vec<LlmRequest>>>,
}

impl MockLlm {
    pub fn with(f: impl Fn(u32) -> Result<String, StoryError> + Send + Sync + 'static) -> Self {
        Self {
            response_fn: Box::new(f),
            call_count: Arc::new(AtomicU32::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::with(move |_| Ok(text.clone()))
    }

    pub fn failing(error: StoryError) -> Self {
        Self::with(move |_| Err(error.clone()))
    }

    pub fn calls(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<LlmRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, StoryError> {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        (self.response_fn)(idx).map(|text| LlmResponse {
            text,
            model: "mock-v1".to_string(),
            tokens_used: Some(42),
            latency_ms: 10,
        })
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(60)
    }
}

/// Speech provider returning a short WAV or a fixed error.
pub(crate) struct MockSpeech {
    error: Option<StoryError>,
    pub call_count: Arc<AtomicU32>,
    pub texts: Arc<Mutex<Vec<String>>>,
}

impl MockSpeech {
    pub fn ok() -> Self {
        Self {
            error: None,
            call_count: Arc::new(AtomicU32::new(0)),
            texts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(error: StoryError) -> Self {
        Self {
            error: Some(error),
            ..Self::ok()
        }
    }

    pub fn calls(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechProvider for MockSpeech {
    fn name(&self) -> &str {
        "mock-speech"
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, StoryError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(request.text.clone());
        match &self.error {
            Some(e) => Err(e.clone()),
            None => wav::encode_f32(&[0.0, 0.1, 0.2], 24_000),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(60)
    }
}
