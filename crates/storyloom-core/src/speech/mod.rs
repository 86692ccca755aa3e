//! Speech synthesis backends.
//!
//! Every backend returns a WAV buffer, whatever it receives upstream.

pub mod assets;
pub(crate) mod elevenlabs;
pub mod kokoro;
pub(crate) mod local;
pub(crate) mod provider;
pub mod wav;

pub use assets::{AssetPaths, AssetStatus, LocalAssets};
pub use elevenlabs::OutputFormat;
pub use kokoro::KokoroEngine;
pub use local::{LocalSpeechProvider, SpeechEngine};
pub use provider::{SpeechProvider, SpeechProviderFactory, SpeechRequest};
