//! Text/vision model integration.
//!
//! Provides a provider abstraction over the hosted backends (Gemini, Groq,
//! OpenAI) and the classification that turns their failures into
//! [`crate::error::StoryError`].

pub mod classify;
pub(crate) mod gemini;
pub(crate) mod groq;
pub(crate) mod openai;
pub(crate) mod provider;

pub use provider::{
    resolve_env_var, ImageInput, ImageLimits, LlmProvider, LlmProviderFactory, LlmRequest,
    LlmResponse, ResponseFormat,
};
