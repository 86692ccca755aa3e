//! Story components: options, prompts, and the three model-backed stages.

mod generator;
mod narrator;
mod options;
pub mod prompts;
mod validator;

pub use generator::StoryGenerator;
pub use narrator::NarrationSynthesizer;
pub use options::{genre_rng, Genre, WordLimit};
pub use validator::PromptValidator;
