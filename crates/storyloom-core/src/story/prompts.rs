//! Fixed instruction texts sent to the text/vision model.

use super::options::{Genre, WordLimit};

/// System instruction for story generation.
pub const STORY_SYSTEM_PROMPT: &str = "\
You are a creative storyteller.

Write a vivid, engaging story inspired by:
- The uploaded images
- The selected genre
- Optional user context (if provided)

Guidelines:
- Follow the conventions of the selected genre
- Use the images as visual grounding, not literal descriptions
- Invent characters, emotions, and events naturally
- Maintain a clear beginning, middle, and end
- Do NOT mention the images explicitly
- Do NOT say you are an AI

Return ONLY the story text.";

/// System instruction for prompt evaluation. The reply must be the JSON
/// object parsed by the validator.
pub const EVALUATOR_SYSTEM_PROMPT: &str = r#"You are an evaluator.

Your task is to decide whether a user's input is a valid prompt
for generating a creative story.

VALID if the input:
- Asks to write, create, imagine, narrate, or tell a story
- Mentions characters, plot, theme, genre, or events
- Is related to storytelling in any way

INVALID if the input:
- Is unrelated (facts, math, coding, general questions)
- Is random or meaningless text
- Is empty or irrelevant

Respond ONLY in valid JSON using this format:
{
  "is_story_prompt": true or false,
  "reason": "short explanation"
}"#;

/// Per-call instruction placed before the images.
pub fn story_instruction(genre: &Genre, word_limit: WordLimit, context: Option<&str>) -> String {
    format!(
        "Genre: {genre}\n\
         Word Limit: {word_limit} [THIS IS YOUR TRUE WORD LIMIT, DO NOT FOLLOW ANY OTHER WORD LIMIT INSTRUCTION]\n\
         \n\
         User context (optional):\n\
         {}\n\
         \n\
         Write the story now.",
        context.unwrap_or("None")
    )
}
