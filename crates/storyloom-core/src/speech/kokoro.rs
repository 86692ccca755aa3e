//! Kokoro v1.0 speech engine over ONNX Runtime.
//!
//! Text is phonemized by the `espeak-ng` binary one clause at a time, the
//! IPA is mapped onto Kokoro's symbol table, and each batch of at most
//! [`MAX_TOKENS`] symbols runs through the model with the style vector the
//! voice table holds for that length. Batches are concatenated at 24 kHz.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{Mutex, OnceLock};

use ndarray::{Array3, Axis};
use ndarray_npy::NpzReader;
use ort::session::Session;
use ort::value::{DynValue, Value};

use super::assets::AssetPaths;
use super::local::SpeechEngine;
use crate::error::StoryError;

/// Output sample rate of the model.
pub const SAMPLE_RATE: u32 = 24_000;

/// Symbols per inference call, excluding the two padding tokens.
pub const MAX_TOKENS: usize = 510;

const PAD: i64 = 0;
const SPACE: i64 = 16;

/// Clause-ending punctuation kept in the symbol stream.
const CLAUSE_MARKS: &[char] = &['.', ',', '!', '?', ';', ':'];

/// Kokoro v1.0 phoneme vocabulary.
#[rustfmt::skip]
const VOCAB: &[(char, i64)] = &[
    (';', 1), (':', 2), (',', 3), ('.', 4), ('!', 5), ('?', 6),
    ('\u{2014}', 9), ('\u{2026}', 10), ('"', 11), ('(', 12), (')', 13),
    ('\u{201c}', 14), ('\u{201d}', 15), (' ', 16), ('\u{0303}', 17),
    ('ʣ', 18), ('ʥ', 19), ('ʦ', 20), ('ʨ', 21), ('ᵝ', 22), ('\u{ab67}', 23),
    ('A', 24), ('I', 25), ('O', 31), ('Q', 33), ('S', 35), ('T', 36),
    ('W', 39), ('Y', 41), ('ᵊ', 42),
    ('a', 43), ('b', 44), ('c', 45), ('d', 46), ('e', 47), ('f', 48),
    ('h', 50), ('i', 51), ('j', 52), ('k', 53), ('l', 54), ('m', 55),
    ('n', 56), ('o', 57), ('p', 58), ('q', 59), ('r', 60), ('s', 61),
    ('t', 62), ('u', 63), ('v', 64), ('w', 65), ('x', 66), ('y', 67),
    ('z', 68),
    ('ɑ', 69), ('ɐ', 70), ('ɒ', 71), ('æ', 72), ('β', 75), ('ɔ', 76),
    ('ɕ', 77), ('ç', 78), ('ɖ', 80), ('ð', 81), ('ʤ', 82), ('ə', 83),
    ('ɚ', 85), ('ɛ', 86), ('ɜ', 87), ('ɟ', 90), ('ɡ', 92), ('ɥ', 99),
    ('ɨ', 101), ('ɪ', 102), ('ʝ', 103), ('ɯ', 110), ('ɰ', 111), ('ŋ', 112),
    ('ɳ', 113), ('ɲ', 114), ('ɴ', 115), ('ø', 116), ('ɸ', 118), ('θ', 119),
    ('œ', 120), ('ɹ', 123), ('ɾ', 125), ('ɻ', 126), ('ʁ', 128), ('ɽ', 129),
    ('ʂ', 130), ('ʃ', 131), ('ʈ', 132), ('ʧ', 133), ('ʊ', 135), ('ʋ', 136),
    ('ʌ', 138), ('ɣ', 139), ('ɤ', 140), ('χ', 142), ('ʎ', 143), ('ʒ', 147),
    ('ʔ', 148), ('ˈ', 156), ('ˌ', 157), ('ː', 158), ('ʰ', 162), ('ʲ', 164),
    ('↓', 169), ('→', 171), ('↗', 172), ('↘', 173), ('ᵻ', 177),
];

/// Kokoro engine. Model state is loaded by [`SpeechEngine::prepare`].
pub struct KokoroEngine {
    espeak: String,
    model: OnceLock<KokoroModel>,
}

struct KokoroModel {
    /// `Session::run` requires `&mut self`.
    session: Mutex<Session>,
    /// Name of the token input ("tokens" or "input_ids", by export).
    tokens_input: String,
    /// Newer exports take the speed as an int32 tensor.
    integer_speed: bool,
    /// Style table per voice, shaped [lengths, 1, style_dim].
    voices: HashMap<String, Array3<f32>>,
}

impl KokoroEngine {
    /// Create an engine that phonemizes with the given espeak-ng binary.
    pub fn new(espeak: impl Into<String>) -> Self {
        Self {
            espeak: espeak.into(),
            model: OnceLock::new(),
        }
    }

    fn model(&self) -> Result<&KokoroModel, StoryError> {
        self.model
            .get()
            .ok_or_else(|| StoryError::LocalSynthesis("Kokoro model is not loaded".into()))
    }

    /// Phonemize one clause with espeak-ng, reading the text from stdin.
    fn phonemize(&self, text: &str, language: &str) -> Result<String, StoryError> {
        let mut child = Command::new(&self.espeak)
            .args(["-q", "--ipa", "--stdin", "-v", language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                StoryError::LocalSynthesis(format!(
                    "could not run {} (is espeak-ng installed?): {e}",
                    self.espeak
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .map_err(|e| StoryError::LocalSynthesis(format!("espeak-ng stdin: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| StoryError::LocalSynthesis(format!("espeak-ng failed: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StoryError::LocalSynthesis(format!(
                "espeak-ng exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let ipa = String::from_utf8_lossy(&output.stdout);
        Ok(ipa.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// Phonemize every clause and return the symbol ids, clauses separated
    /// by a space and followed by their punctuation.
    fn tokens_for(&self, text: &str, language: &str) -> Result<Vec<Vec<i64>>, StoryError> {
        let mut clauses = Vec::new();
        for (clause, mark) in split_clauses(text) {
            let mut phonemes = self.phonemize(&clause, language)?;
            if let Some(mark) = mark {
                phonemes.push(mark);
            }
            let ids = tokenize(&phonemes);
            if !ids.is_empty() {
                clauses.push(ids);
            }
        }
        Ok(clauses)
    }
}

impl SpeechEngine for KokoroEngine {
    fn prepare(&self, assets: &AssetPaths) -> Result<(), StoryError> {
        if self.model.get().is_some() {
            return Ok(());
        }

        let voices = load_voices(&assets.voices)?;
        let session = Session::builder()
            .map_err(|e| {
                StoryError::LocalSynthesis(format!("Failed to create ONNX session builder: {e}"))
            })?
            .commit_from_file(&assets.weights)
            .map_err(|e| StoryError::LocalSynthesis(format!("Failed to load ONNX model: {e}")))?;

        let input_names: Vec<String> =
            session.inputs().iter().map(|i| i.name().to_string()).collect();
        let integer_speed = input_names.iter().any(|n| n == "input_ids");
        let tokens_input = if integer_speed { "input_ids" } else { "tokens" }.to_string();

        tracing::debug!(
            "Loaded Kokoro model from {:?} (inputs: {:?}, {} voices)",
            assets.weights,
            input_names,
            voices.len()
        );

        // A concurrent prepare may have won; its model is equivalent
        let _ = self.model.set(KokoroModel {
            session: Mutex::new(session),
            tokens_input,
            integer_speed,
            voices,
        });
        Ok(())
    }

    fn synthesize(
        &self,
        text: &str,
        voice: &str,
        speed: f32,
        language: &str,
    ) -> Result<(Vec<f32>, u32), StoryError> {
        let model = self.model()?;
        let style_table = model.voices.get(voice).ok_or_else(|| {
            let mut known: Vec<&str> = model.voices.keys().map(String::as_str).collect();
            known.sort_unstable();
            StoryError::LocalSynthesis(format!(
                "unknown voice {voice:?} (available: {})",
                known.join(", ")
            ))
        })?;

        let clauses = self.tokens_for(text, language)?;
        let batches = batch_tokens(&clauses, MAX_TOKENS);
        tracing::debug!(
            "Kokoro: {} clause(s) in {} batch(es), voice {voice}",
            clauses.len(),
            batches.len()
        );

        let mut samples = Vec::new();
        for batch in &batches {
            let style = style_for(style_table, batch.len())?;
            samples.extend(model.infer(batch, style, speed)?);
        }
        Ok((samples, SAMPLE_RATE))
    }
}

impl KokoroModel {
    /// Run one batch of at most [`MAX_TOKENS`] symbols.
    fn infer(&self, tokens: &[i64], style: Vec<f32>, speed: f32) -> Result<Vec<f32>, StoryError> {
        fn tensor_err(e: impl std::fmt::Display) -> StoryError {
            StoryError::LocalSynthesis(format!("Failed to create input tensor: {e}"))
        }

        let mut padded = Vec::with_capacity(tokens.len() + 2);
        padded.push(PAD);
        padded.extend_from_slice(tokens);
        padded.push(PAD);

        let tokens_value = Value::from_array((vec![1_i64, padded.len() as i64], padded))
            .map_err(tensor_err)?;
        let style_value =
            Value::from_array((vec![1_i64, style.len() as i64], style)).map_err(tensor_err)?;
        let speed_value: DynValue = if self.integer_speed {
            Value::from_array((vec![1_i64], vec![speed.round().max(1.0) as i32]))
                .map_err(tensor_err)?
                .into_dyn()
        } else {
            Value::from_array((vec![1_i64], vec![speed]))
                .map_err(tensor_err)?
                .into_dyn()
        };

        let inputs = ort::inputs![
            self.tokens_input.as_str() => tokens_value,
            "style" => style_value,
            "speed" => speed_value
        ];

        let mut session = self
            .session
            .lock()
            .map_err(|e| StoryError::LocalSynthesis(format!("Session lock poisoned: {e}")))?;
        let outputs = session
            .run(inputs)
            .map_err(|e| StoryError::LocalSynthesis(format!("ONNX inference failed: {e}")))?;

        let (_, audio) = outputs
            .iter()
            .next()
            .ok_or_else(|| StoryError::LocalSynthesis("Model produced no output".into()))?;
        let (_, data) = audio.try_extract_tensor::<f32>().map_err(|e| {
            StoryError::LocalSynthesis(format!("Failed to extract audio tensor: {e}"))
        })?;
        Ok(data.to_vec())
    }
}

/// Read every voice from the NPZ voice table.
fn load_voices(path: &Path) -> Result<HashMap<String, Array3<f32>>, StoryError> {
    let voices_err = |e: ndarray_npy::ReadNpzError| {
        StoryError::LocalSynthesis(format!("Failed to read voice table {}: {e}", path.display()))
    };

    let file = File::open(path).map_err(|e| {
        StoryError::LocalSynthesis(format!("Failed to open voice table {}: {e}", path.display()))
    })?;
    let mut npz = NpzReader::new(file).map_err(voices_err)?;

    let mut voices = HashMap::new();
    for name in npz.names().map_err(voices_err)? {
        let table: Array3<f32> = npz.by_name(&name).map_err(voices_err)?;
        let voice = name.strip_suffix(".npy").unwrap_or(&name).to_string();
        voices.insert(voice, table);
    }

    if voices.is_empty() {
        return Err(StoryError::LocalSynthesis(format!(
            "voice table {} holds no voices",
            path.display()
        )));
    }
    Ok(voices)
}

/// The style vector for a batch of `len` symbols.
fn style_for(table: &Array3<f32>, len: usize) -> Result<Vec<f32>, StoryError> {
    let rows = table.len_of(Axis(0));
    if rows == 0 {
        return Err(StoryError::LocalSynthesis("voice has no style vectors".into()));
    }
    let row = table.index_axis(Axis(0), len.min(rows - 1));
    Ok(row.iter().copied().collect())
}

/// Map IPA text onto Kokoro symbol ids. Unknown symbols are dropped.
fn tokenize(phonemes: &str) -> Vec<i64> {
    phonemes
        .chars()
        .filter_map(|c| VOCAB.iter().find(|(v, _)| *v == c).map(|(_, id)| *id))
        .collect()
}

/// Split text at clause punctuation, keeping the mark with its clause.
fn split_clauses(text: &str) -> Vec<(String, Option<char>)> {
    let mut clauses = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if CLAUSE_MARKS.contains(&c) {
            let clause = current.trim();
            if clause.is_empty() {
                // A mark with no words (e.g. "...") extends the previous clause
                if let Some((_, mark)) = clauses.last_mut() {
                    *mark = Some(c);
                }
            } else {
                clauses.push((clause.to_string(), Some(c)));
            }
            current.clear();
        } else {
            current.push(c);
        }
    }
    let tail = current.trim();
    if !tail.is_empty() {
        clauses.push((tail.to_string(), None));
    }
    clauses
}

/// Pack clauses into batches of at most `max` symbols, space-separated.
/// A clause longer than `max` is cut into `max`-sized pieces.
fn batch_tokens(clauses: &[Vec<i64>], max: usize) -> Vec<Vec<i64>> {
    let mut batches = Vec::new();
    let mut current: Vec<i64> = Vec::new();

    for clause in clauses {
        let separator = usize::from(!current.is_empty());
        if current.len() + separator + clause.len() <= max {
            if separator == 1 {
                current.push(SPACE);
            }
            current.extend_from_slice(clause);
            continue;
        }

        if !current.is_empty() {
            batches.push(std::mem::take(&mut current));
        }
        for piece in clause.chunks(max) {
            if piece.len() == max {
                batches.push(piece.to_vec());
            } else {
                current = piece.to_vec();
            }
        }
    }

    if !current.is_empty() {
        batches.push(current);
    }
    batches
}
