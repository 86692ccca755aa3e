//! Story options: genre vocabulary and the allowed word limits.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IntakeError;

/// Story genre.
///
/// `Random` is a sentinel: it must be resolved to a concrete genre with
/// [`Genre::resolve`] before the request reaches the generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Genre {
    #[default]
    Random,
    Fantasy,
    ScienceFiction,
    Mystery,
    Romance,
    Horror,
    Comedy,
    Thriller,
    /// Free-form genre typed by the user
    Custom(String),
}

/// Fixed vocabulary in selector order, `Random` first.
static VOCABULARY: [Genre; 8] = [
    Genre::Random,
    Genre::Fantasy,
    Genre::ScienceFiction,
    Genre::Mystery,
    Genre::Romance,
    Genre::Horror,
    Genre::Comedy,
    Genre::Thriller,
];

impl Genre {
    /// The selectable genres, `Random` first.
    pub fn vocabulary() -> &'static [Genre] {
        &VOCABULARY
    }

    /// The concrete genres `Random` draws from.
    pub fn concrete() -> &'static [Genre] {
        &VOCABULARY[1..]
    }

    pub fn is_random(&self) -> bool {
        matches!(self, Genre::Random)
    }

    /// Display name shown to users and sent to the model.
    pub fn label(&self) -> &str {
        match self {
            Genre::Random => "Random",
            Genre::Fantasy => "Fantasy",
            Genre::ScienceFiction => "Science Fiction",
            Genre::Mystery => "Mystery",
            Genre::Romance => "Romance",
            Genre::Horror => "Horror",
            Genre::Comedy => "Comedy",
            Genre::Thriller => "Thriller",
            Genre::Custom(name) => name,
        }
    }

    /// Resolve `Random` to one concrete genre drawn uniformly; any other
    /// genre is returned unchanged.
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> Genre {
        if !self.is_random() {
            return self.clone();
        }
        // concrete() is a non-empty constant slice
        Self::concrete()
            .choose(rng)
            .cloned()
            .unwrap_or(Genre::Fantasy)
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Genre {
    type Err = std::convert::Infallible;

    /// Case-insensitive over display names and kebab/snake spellings.
    /// Unknown non-empty text becomes [`Genre::Custom`]; empty text is `Random`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let key: String = trimmed
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        let genre = match key.as_str() {
            "" | "random" => Genre::Random,
            "fantasy" => Genre::Fantasy,
            "sciencefiction" | "scifi" => Genre::ScienceFiction,
            "mystery" => Genre::Mystery,
            "romance" => Genre::Romance,
            "horror" => Genre::Horror,
            "comedy" => Genre::Comedy,
            "thriller" => Genre::Thriller,
            _ => Genre::Custom(trimmed.to_string()),
        };
        Ok(genre)
    }
}

impl From<String> for Genre {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(genre) => genre,
            Err(never) => match never {},
        }
    }
}

impl From<Genre> for String {
    fn from(value: Genre) -> Self {
        value.label().to_string()
    }
}

/// Build the RNG used for genre resolution.
///
/// A fixed seed makes `Random` reproducible; otherwise the RNG is seeded
/// from OS entropy.
pub fn genre_rng(seed: Option<u64>) -> rand::rngs::StdRng {
    match seed {
        Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
        None => rand::rngs::StdRng::from_entropy(),
    }
}

/// Advisory story length, restricted to a fixed discrete set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct WordLimit(u32);

impl WordLimit {
    /// Allowed values, in selector order.
    pub const ALLOWED: [u32; 6] = [50, 100, 150, 200, 250, 300];

    pub fn new(words: u32) -> Result<Self, IntakeError> {
        if Self::ALLOWED.contains(&words) {
            Ok(Self(words))
        } else {
            Err(IntakeError::InvalidWordLimit(words))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Every allowed limit, for selectors.
    pub fn all() -> impl Iterator<Item = WordLimit> {
        Self::ALLOWED.into_iter().map(WordLimit)
    }
}

impl Default for WordLimit {
    fn default() -> Self {
        Self(100)
    }
}

impl TryFrom<u32> for WordLimit {
    type Error = IntakeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WordLimit> for u32 {
    fn from(value: WordLimit) -> Self {
        value.0
    }
}

impl fmt::Display for WordLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
