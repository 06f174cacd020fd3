//! Text analysis for headwords: normalization and character n-grams.

pub mod ngram;
pub mod normalizer;

pub use ngram::CharWbNgramTokenizer;
pub use normalizer::{is_normalized_char, normalize};
