//! Word-boundary-aware character n-gram tokenizer.

use serde::{Deserialize, Serialize};

use crate::error::{LugatError, Result};

/// Boundary marker placed before and after every word.
const BOUNDARY: char = ' ';

/// A tokenizer that generates character n-grams inside word boundaries.
///
/// Each whitespace-separated word is padded with a space on both sides and
/// n-grams of every length in `min_gram..=max_gram` are taken from the padded
/// word only, so no n-gram spans two words. A padded word that is not longer
/// than `n` contributes itself once and stops the longer lengths.
///
/// # Examples
///
/// ```
/// use lugat::analysis::CharWbNgramTokenizer;
///
/// let tokenizer = CharWbNgramTokenizer::new(3, 4).unwrap();
/// assert_eq!(
///     tokenizer.ngrams("cat"),
///     vec![" ca", "cat", "at ", " cat", "cat "]
/// );
///
/// // Short words are emitted whole.
/// let tokenizer = CharWbNgramTokenizer::new(3, 6).unwrap();
/// assert_eq!(tokenizer.ngrams("a"), vec![" a "]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharWbNgramTokenizer {
    /// Minimum n-gram size
    min_gram: usize,
    /// Maximum n-gram size
    max_gram: usize,
}

impl CharWbNgramTokenizer {
    /// Create a new tokenizer.
    ///
    /// # Errors
    ///
    /// Returns an error if `min_gram` is 0 or `max_gram` is less than `min_gram`.
    pub fn new(min_gram: usize, max_gram: usize) -> Result<Self> {
        if min_gram == 0 {
            return Err(LugatError::analysis("min_gram must be at least 1"));
        }
        if max_gram < min_gram {
            return Err(LugatError::analysis(format!(
                "max_gram ({max_gram}) must be >= min_gram ({min_gram})"
            )));
        }
        Ok(Self { min_gram, max_gram })
    }

    pub fn min_gram(&self) -> usize {
        self.min_gram
    }

    pub fn max_gram(&self) -> usize {
        self.max_gram
    }

    /// Generate all n-grams of `text`, in order of appearance.
    pub fn ngrams(&self, text: &str) -> Vec<String> {
        let mut grams = Vec::new();

        for word in text.split_whitespace() {
            let padded: Vec<char> = std::iter::once(BOUNDARY)
                .chain(word.chars())
                .chain(std::iter::once(BOUNDARY))
                .collect();
            let len = padded.len();

            for n in self.min_gram..=self.max_gram {
                let mut offset = 0;
                grams.push(padded[..n.min(len)].iter().collect());
                while offset + n < len {
                    offset += 1;
                    grams.push(padded[offset..offset + n].iter().collect());
                }
                if offset == 0 {
                    break;
                }
            }
        }

        grams
    }
}
