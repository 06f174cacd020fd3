//! TF-IDF vectorizer over character n-grams.

use std::collections::{BTreeMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::CharWbNgramTokenizer;
use crate::error::{LugatError, Result};

/// Sparse feature vector with strictly increasing indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Number of stored (non-zero) entries.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Dot product with a dense row.
    pub fn dot(&self, dense: &[f64]) -> f64 {
        self.iter().map(|(idx, value)| value * dense[idx]).sum()
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

/// TF-IDF vectorizer for character n-gram features.
///
/// Terms are the n-grams produced by a [`CharWbNgramTokenizer`]. Fitting keeps
/// the n-grams that occur in at least `min_df` documents, numbered in
/// lexicographic order. Transforming counts the kept n-grams of a document,
/// scales each count by its smoothed inverse document frequency
/// `ln((1 + n) / (1 + df)) + 1` and L2-normalizes the result.
#[derive(Clone, Serialize, Deserialize)]
pub struct TfIdfVectorizer {
    /// N-gram extraction parameters.
    tokenizer: CharWbNgramTokenizer,
    /// Minimum document frequency for a term to be kept.
    min_df: usize,
    /// Vocabulary: n-gram -> feature index.
    vocabulary: BTreeMap<String, usize>,
    /// Inverse document frequency for each feature.
    idf: Vec<f64>,
    /// Total number of documents seen during fitting.
    n_documents: usize,
}

impl std::fmt::Debug for TfIdfVectorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfIdfVectorizer")
            .field("tokenizer", &self.tokenizer)
            .field("min_df", &self.min_df)
            .field("vocabulary_size", &self.vocabulary.len())
            .field("n_documents", &self.n_documents)
            .finish()
    }
}

impl TfIdfVectorizer {
    /// Create an unfitted vectorizer.
    pub fn new(tokenizer: CharWbNgramTokenizer, min_df: usize) -> Self {
        Self {
            tokenizer,
            min_df: min_df.max(1),
            vocabulary: BTreeMap::new(),
            idf: Vec::new(),
            n_documents: 0,
        }
    }

    /// Fit the vocabulary and idf weights on training documents.
    ///
    /// Fails with [`LugatError::EmptyVocabulary`] when no n-gram reaches
    /// `min_df`.
    pub fn fit(&mut self, documents: &[String]) -> Result<()> {
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();

        for doc in documents {
            let unique: HashSet<String> = self.tokenizer.ngrams(doc).into_iter().collect();
            for gram in unique {
                *document_frequency.entry(gram).or_insert(0) += 1;
            }
        }

        let n = documents.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::new();
        for (gram, df) in document_frequency {
            if df >= self.min_df {
                vocabulary.insert(gram, idf.len());
                idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
            }
        }

        if vocabulary.is_empty() {
            return Err(LugatError::EmptyVocabulary {
                min_df: self.min_df,
            });
        }

        self.vocabulary = vocabulary;
        self.idf = idf;
        self.n_documents = documents.len();

        Ok(())
    }

    /// Transform one document into an L2-normalized TF-IDF vector.
    ///
    /// A document without any known n-gram maps to the empty vector.
    pub fn transform(&self, document: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for gram in self.tokenizer.ngrams(document) {
            if let Some(&idx) = self.vocabulary.get(&gram) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut vector = SparseVector {
            indices: Vec::with_capacity(counts.len()),
            values: Vec::with_capacity(counts.len()),
        };
        for (idx, count) in counts {
            vector.indices.push(idx);
            vector.values.push(count * self.idf[idx]);
        }

        let norm = vector.norm();
        if norm > 0.0 {
            for value in &mut vector.values {
                *value /= norm;
            }
        }

        vector
    }

    /// Transform many documents in parallel, preserving order.
    pub fn transform_batch<S: AsRef<str> + Sync>(&self, documents: &[S]) -> Vec<SparseVector> {
        documents
            .par_iter()
            .map(|doc| self.transform(doc.as_ref()))
            .collect()
    }

    /// Fit on `documents` and return their vectors.
    pub fn fit_transform(&mut self, documents: &[String]) -> Result<Vec<SparseVector>> {
        self.fit(documents)?;
        Ok(self.transform_batch(documents))
    }

    /// Number of features.
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn n_documents(&self) -> usize {
        self.n_documents
    }

    pub fn min_df(&self) -> usize {
        self.min_df
    }

    pub fn tokenizer(&self) -> &CharWbNgramTokenizer {
        &self.tokenizer
    }

    /// Inverse document frequency of an n-gram, if it is in the vocabulary.
    pub fn idf_of(&self, gram: &str) -> Option<f64> {
        self.vocabulary.get(gram).map(|&idx| self.idf[idx])
    }

    /// Check internal consistency after deserialization.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.idf.len() != self.vocabulary.len() {
            return Err(LugatError::serialization(format!(
                "vectorizer has {} idf weights for {} terms",
                self.idf.len(),
                self.vocabulary.len()
            )));
        }
        if self.vocabulary.values().any(|&idx| idx >= self.idf.len()) {
            return Err(LugatError::serialization(
                "vectorizer vocabulary index out of range",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectorizer(min_df: usize) -> TfIdfVectorizer {
        TfIdfVectorizer::new(CharWbNgramTokenizer::new(3, 6).unwrap(), min_df)
    }

    fn docs(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_min_df_prunes_rare_grams() {
        let mut v = vectorizer(2);
        v.fit(&docs(&["cat", "cats", "dog"])).unwrap();

        assert!(v.idf_of(" ca").is_some());
        assert!(v.idf_of("cat").is_some());
        assert!(v.idf_of("dog").is_none());
        assert_eq!(v.n_documents(), 3);
    }

    #[test]
    fn test_smoothed_idf() {
        let mut v = vectorizer(1);
        v.fit(&docs(&["cat", "cats", "dog"])).unwrap();

        let common = v.idf_of("cat").unwrap();
        let rare = v.idf_of("dog").unwrap();
        assert!((common - ((4.0f64 / 3.0).ln() + 1.0)).abs() < 1e-12);
        assert!((rare - (2.0f64.ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_transform_is_normalized_and_sorted() {
        let mut v = vectorizer(1);
        v.fit(&docs(&["cat", "cattle", "dog"])).unwrap();

        let vector = v.transform("cat");
        assert!(!vector.is_empty());
        assert!((vector.norm() - 1.0).abs() < 1e-12);
        assert!(vector.indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_unknown_document_is_empty() {
        let mut v = vectorizer(1);
        v.fit(&docs(&["cat", "dog"])).unwrap();

        assert!(v.transform("xyz").is_empty());
        assert!(v.transform("").is_empty());
    }

    #[test]
    fn test_empty_vocabulary_is_an_error() {
        let mut v = vectorizer(2);
        let err = v.fit(&docs(&["cat", "dog"])).unwrap_err();
        assert!(matches!(err, LugatError::EmptyVocabulary { min_df: 2 }));
    }

    #[test]
    fn test_batch_matches_single() {
        let mut v = vectorizer(1);
        let documents = docs(&["apple", "application", "apply", "banana"]);
        let batch = v.fit_transform(&documents).unwrap();

        for (doc, vector) in documents.iter().zip(&batch) {
            assert_eq!(&v.transform(doc), vector);
        }
    }

    #[test]
    fn test_sparse_dot() {
        let vector = SparseVector {
            indices: vec![0, 2],
            values: vec![0.5, 2.0],
        };
        assert_eq!(vector.dot(&[2.0, 100.0, 3.0]), 7.0);
        assert_eq!(vector.nnz(), 2);
    }
}
