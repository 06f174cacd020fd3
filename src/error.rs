//! Error types for the Lug'at classification library.
//!
//! All fallible operations return [`LugatError`]. The variants follow the
//! three failure families of the training and inference pipeline:
//!
//! - configuration problems (missing dataset columns, missing model file,
//!   invalid settings) that are reported before any work is done,
//! - data-quality problems (classes too small to stratify, nothing left to
//!   train on) that are caught before splitting or fitting,
//! - artifact problems (unreadable, corrupt or incompatible model files).
//!
//! # Examples
//!
//! ```
//! use lugat::error::{LugatError, Result};
//!
//! fn check(ratio: f64) -> Result<()> {
//!     if !(0.0..1.0).contains(&ratio) {
//!         return Err(LugatError::invalid_config("test_ratio must be in (0, 1)"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check(1.5).is_err());
//! ```

use std::io;

use thiserror::Error;

use crate::level::CefrLevel;

/// The main error type for Lug'at operations.
#[derive(Error, Debug)]
pub enum LugatError {
    /// I/O errors (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// CSV parsing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The dataset header lacks one or more required columns.
    #[error("Missing required column(s): required {required:?}, found {found:?}")]
    MissingColumns {
        required: Vec<String>,
        found: Vec<String>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No model artifact exists at the given path.
    #[error("Model file not found: {path}")]
    ModelNotFound { path: String },

    /// A retained level has too few examples for a stratified split.
    #[error(
        "Level {level} has {count} example(s); at least 2 are required for a stratified split"
    )]
    InsufficientExamples { level: CefrLevel, count: usize },

    /// Fewer than two distinct levels remain after cleaning.
    #[error("At least 2 distinct levels are required for training, found {found}")]
    TooFewClasses { found: usize },

    /// Nothing is left to train on after cleaning.
    #[error("Dataset is empty after cleaning")]
    EmptyDataset,

    /// No n-gram occurs in enough training words to enter the vocabulary.
    #[error("No character n-gram occurs in at least {min_df} training words")]
    EmptyVocabulary { min_df: usize },

    /// The artifact exists but could not be decoded.
    #[error("Failed to load model from {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    /// The artifact could not be written.
    #[error("Failed to save model to {path}: {reason}")]
    ModelSave { path: String, reason: String },

    /// Analysis-related errors (tokenizer configuration, etc.)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with LugatError.
pub type Result<T> = std::result::Result<T, LugatError>;

impl LugatError {
    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        LugatError::InvalidConfig(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        LugatError::Analysis(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        LugatError::Serialization(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LugatError::Other(msg.into())
    }

    /// Create a new model load error.
    pub fn model_load<P: Into<String>, S: Into<String>>(path: P, reason: S) -> Self {
        LugatError::ModelLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new model save error.
    pub fn model_save<P: Into<String>, S: Into<String>>(path: P, reason: S) -> Self {
        LugatError::ModelSave {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by operator configuration (columns, paths, settings).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LugatError::MissingColumns { .. }
                | LugatError::InvalidConfig(_)
                | LugatError::ModelNotFound { .. }
        )
    }

    /// True for errors caused by the contents of the training data.
    pub fn is_data_quality(&self) -> bool {
        matches!(
            self,
            LugatError::InsufficientExamples { .. }
                | LugatError::TooFewClasses { .. }
                | LugatError::EmptyDataset
                | LugatError::EmptyVocabulary { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = LugatError::invalid_config("bad ratio");
        assert_eq!(error.to_string(), "Invalid configuration: bad ratio");
        assert!(error.is_configuration());

        let error = LugatError::model_load("models/x.bin", "truncated");
        assert_eq!(
            error.to_string(),
            "Failed to load model from models/x.bin: truncated"
        );
        assert!(!error.is_configuration());
    }

    #[test]
    fn test_missing_columns_message_names_both_sides() {
        let error = LugatError::MissingColumns {
            required: vec!["headword".to_string(), "CEFR".to_string()],
            found: vec!["word".to_string()],
        };
        let message = error.to_string();
        assert!(message.contains("headword"));
        assert!(message.contains("CEFR"));
        assert!(message.contains("word"));
    }

    #[test]
    fn test_data_quality_classification() {
        let error = LugatError::InsufficientExamples {
            level: CefrLevel::C2,
            count: 1,
        };
        assert!(error.is_data_quality());
        assert!(error.to_string().contains("C2"));
        assert!(LugatError::EmptyDataset.is_data_quality());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = LugatError::from(io_error);

        match error {
            LugatError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }
}
