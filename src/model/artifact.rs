//! The persisted classifier: vectorizer, weights and training metadata.
//!
//! An artifact file is a short header (`LGCF` marker and format version)
//! followed by the bincode encoding of [`LevelModel`]. Saving goes through a
//! temporary file in the target directory that is renamed into place, so a
//! failed save never leaves a partial artifact behind.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::analysis::normalize;
use crate::error::{LugatError, Result};
use crate::level::CefrLevel;
use crate::ml::logistic::SoftmaxRegression;
use crate::ml::tfidf::TfIdfVectorizer;

/// Leading bytes of every artifact file.
pub const FORMAT_MARKER: [u8; 4] = *b"LGCF";

/// Artifact format version written by this build.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactHeader {
    marker: [u8; 4],
    version: u32,
}

/// Information about the training run that produced a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version that trained the model.
    pub version: String,
    /// Training timestamp.
    pub trained_at: DateTime<Utc>,
    /// Number of examples the classifier was fitted on.
    pub training_examples: usize,
    /// Number of held-out examples used for evaluation.
    pub eval_examples: usize,
    pub vocabulary_size: usize,
    /// Inclusive character n-gram length range.
    pub ngram_range: (usize, usize),
    pub min_df: usize,
    pub iterations: usize,
    pub converged: bool,
    /// Accuracy on the held-out partition.
    pub accuracy: f64,
    /// Solver and split hyperparameters.
    pub hyperparameters: BTreeMap<String, f64>,
}

/// A fitted vectorizer and classifier, loaded and used as one unit.
///
/// The value is immutable once built; share it across threads behind an
/// [`Arc`](std::sync::Arc).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelModel {
    metadata: ModelMetadata,
    vectorizer: TfIdfVectorizer,
    classifier: SoftmaxRegression,
}

impl LevelModel {
    /// Assemble a model from its fitted parts.
    ///
    /// Fails if the classifier was fitted on a different feature space than
    /// the vectorizer produces.
    pub fn new(
        metadata: ModelMetadata,
        vectorizer: TfIdfVectorizer,
        classifier: SoftmaxRegression,
    ) -> Result<Self> {
        let model = Self {
            metadata,
            vectorizer,
            classifier,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn vectorizer(&self) -> &TfIdfVectorizer {
        &self.vectorizer
    }

    pub fn classifier(&self) -> &SoftmaxRegression {
        &self.classifier
    }

    /// Levels the classifier can predict, ascending.
    pub fn classes(&self) -> &[CefrLevel] {
        self.classifier.classes()
    }

    /// Record the size of the held-out partition and the accuracy reached on it.
    pub(crate) fn with_evaluation(mut self, eval_examples: usize, accuracy: f64) -> Self {
        self.metadata.eval_examples = eval_examples;
        self.metadata.accuracy = accuracy;
        self
    }

    /// Predict the level of an already-normalized, non-empty word.
    pub fn predict_normalized(&self, word: &str) -> CefrLevel {
        self.classifier.predict(&self.vectorizer.transform(word))
    }

    /// Class probabilities for `word`, in [`classes`](Self::classes) order.
    ///
    /// Returns `None` when the word normalizes to nothing.
    pub fn predict_proba(&self, word: &str) -> Option<Vec<(CefrLevel, f64)>> {
        let normalized = normalize(word);
        if normalized.is_empty() {
            return None;
        }
        let proba = self
            .classifier
            .predict_proba(&self.vectorizer.transform(&normalized));
        Some(self.classes().iter().copied().zip(proba).collect())
    }

    /// Write the artifact to `path`, creating parent directories as needed.
    ///
    /// An existing file at `path` is replaced only once the new artifact has
    /// been written completely.
    pub fn save(&self, path: &Path) -> Result<()> {
        let display = path.display().to_string();
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .map_err(|e| LugatError::model_save(&display, e.to_string()))?;

        let mut temp_file = NamedTempFile::new_in(parent)
            .map_err(|e| LugatError::model_save(&display, e.to_string()))?;
        {
            let mut writer = BufWriter::new(temp_file.as_file_mut());
            let header = ArtifactHeader {
                marker: FORMAT_MARKER,
                version: FORMAT_VERSION,
            };
            bincode::serialize_into(&mut writer, &header)
                .and_then(|_| bincode::serialize_into(&mut writer, self))
                .map_err(|e| LugatError::model_save(&display, e.to_string()))?;
            writer
                .flush()
                .map_err(|e| LugatError::model_save(&display, e.to_string()))?;
        }

        temp_file
            .persist(path)
            .map_err(|e| LugatError::model_save(&display, e.error.to_string()))?;

        info!("Saved model to {display}");
        Ok(())
    }

    /// Read and validate an artifact.
    ///
    /// A missing file yields [`LugatError::ModelNotFound`]; anything that
    /// cannot be decoded into a consistent model yields
    /// [`LugatError::ModelLoad`].
    pub fn load(path: &Path) -> Result<Self> {
        let display = path.display().to_string();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LugatError::ModelNotFound {
                path: display.clone(),
            },
            _ => LugatError::model_load(&display, e.to_string()),
        })?;
        let mut reader = BufReader::new(file);

        let header: ArtifactHeader = bincode::deserialize_from(&mut reader)
            .map_err(|e| LugatError::model_load(&display, format!("unreadable header: {e}")))?;
        if header.marker != FORMAT_MARKER {
            return Err(LugatError::model_load(&display, "not a model artifact"));
        }
        if header.version != FORMAT_VERSION {
            return Err(LugatError::model_load(
                &display,
                format!(
                    "unsupported format version {} (expected {FORMAT_VERSION})",
                    header.version
                ),
            ));
        }

        let model: LevelModel = bincode::deserialize_from(&mut reader)
            .map_err(|e| LugatError::model_load(&display, e.to_string()))?;
        model
            .validate()
            .map_err(|e| LugatError::model_load(&display, e.to_string()))?;

        info!(
            "Loaded model from {display} ({} classes, {} features)",
            model.classes().len(),
            model.vectorizer.vocabulary_size()
        );
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        self.vectorizer.validate()?;
        self.classifier.validate()?;
        if self.classifier.n_features() != self.vectorizer.vocabulary_size() {
            return Err(LugatError::serialization(format!(
                "classifier expects {} features but the vectorizer produces {}",
                self.classifier.n_features(),
                self.vectorizer.vocabulary_size()
            )));
        }
        Ok(())
    }
}
