//! Offline training: dataset file in, evaluated model artifact out.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::CharWbNgramTokenizer;
use crate::dataset::{
    DatasetReader, LabeledExample, PrepareStats, check_stratifiable, prepare, stratified_split,
};
use crate::error::{LugatError, Result};
use crate::level::CefrLevel;
use crate::ml::logistic::{ClassWeight, FitSummary, LogisticRegressionParams, SoftmaxRegression};
use crate::ml::metrics::ClassificationReport;
use crate::ml::tfidf::TfIdfVectorizer;
use crate::model::artifact::{LevelModel, ModelMetadata};

/// Default location of the labeled training dataset.
pub const DEFAULT_DATASET_PATH: &str = "data/ENGLISH_CERF_WORDS.csv";

/// Default location of the model artifact.
pub const DEFAULT_MODEL_PATH: &str = "models/cefr_model.bin";

/// Training run configuration. Every field has a default, so a JSON config
/// file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub data_path: PathBuf,
    pub output_path: PathBuf,
    /// Exact, case-sensitive name of the headword column.
    pub headword_column: String,
    /// Exact, case-sensitive name of the level column.
    pub level_column: String,
    pub delimiter: char,
    /// Fraction of each level held out for evaluation.
    pub test_ratio: f64,
    pub seed: u64,
    pub ngram_min: usize,
    pub ngram_max: usize,
    /// Minimum number of training words an n-gram must occur in.
    pub min_df: usize,
    pub max_iter: usize,
    /// Inverse L2 regularization strength.
    pub c: f64,
    pub tolerance: f64,
    pub class_weight: ClassWeight,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATASET_PATH),
            output_path: PathBuf::from(DEFAULT_MODEL_PATH),
            headword_column: "headword".to_string(),
            level_column: "CEFR".to_string(),
            delimiter: ',',
            test_ratio: 0.15,
            seed: 42,
            ngram_min: 3,
            ngram_max: 6,
            min_df: 2,
            max_iter: 4000,
            c: 1.0,
            tolerance: 1e-4,
            class_weight: ClassWeight::Balanced,
        }
    }
}

impl TrainConfig {
    /// Load a configuration from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            LugatError::invalid_config(format!("cannot read config {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Reject settings that cannot produce a model.
    pub fn validate(&self) -> Result<()> {
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(LugatError::invalid_config(format!(
                "test_ratio must be in (0, 1), got {}",
                self.test_ratio
            )));
        }
        if self.ngram_min == 0 || self.ngram_max < self.ngram_min {
            return Err(LugatError::invalid_config(format!(
                "invalid n-gram range {}..={}",
                self.ngram_min, self.ngram_max
            )));
        }
        if self.min_df == 0 {
            return Err(LugatError::invalid_config("min_df must be at least 1"));
        }
        if self.max_iter == 0 {
            return Err(LugatError::invalid_config("max_iter must be at least 1"));
        }
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(LugatError::invalid_config(format!(
                "C must be positive, got {}",
                self.c
            )));
        }
        if !(self.tolerance > 0.0) {
            return Err(LugatError::invalid_config("tolerance must be positive"));
        }
        if !self.delimiter.is_ascii() {
            return Err(LugatError::invalid_config(format!(
                "delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            )));
        }
        if self.headword_column == self.level_column {
            return Err(LugatError::invalid_config(
                "headword and level columns must differ",
            ));
        }
        Ok(())
    }

    pub fn solver_params(&self) -> LogisticRegressionParams {
        LogisticRegressionParams {
            c: self.c,
            max_iter: self.max_iter,
            tolerance: self.tolerance,
            class_weight: self.class_weight,
            ..Default::default()
        }
    }

    fn hyperparameters(&self) -> BTreeMap<String, f64> {
        let mut params = BTreeMap::new();
        params.insert("c".to_string(), self.c);
        params.insert("max_iter".to_string(), self.max_iter as f64);
        params.insert("tolerance".to_string(), self.tolerance);
        params.insert("test_ratio".to_string(), self.test_ratio);
        params.insert("seed".to_string(), self.seed as f64);
        params.insert(
            "balanced".to_string(),
            match self.class_weight {
                ClassWeight::Balanced => 1.0,
                ClassWeight::None => 0.0,
            },
        );
        params
    }
}

/// Everything a training run reports back to the operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainReport {
    /// Row accounting from cleaning.
    pub rows: PrepareStats,
    pub train_size: usize,
    pub eval_size: usize,
    pub train_counts: BTreeMap<CefrLevel, usize>,
    pub eval_counts: BTreeMap<CefrLevel, usize>,
    pub vocabulary_size: usize,
    pub iterations: usize,
    pub converged: bool,
    pub final_loss: f64,
    /// Metrics on the held-out partition.
    pub evaluation: ClassificationReport,
    pub artifact_path: PathBuf,
}

/// Fit a vectorizer and classifier on `examples`.
///
/// The returned model carries metadata for the fit only; evaluation fields
/// are left at zero.
pub fn fit_model(
    examples: &[LabeledExample],
    config: &TrainConfig,
) -> Result<(LevelModel, FitSummary)> {
    let tokenizer = CharWbNgramTokenizer::new(config.ngram_min, config.ngram_max)?;
    let mut vectorizer = TfIdfVectorizer::new(tokenizer, config.min_df);

    let words: Vec<String> = examples.iter().map(|e| e.headword.clone()).collect();
    let labels: Vec<CefrLevel> = examples.iter().map(|e| e.level).collect();

    let features = vectorizer.fit_transform(&words)?;
    info!(
        "Vocabulary: {} character n-grams ({}..={}, min_df {})",
        vectorizer.vocabulary_size(),
        config.ngram_min,
        config.ngram_max,
        config.min_df
    );

    let (classifier, summary) = SoftmaxRegression::fit(
        &features,
        &labels,
        vectorizer.vocabulary_size(),
        &config.solver_params(),
    )?;

    let metadata = ModelMetadata {
        version: crate::VERSION.to_string(),
        trained_at: Utc::now(),
        training_examples: examples.len(),
        eval_examples: 0,
        vocabulary_size: vectorizer.vocabulary_size(),
        ngram_range: (config.ngram_min, config.ngram_max),
        min_df: config.min_df,
        iterations: summary.iterations,
        converged: summary.converged,
        accuracy: 0.0,
        hyperparameters: config.hyperparameters(),
    };

    Ok((LevelModel::new(metadata, vectorizer, classifier)?, summary))
}

/// Predict levels for held-out examples and score them.
pub fn evaluate(model: &LevelModel, examples: &[LabeledExample]) -> ClassificationReport {
    let y_true: Vec<CefrLevel> = examples.iter().map(|e| e.level).collect();
    let y_pred: Vec<CefrLevel> = examples
        .par_iter()
        .map(|e| model.predict_normalized(&e.headword))
        .collect();
    ClassificationReport::compute(&y_true, &y_pred)
}

/// Run the full training pipeline and write the artifact.
///
/// Reads and cleans the dataset, checks that every level can be stratified,
/// splits, fits on the training partition, evaluates on the held-out one and
/// saves the model to `config.output_path`. Nothing is written unless every
/// step succeeds.
pub fn train(config: &TrainConfig) -> Result<TrainReport> {
    config.validate()?;

    let reader = DatasetReader::new(&config.headword_column, &config.level_column)
        .with_delimiter(config.delimiter as u8);
    let raw = reader.read_path(&config.data_path)?;

    let prepared = prepare(&raw.records);
    check_stratifiable(&prepared.examples)?;

    let split = stratified_split(&prepared.examples, config.test_ratio, config.seed)?;

    let (model, summary) = fit_model(&split.train, config)?;
    let evaluation = evaluate(&model, &split.eval);
    info!("Held-out accuracy: {:.4}", evaluation.accuracy);

    let model = model.with_evaluation(split.eval.len(), evaluation.accuracy);

    model.save(&config.output_path)?;

    Ok(TrainReport {
        rows: prepared.stats,
        train_size: split.train.len(),
        eval_size: split.eval.len(),
        train_counts: split.train_counts(),
        eval_counts: split.eval_counts(),
        vocabulary_size: model.vectorizer().vocabulary_size(),
        iterations: summary.iterations,
        converged: summary.converged,
        final_loss: summary.final_loss,
        evaluation,
        artifact_path: config.output_path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TrainConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.output_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!((config.ngram_min, config.ngram_max, config.min_df), (3, 6, 2));
        assert!(config.max_iter >= 1000);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            TrainConfig {
                test_ratio: 1.0,
                ..Default::default()
            },
            TrainConfig {
                ngram_min: 0,
                ..Default::default()
            },
            TrainConfig {
                ngram_min: 5,
                ngram_max: 4,
                ..Default::default()
            },
            TrainConfig {
                c: 0.0,
                ..Default::default()
            },
            TrainConfig {
                delimiter: 'é',
                ..Default::default()
            },
        ];
        for config in bad {
            let err = config.validate().unwrap_err();
            assert!(err.is_configuration(), "{err}");
        }
    }

    #[test]
    fn test_partial_json_config() {
        let config: TrainConfig =
            serde_json::from_str(r#"{"seed": 7, "class_weight": "none"}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.class_weight, ClassWeight::None);
        assert_eq!(config.level_column, "CEFR");
        assert_eq!(config.test_ratio, 0.15);
    }

    #[test]
    fn test_fit_model_on_examples() {
        let examples: Vec<LabeledExample> = [
            ("cat", CefrLevel::A1),
            ("cats", CefrLevel::A1),
            ("catch", CefrLevel::A1),
            ("esoteric", CefrLevel::C2),
            ("esoterica", CefrLevel::C2),
            ("esoterically", CefrLevel::C2),
        ]
        .iter()
        .map(|(w, l)| LabeledExample::new(*w, *l))
        .collect();

        let (model, summary) = fit_model(&examples, &TrainConfig::default()).unwrap();
        assert!(summary.converged);
        assert_eq!(model.classes(), &[CefrLevel::A1, CefrLevel::C2]);

        let report = evaluate(&model, &examples);
        assert_eq!(report.accuracy, 1.0);
    }
}
