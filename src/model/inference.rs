//! Classifying words with a loaded model.
//!
//! Words are normalized with the same [`normalize`] used for training. A word
//! that normalizes to nothing is labeled [`LevelLabel::Unclassified`] without
//! touching the model; every other word gets a level, even when none of its
//! n-grams were seen in training.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use log::debug;
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::normalize;
use crate::error::Result;
use crate::level::{CefrLevel, LevelLabel, Prediction};
use crate::model::artifact::LevelModel;
use crate::model::trainer::DEFAULT_MODEL_PATH;

/// Load a model from `path`, or from [`DEFAULT_MODEL_PATH`] when `None`.
pub fn load_model(path: Option<&Path>) -> Result<LevelModel> {
    LevelModel::load(path.unwrap_or_else(|| Path::new(DEFAULT_MODEL_PATH)))
}

/// Label a single word.
///
/// Equivalent to [`predict_batch`] on a one-element batch.
pub fn predict_one(model: &LevelModel, word: &str) -> LevelLabel {
    predict_batch(model, &[word])
        .into_iter()
        .next()
        .unwrap_or(LevelLabel::Unclassified)
}

/// Label every word of `words`, in order.
///
/// Unclassifiable words yield [`LevelLabel::Unclassified`] and never affect
/// the labels of the other words.
pub fn predict_batch<S: AsRef<str> + Sync>(model: &LevelModel, words: &[S]) -> Vec<LevelLabel> {
    words
        .par_iter()
        .map(|word| {
            let normalized = normalize(word.as_ref());
            if normalized.is_empty() {
                LevelLabel::Unclassified
            } else {
                LevelLabel::Level(model.predict_normalized(&normalized))
            }
        })
        .collect()
}

/// Like [`predict_batch`], pairing each input word with its label.
pub fn classify_batch<S: AsRef<str> + Sync>(model: &LevelModel, words: &[S]) -> Vec<Prediction> {
    words
        .iter()
        .zip(predict_batch(model, words))
        .map(|(word, level)| Prediction {
            word: word.as_ref().to_string(),
            level,
        })
        .collect()
}

/// A shared model with a cache of batch results keyed by the exact input.
///
/// The cache lives as long as the predictor and is never invalidated except
/// by [`clear`](Self::clear).
pub struct CachedPredictor {
    model: Arc<LevelModel>,
    cache: RwLock<AHashMap<Vec<String>, Arc<[LevelLabel]>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedPredictor {
    pub fn new(model: Arc<LevelModel>) -> Self {
        Self {
            model,
            cache: RwLock::new(AHashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn model(&self) -> &Arc<LevelModel> {
        &self.model
    }

    /// Labels for `words`, computed once per distinct batch.
    pub fn predict_batch<S: AsRef<str> + Sync>(&self, words: &[S]) -> Arc<[LevelLabel]> {
        let key: Vec<String> = words.iter().map(|w| w.as_ref().to_string()).collect();

        if let Some(labels) = self.cache.read().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Prediction cache hit ({} words)", key.len());
            return Arc::clone(labels);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let labels: Arc<[LevelLabel]> = predict_batch(&self.model, &key).into();
        Arc::clone(self.cache.write().entry(key).or_insert(labels))
    }

    pub fn predict_one(&self, word: &str) -> LevelLabel {
        self.predict_batch(&[word])
            .first()
            .copied()
            .unwrap_or(LevelLabel::Unclassified)
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Number of cached batches.
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    pub fn clear(&self) {
        self.cache.write().clear();
    }
}

static SHARED_PREDICTORS: LazyLock<Mutex<AHashMap<PathBuf, Arc<CachedPredictor>>>> =
    LazyLock::new(|| Mutex::new(AHashMap::new()));

/// Process-wide predictor for the model at `path` (default location when
/// `None`).
///
/// The first call for a path loads the model; later calls return the same
/// predictor and therefore share its cache. A failed load is not remembered.
pub fn shared_predictor(path: Option<&Path>) -> Result<Arc<CachedPredictor>> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));

    let mut predictors = SHARED_PREDICTORS.lock();
    if let Some(predictor) = predictors.get(&path) {
        return Ok(Arc::clone(predictor));
    }

    let predictor = Arc::new(CachedPredictor::new(Arc::new(LevelModel::load(&path)?)));
    predictors.insert(path, Arc::clone(&predictor));
    Ok(predictor)
}

/// Number of words per level, plus the unclassified ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSummary {
    /// Counts for all six levels, including zeros.
    pub counts: BTreeMap<CefrLevel, usize>,
    pub unclassified: usize,
}

impl LevelSummary {
    pub fn from_labels(labels: &[LevelLabel]) -> Self {
        let mut counts: BTreeMap<CefrLevel, usize> =
            CefrLevel::ALL.iter().map(|&level| (level, 0)).collect();
        let mut unclassified = 0;
        for label in labels {
            match label {
                LevelLabel::Level(level) => *counts.entry(*level).or_insert(0) += 1,
                LevelLabel::Unclassified => unclassified += 1,
            }
        }
        Self {
            counts,
            unclassified,
        }
    }

    pub fn count(&self, level: CefrLevel) -> usize {
        self.counts.get(&level).copied().unwrap_or(0)
    }

    /// Total number of labels summarized.
    pub fn total(&self) -> usize {
        self.counts.values().sum::<usize>() + self.unclassified
    }
}

/// The words whose label is `level`, in input order.
pub fn filter_by_level<'a, S: AsRef<str>>(
    words: &'a [S],
    labels: &[LevelLabel],
    level: CefrLevel,
) -> Vec<&'a str> {
    words
        .iter()
        .zip(labels)
        .filter(|(_, label)| label.level() == Some(level))
        .map(|(word, _)| word.as_ref())
        .collect()
}
