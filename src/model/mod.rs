//! Training, persisting and serving the CEFR level classifier.

pub mod artifact;
pub mod inference;
pub mod trainer;

pub use artifact::{FORMAT_MARKER, FORMAT_VERSION, LevelModel, ModelMetadata};
pub use inference::{
    CachedPredictor, LevelSummary, classify_batch, filter_by_level, load_model, predict_batch,
    predict_one, shared_predictor,
};
pub use trainer::{
    DEFAULT_DATASET_PATH, DEFAULT_MODEL_PATH, TrainConfig, TrainReport, evaluate, fit_model, train,
};
