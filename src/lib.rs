//! # Lug'at
//!
//! CEFR proficiency level classification for English words.
//!
//! ## Features
//!
//! - One shared word normalizer for training and inference
//! - Word-boundary-aware character n-gram TF-IDF features
//! - Class-weighted multinomial logistic regression
//! - Deterministic stratified evaluation split
//! - Single-file model artifacts with validated loading
//! - Batched, cached inference with a `-` label for unclassifiable input
//!
//! ```no_run
//! use lugat::model::{load_model, predict_batch};
//!
//! let model = load_model(None)?;
//! let labels = predict_batch(&model, &["cat", "ubiquitous", "!!!"]);
//! assert_eq!(labels[2].to_string(), "-");
//! # Ok::<(), lugat::error::LugatError>(())
//! ```

pub mod analysis;
pub mod cli;
pub mod dataset;
pub mod error;
pub mod level;
pub mod ml;
pub mod model;

pub mod prelude {
    pub use crate::analysis::normalize;
    pub use crate::error::{LugatError, Result};
    pub use crate::level::{CefrLevel, LevelLabel, Prediction};
    pub use crate::model::{
        CachedPredictor, LevelModel, TrainConfig, load_model, predict_batch, predict_one, train,
    };
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
