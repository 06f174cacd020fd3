//! Feature extraction, classification and evaluation.
//!
//! - [`tfidf`]: character n-gram TF-IDF features over normalized headwords
//! - [`logistic`]: class-weighted multinomial logistic regression
//! - [`metrics`]: accuracy and per-level precision/recall/F1

pub mod logistic;
pub mod metrics;
pub mod tfidf;

pub use logistic::{ClassWeight, FitSummary, LogisticRegressionParams, SoftmaxRegression};
pub use metrics::{AverageMetrics, ClassMetrics, ClassificationReport, accuracy};
pub use tfidf::{SparseVector, TfIdfVectorizer};
