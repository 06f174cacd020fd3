//! Multi-class evaluation metrics.

use std::collections::BTreeSet;
use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::level::CefrLevel;

/// Precision, recall and F1 for one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub level: CefrLevel,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true examples of this level.
    pub support: usize,
}

/// Averaged precision, recall and F1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Accuracy plus per-level and averaged metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    /// One entry per level seen in either the truth or the predictions, ascending.
    pub classes: Vec<ClassMetrics>,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Fraction of positions where prediction and truth agree.
pub fn accuracy(y_true: &[CefrLevel], y_pred: &[CefrLevel]) -> f64 {
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    ratio(correct, y_true.len())
}

impl ClassificationReport {
    /// Compute the report. Undefined precision or recall (no predictions or
    /// no examples of a level) counts as 0.
    pub fn compute(y_true: &[CefrLevel], y_pred: &[CefrLevel]) -> Self {
        let levels: BTreeSet<CefrLevel> = y_true.iter().chain(y_pred).copied().collect();

        let classes: Vec<ClassMetrics> = levels
            .into_iter()
            .map(|level| {
                let mut tp = 0;
                let mut predicted = 0;
                let mut support = 0;
                for (t, p) in y_true.iter().zip(y_pred) {
                    if *p == level {
                        predicted += 1;
                    }
                    if *t == level {
                        support += 1;
                        if *p == level {
                            tp += 1;
                        }
                    }
                }
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    level,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        let total: usize = classes.iter().map(|c| c.support).sum();
        let n_classes = classes.len().max(1) as f64;
        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n_classes,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n_classes,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / n_classes,
            support: total,
        };
        let weighted = |value: fn(&ClassMetrics) -> f64| {
            if total == 0 {
                0.0
            } else {
                classes
                    .iter()
                    .map(|c| value(c) * c.support as f64)
                    .sum::<f64>()
                    / total as f64
            }
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
            support: total,
        };

        ClassificationReport {
            accuracy: accuracy(y_true, y_pred),
            classes,
            macro_avg,
            weighted_avg,
        }
    }

    /// Metrics for one level, if it appears in the report.
    pub fn class(&self, level: CefrLevel) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.level == level)
    }

    /// Render as a fixed-width table with `digits` decimals.
    pub fn render(&self, digits: usize) -> String {
        let width = digits + 6;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>12} {:>width$} {:>width$} {:>width$} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        );
        out.push('\n');
        for c in &self.classes {
            let _ = writeln!(
                out,
                "{:>12} {:>width$.digits$} {:>width$.digits$} {:>width$.digits$} {:>9}",
                c.level.as_str(),
                c.precision,
                c.recall,
                c.f1,
                c.support
            );
        }
        out.push('\n');
        let _ = writeln!(
            out,
            "{:>12} {:>width$} {:>width$} {:>width$.digits$} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        );
        for (name, avg) in [
            ("macro avg", &self.macro_avg),
            ("weighted avg", &self.weighted_avg),
        ] {
            let _ = writeln!(
                out,
                "{:>12} {:>width$.digits$} {:>width$.digits$} {:>width$.digits$} {:>9}",
                name, avg.precision, avg.recall, avg.f1, avg.support
            );
        }
        out
    }
}
