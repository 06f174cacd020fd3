//! Output formatting for CLI commands.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cli::args::{LugatArgs, OutputFormat};
use crate::error::Result;
use crate::level::{CefrLevel, Prediction};
use crate::model::inference::LevelSummary;
use crate::model::trainer::TrainReport;

/// Result structure for predictions.
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResults {
    pub predictions: Vec<Prediction>,
    /// Level the predictions were filtered to, if any.
    pub level: Option<CefrLevel>,
    pub summary: Option<LevelSummary>,
}

/// Model metadata as shown by `inspect`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub path: String,
    pub format_version: u32,
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub classes: Vec<CefrLevel>,
    pub vocabulary_size: usize,
    pub ngram_range: (usize, usize),
    pub min_df: usize,
    pub training_examples: usize,
    pub eval_examples: usize,
    pub accuracy: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Print a training report.
pub fn output_train_report(report: &TrainReport, args: &LugatArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            print!("{}", format_train_report(report, args.verbosity()));
            Ok(())
        }
        OutputFormat::Json => output_json(report, args),
    }
}

/// Print predictions.
pub fn output_predictions(results: &PredictionResults, args: &LugatArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            print!("{}", format_predictions(results));
            Ok(())
        }
        OutputFormat::Json => output_json(results, args),
    }
}

/// Print model metadata.
pub fn output_model_info(info: &ModelInfo, args: &LugatArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            print!("{}", format_model_info(info));
            Ok(())
        }
        OutputFormat::Json => output_json(info, args),
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &LugatArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// Render a training report. Row accounting is shown from verbosity 2.
pub fn format_train_report(report: &TrainReport, verbosity: u8) -> String {
    let mut out = String::new();

    if verbosity > 1 {
        let rows = &report.rows;
        let _ = writeln!(
            out,
            "Rows read: {} (invalid level: {}, empty headword: {}, duplicates: {})",
            rows.rows_read, rows.invalid_level, rows.empty_headword, rows.duplicates
        );
        let _ = writeln!(out, "Rows retained: {}", rows.retained);
        let _ = writeln!(
            out,
            "Split: {} train / {} eval",
            report.train_size, report.eval_size
        );
        let _ = writeln!(out, "Vocabulary size: {}", report.vocabulary_size);
        let _ = writeln!(
            out,
            "Solver: {} after {} iterations (loss {:.6})",
            if report.converged {
                "converged"
            } else {
                "stopped"
            },
            report.iterations,
            report.final_loss
        );
        out.push('\n');
    }

    let _ = writeln!(out, "Accuracy: {:.4}", report.evaluation.accuracy);
    out.push_str(&report.evaluation.render(4));
    let _ = writeln!(out, "\nSaved model: {}", report.artifact_path.display());
    out
}

/// Render predictions as `word<TAB>label` lines, followed by the summary.
pub fn format_predictions(results: &PredictionResults) -> String {
    let mut out = String::new();
    for prediction in &results.predictions {
        let _ = writeln!(out, "{}\t{}", prediction.word, prediction.level);
    }
    if let Some(summary) = &results.summary {
        out.push('\n');
        out.push_str(&format_summary(summary));
    }
    out
}

/// Render a level summary, one level per line.
pub fn format_summary(summary: &LevelSummary) -> String {
    let mut out = String::new();
    for (level, count) in &summary.counts {
        let _ = writeln!(out, "{level}: {count}");
    }
    if summary.unclassified > 0 {
        let _ = writeln!(out, "unclassified: {}", summary.unclassified);
    }
    let _ = writeln!(out, "total: {}", summary.total());
    out
}

/// Render model metadata.
pub fn format_model_info(info: &ModelInfo) -> String {
    let classes: Vec<&str> = info.classes.iter().map(|c| c.as_str()).collect();
    let mut out = String::new();
    let _ = writeln!(out, "Model: {}", info.path);
    let _ = writeln!(out, "Format version: {}", info.format_version);
    let _ = writeln!(out, "Trained with: lugat {}", info.version);
    let _ = writeln!(out, "Trained at: {}", info.trained_at.to_rfc3339());
    let _ = writeln!(out, "Classes: {}", classes.join(", "));
    let _ = writeln!(out, "Vocabulary size: {}", info.vocabulary_size);
    let _ = writeln!(
        out,
        "N-gram range: {}-{} (min_df {})",
        info.ngram_range.0, info.ngram_range.1, info.min_df
    );
    let _ = writeln!(
        out,
        "Examples: {} train / {} eval",
        info.training_examples, info.eval_examples
    );
    let _ = writeln!(out, "Held-out accuracy: {:.4}", info.accuracy);
    let _ = writeln!(
        out,
        "Solver: {} iterations ({})",
        info.iterations,
        if info.converged {
            "converged"
        } else {
            "not converged"
        }
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LevelLabel;

    #[test]
    fn test_format_predictions() {
        let results = PredictionResults {
            predictions: vec![
                Prediction {
                    word: "cat".to_string(),
                    level: LevelLabel::Level(CefrLevel::A1),
                },
                Prediction {
                    word: "!!!".to_string(),
                    level: LevelLabel::Unclassified,
                },
            ],
            level: None,
            summary: None,
        };
        assert_eq!(format_predictions(&results), "cat\tA1\n!!!\t-\n");
    }

    #[test]
    fn test_format_summary() {
        let summary = LevelSummary::from_labels(&[
            LevelLabel::Level(CefrLevel::B1),
            LevelLabel::Unclassified,
        ]);
        let text = format_summary(&summary);
        assert!(text.starts_with("A1: 0\n"));
        assert!(text.contains("B1: 1\n"));
        assert!(text.contains("unclassified: 1\n"));
        assert!(text.ends_with("total: 2\n"));
    }

    #[test]
    fn test_predictions_json_uses_label_text() {
        let results = PredictionResults {
            predictions: vec![
                Prediction {
                    word: "cat".to_string(),
                    level: LevelLabel::Level(CefrLevel::A1),
                },
                Prediction {
                    word: "!!!".to_string(),
                    level: LevelLabel::Unclassified,
                },
            ],
            level: None,
            summary: None,
        };
        assert_eq!(
            serde_json::to_string(&results).unwrap(),
            r#"{"predictions":[{"word":"cat","level":"A1"},{"word":"!!!","level":"-"}],"level":null,"summary":null}"#
        );
    }
}
