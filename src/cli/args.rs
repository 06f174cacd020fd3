//! Command line argument parsing for the Lug'at CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::level::CefrLevel;
use crate::model::trainer::TrainConfig;

/// Lug'at - CEFR word level classifier
#[derive(Parser, Debug, Clone)]
#[command(name = "lugat")]
#[command(about = "Train and run a CEFR level classifier for English words")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct LugatArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl LugatArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Train a model from a labeled dataset
    Train(TrainArgs),

    /// Predict the level of words
    Predict(PredictArgs),

    /// Show metadata of a trained model
    Inspect(InspectArgs),
}

/// Arguments for training
#[derive(Parser, Debug, Clone)]
pub struct TrainArgs {
    /// Labeled dataset (CSV with a header row)
    #[arg(short, long, value_name = "DATASET")]
    pub data: Option<PathBuf>,

    /// Where to write the model artifact
    #[arg(short, long, value_name = "MODEL_PATH")]
    pub out: Option<PathBuf>,

    /// JSON training configuration; flags override its values
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Name of the headword column (case-sensitive)
    #[arg(long)]
    pub headword_column: Option<String>,

    /// Name of the level column (case-sensitive)
    #[arg(long)]
    pub level_column: Option<String>,

    /// Field delimiter of the dataset
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Seed for the stratified split
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fraction of each level held out for evaluation
    #[arg(long)]
    pub test_ratio: Option<f64>,

    /// Maximum solver iterations
    #[arg(long)]
    pub max_iter: Option<usize>,
}

impl TrainArgs {
    /// Override `config` with the flags that were given.
    pub fn apply_to(&self, config: &mut TrainConfig) {
        if let Some(data) = &self.data {
            config.data_path = data.clone();
        }
        if let Some(out) = &self.out {
            config.output_path = out.clone();
        }
        if let Some(column) = &self.headword_column {
            config.headword_column = column.clone();
        }
        if let Some(column) = &self.level_column {
            config.level_column = column.clone();
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(ratio) = self.test_ratio {
            config.test_ratio = ratio;
        }
        if let Some(max_iter) = self.max_iter {
            config.max_iter = max_iter;
        }
    }
}

/// Arguments for prediction
#[derive(Parser, Debug, Clone)]
pub struct PredictArgs {
    /// Model artifact (defaults to models/cefr_model.bin)
    #[arg(short, long, env = "LUGAT_CEFR_MODEL", value_name = "MODEL_PATH")]
    pub model: Option<PathBuf>,

    /// Words to classify
    #[arg(value_name = "WORD")]
    pub words: Vec<String>,

    /// Read words from a file (CSV with an English column, or one word per line)
    #[arg(long, value_name = "WORD_FILE")]
    pub file: Option<PathBuf>,

    /// Only list the words predicted at this level
    #[arg(short, long)]
    pub level: Option<CefrLevel>,

    /// Print the number of words per level
    #[arg(short, long)]
    pub summary: bool,
}

/// Arguments for inspecting a model
#[derive(Parser, Debug, Clone)]
pub struct InspectArgs {
    /// Model artifact (defaults to models/cefr_model.bin)
    #[arg(short, long, env = "LUGAT_CEFR_MODEL", value_name = "MODEL_PATH")]
    pub model: Option<PathBuf>,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_args() {
        let args = LugatArgs::try_parse_from([
            "lugat",
            "train",
            "--data",
            "words.csv",
            "--out",
            "out/model.bin",
            "--level-column",
            "level",
            "--seed",
            "7",
        ])
        .unwrap();

        if let Command::Train(train_args) = args.command {
            let mut config = TrainConfig::default();
            train_args.apply_to(&mut config);
            assert_eq!(config.data_path, PathBuf::from("words.csv"));
            assert_eq!(config.output_path, PathBuf::from("out/model.bin"));
            assert_eq!(config.level_column, "level");
            assert_eq!(config.headword_column, "headword");
            assert_eq!(config.seed, 7);
            assert_eq!(config.test_ratio, 0.15);
        } else {
            panic!("Expected Train command");
        }
    }

    #[test]
    fn test_predict_args() {
        let args = LugatArgs::try_parse_from([
            "lugat",
            "predict",
            "--model",
            "m.bin",
            "--level",
            "b2",
            "--summary",
            "cat",
            "ubiquitous",
        ])
        .unwrap();

        if let Command::Predict(predict_args) = args.command {
            assert_eq!(predict_args.model, Some(PathBuf::from("m.bin")));
            assert_eq!(predict_args.words, vec!["cat", "ubiquitous"]);
            assert_eq!(predict_args.level, Some(CefrLevel::B2));
            assert!(predict_args.summary);
        } else {
            panic!("Expected Predict command");
        }
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        let result = LugatArgs::try_parse_from(["lugat", "predict", "--level", "D1", "cat"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verbosity_levels() {
        let args = LugatArgs::try_parse_from(["lugat", "inspect"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        let args = LugatArgs::try_parse_from(["lugat", "-vv", "inspect"]).unwrap();
        assert_eq!(args.verbosity(), 2);

        let args = LugatArgs::try_parse_from(["lugat", "--quiet", "inspect"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_output_format() {
        let args = LugatArgs::try_parse_from(["lugat", "--format", "json", "inspect"]).unwrap();
        assert_eq!(args.output_format, OutputFormat::Json);
    }
}
