//! Command implementations for the Lug'at CLI.

use std::path::Path;

use anyhow::{Context, bail};
use log::info;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::dataset::read_word_list;
use crate::level::Prediction;
use crate::model::artifact::FORMAT_VERSION;
use crate::model::inference::{LevelSummary, filter_by_level, load_model, shared_predictor};
use crate::model::trainer::{DEFAULT_MODEL_PATH, TrainConfig, train};

/// Execute a CLI command.
pub fn execute_command(args: LugatArgs) -> anyhow::Result<()> {
    match &args.command {
        Command::Train(train_args) => run_train(train_args, &args),
        Command::Predict(predict_args) => run_predict(predict_args, &args),
        Command::Inspect(inspect_args) => run_inspect(inspect_args, &args),
    }
}

/// Train a model and report on it.
fn run_train(args: &TrainArgs, cli_args: &LugatArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => TrainConfig::from_json_file(path)
            .with_context(|| format!("Failed to load training config {}", path.display()))?,
        None => TrainConfig::default(),
    };
    args.apply_to(&mut config);

    info!(
        "Training on {} -> {}",
        config.data_path.display(),
        config.output_path.display()
    );
    let report = train(&config)
        .with_context(|| format!("Training on {} failed", config.data_path.display()))?;

    output_train_report(&report, cli_args)?;
    Ok(())
}

/// Classify words from the command line and/or a word file.
fn run_predict(args: &PredictArgs, cli_args: &LugatArgs) -> anyhow::Result<()> {
    let mut words = args.words.clone();
    if let Some(file) = &args.file {
        let from_file = read_word_list(file)
            .with_context(|| format!("Failed to read words from {}", file.display()))?;
        words.extend(from_file);
    }
    if words.is_empty() {
        bail!("No words to classify: pass words as arguments or use --file");
    }

    let model_path = model_path(args.model.as_deref());
    let predictor = shared_predictor(Some(model_path))
        .with_context(|| format!("Failed to load model {}", model_path.display()))?;
    let labels = predictor.predict_batch(&words);

    let summary = args.summary.then(|| LevelSummary::from_labels(&labels));
    let predictions = match args.level {
        Some(level) => filter_by_level(&words, &labels, level)
            .into_iter()
            .map(|word| Prediction {
                word: word.to_string(),
                level: level.into(),
            })
            .collect(),
        None => words
            .iter()
            .zip(labels.iter())
            .map(|(word, label)| Prediction {
                word: word.clone(),
                level: *label,
            })
            .collect(),
    };

    output_predictions(
        &PredictionResults {
            predictions,
            level: args.level,
            summary,
        },
        cli_args,
    )?;
    Ok(())
}

/// Show the metadata stored in a model artifact.
fn run_inspect(args: &InspectArgs, cli_args: &LugatArgs) -> anyhow::Result<()> {
    let path = model_path(args.model.as_deref());
    let model =
        load_model(Some(path)).with_context(|| format!("Failed to load model {}", path.display()))?;
    let metadata = model.metadata();

    let info = ModelInfo {
        path: path.display().to_string(),
        format_version: FORMAT_VERSION,
        version: metadata.version.clone(),
        trained_at: metadata.trained_at,
        classes: model.classes().to_vec(),
        vocabulary_size: model.vectorizer().vocabulary_size(),
        ngram_range: metadata.ngram_range,
        min_df: metadata.min_df,
        training_examples: metadata.training_examples,
        eval_examples: metadata.eval_examples,
        accuracy: metadata.accuracy,
        iterations: metadata.iterations,
        converged: metadata.converged,
    };

    output_model_info(&info, cli_args)?;
    Ok(())
}

fn model_path(path: Option<&Path>) -> &Path {
    path.unwrap_or_else(|| Path::new(DEFAULT_MODEL_PATH))
}
