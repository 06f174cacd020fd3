//! Integration tests for the training pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use lugat::dataset::{DatasetReader, prepare, stratified_split};
use lugat::error::{LugatError, Result};
use lugat::level::{CefrLevel, LevelLabel};
use lugat::model::{TrainConfig, load_model, predict_one, train};
use tempfile::TempDir;

const A1_WORDS: [&str; 8] = [
    "cat", "cats", "catch", "cattle", "catnap", "catty", "catfish", "catwalk",
];

const C2_WORDS: [&str; 8] = [
    "ubiquitous",
    "ubiquity",
    "ubiquitously",
    "esoteric",
    "esoterica",
    "esoterically",
    "obfuscate",
    "obfuscation",
];

fn write_dataset(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("words.csv");
    fs::write(&path, content).unwrap();
    path
}

fn two_level_csv() -> String {
    let mut csv = String::from("headword,pos,CEFR\n");
    for word in A1_WORDS {
        csv.push_str(&format!("{word},noun,A1\n"));
    }
    for word in C2_WORDS {
        csv.push_str(&format!("{word},adj,C2\n"));
    }
    csv
}

fn config_for(dir: &Path, data: &Path) -> TrainConfig {
    TrainConfig {
        data_path: data.to_path_buf(),
        output_path: dir.join("models").join("cefr_model.bin"),
        ..Default::default()
    }
}

#[test]
fn test_two_level_training_writes_artifact() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let data = write_dataset(temp_dir.path(), &two_level_csv());
    let config = config_for(temp_dir.path(), &data);

    let report = train(&config)?;

    assert!(config.output_path.exists());
    assert_eq!(report.artifact_path, config.output_path);
    assert_eq!(report.rows.rows_read, 16);
    assert_eq!(report.rows.retained, 16);
    assert_eq!(report.train_size + report.eval_size, 16);
    assert_eq!(report.eval_counts[&CefrLevel::A1], 1);
    assert_eq!(report.eval_counts[&CefrLevel::C2], 1);
    assert!(report.vocabulary_size > 0);
    assert!((0.0..=1.0).contains(&report.evaluation.accuracy));

    let model = load_model(Some(&config.output_path))?;
    assert_eq!(model.classes(), &[CefrLevel::A1, CefrLevel::C2]);
    assert_eq!(model.metadata().eval_examples, report.eval_size);
    assert_eq!(
        predict_one(&model, "cat"),
        LevelLabel::Level(CefrLevel::A1)
    );
    assert_eq!(
        predict_one(&model, "ubiquitous"),
        LevelLabel::Level(CefrLevel::C2)
    );

    Ok(())
}

#[test]
fn test_missing_level_column_is_configuration_error() {
    let temp_dir = TempDir::new().unwrap();
    let data = write_dataset(temp_dir.path(), "headword,pos\ncat,noun\ndog,noun\n");
    let config = config_for(temp_dir.path(), &data);

    let err = train(&config).unwrap_err();
    assert!(err.is_configuration());
    match &err {
        LugatError::MissingColumns { required, found } => {
            assert_eq!(required, &vec!["headword".to_string(), "CEFR".to_string()]);
            assert_eq!(found, &vec!["headword".to_string(), "pos".to_string()]);
        }
        other => panic!("expected MissingColumns, got {other:?}"),
    }
    assert!(!config.output_path.exists());
}

#[test]
fn test_single_example_class_is_data_quality_error() {
    let temp_dir = TempDir::new().unwrap();
    let mut csv = two_level_csv();
    csv.push_str("serendipity,noun,B2\n");
    let data = write_dataset(temp_dir.path(), &csv);
    let config = config_for(temp_dir.path(), &data);

    let err = train(&config).unwrap_err();
    assert!(err.is_data_quality());
    assert!(matches!(
        err,
        LugatError::InsufficientExamples {
            level: CefrLevel::B2,
            count: 1
        }
    ));
    assert!(!config.output_path.exists());
}

#[test]
fn test_unusable_rows_are_dropped_before_checks() {
    let temp_dir = TempDir::new().unwrap();
    let mut csv = two_level_csv();
    csv.push_str("!!!,noun,B1\n");
    csv.push_str("serendipity,noun,X9\n");
    csv.push_str("CAT ,noun, a1\n");
    let data = write_dataset(temp_dir.path(), &csv);
    let config = config_for(temp_dir.path(), &data);

    let report = train(&config).unwrap();
    assert_eq!(report.rows.rows_read, 19);
    assert_eq!(report.rows.empty_headword, 1);
    assert_eq!(report.rows.invalid_level, 1);
    assert_eq!(report.rows.duplicates, 1);
    assert_eq!(report.rows.retained, 16);
    assert!(!report.train_counts.contains_key(&CefrLevel::B1));
}

#[test]
fn test_deduplication_keeps_conflicting_levels() -> Result<()> {
    let csv = "headword,CEFR\nLight,A1\nlight,A1\nlight,B1\n light ,b1\nrun,A1\n";
    let raw = DatasetReader::default().read_from(csv.as_bytes())?;
    let prepared = prepare(&raw.records);

    assert_eq!(prepared.stats.duplicates, 2);
    let light: Vec<CefrLevel> = prepared
        .examples
        .iter()
        .filter(|e| e.headword == "light")
        .map(|e| e.level)
        .collect();
    assert_eq!(light, vec![CefrLevel::A1, CefrLevel::B1]);
    Ok(())
}

#[test]
fn test_same_seed_same_split() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let data = write_dataset(temp_dir.path(), &two_level_csv());

    let raw = DatasetReader::default().read_path(&data)?;
    let examples = prepare(&raw.records).examples;
    let first = stratified_split(&examples, 0.15, 42)?;
    let second = stratified_split(&examples, 0.15, 42)?;
    assert_eq!(first.train, second.train);
    assert_eq!(first.eval, second.eval);

    let config = config_for(temp_dir.path(), &data);
    let first_report = train(&config)?;
    let second_report = train(&config)?;
    assert_eq!(first_report.train_counts, second_report.train_counts);
    assert_eq!(first_report.eval_counts, second_report.eval_counts);
    assert_eq!(first_report.vocabulary_size, second_report.vocabulary_size);

    Ok(())
}

#[test]
fn test_missing_dataset_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_for(temp_dir.path(), &temp_dir.path().join("absent.csv"));

    let err = train(&config).unwrap_err();
    assert!(err.is_configuration());
    assert!(!config.output_path.exists());
}

#[test]
fn test_json_config_file() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("train.json");
    fs::write(&path, r#"{"level_column": "level", "seed": 3}"#).unwrap();

    let config = TrainConfig::from_json_file(&path)?;
    assert_eq!(config.level_column, "level");
    assert_eq!(config.seed, 3);
    assert_eq!(config.headword_column, "headword");
    Ok(())
}
