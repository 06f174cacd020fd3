//! Deterministic stratified train/evaluation split.

use std::collections::{BTreeMap, BTreeSet};

use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::dataset::prepare::{LabeledExample, class_counts};
use crate::error::{LugatError, Result};
use crate::level::CefrLevel;

/// The two partitions of a split, each in original dataset order.
#[derive(Debug, Clone, Default)]
pub struct StratifiedSplit {
    pub train: Vec<LabeledExample>,
    pub eval: Vec<LabeledExample>,
}

impl StratifiedSplit {
    pub fn train_counts(&self) -> BTreeMap<CefrLevel, usize> {
        class_counts(&self.train)
    }

    pub fn eval_counts(&self) -> BTreeMap<CefrLevel, usize> {
        class_counts(&self.eval)
    }
}

/// Check that `examples` can be split with every class on both sides.
///
/// Fails on an empty set, on fewer than two classes, and on any class with
/// a single example.
pub fn check_stratifiable(examples: &[LabeledExample]) -> Result<()> {
    if examples.is_empty() {
        return Err(LugatError::EmptyDataset);
    }

    let counts = class_counts(examples);
    if counts.len() < 2 {
        return Err(LugatError::TooFewClasses {
            found: counts.len(),
        });
    }

    if let Some((&level, &count)) = counts.iter().find(|(_, count)| **count < 2) {
        return Err(LugatError::InsufficientExamples { level, count });
    }

    Ok(())
}

/// Split `examples` so each level keeps its proportion in both partitions.
///
/// Every class sends `round(count * test_ratio)` examples to evaluation,
/// clamped so that both partitions get at least one. The same input, ratio
/// and seed always yield the same partitions.
pub fn stratified_split(
    examples: &[LabeledExample],
    test_ratio: f64,
    seed: u64,
) -> Result<StratifiedSplit> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(LugatError::invalid_config(format!(
            "test_ratio must be in (0, 1), got {test_ratio}"
        )));
    }
    check_stratifiable(examples)?;

    let mut members: BTreeMap<CefrLevel, Vec<usize>> = BTreeMap::new();
    for (idx, example) in examples.iter().enumerate() {
        members.entry(example.level).or_default().push(idx);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut eval_indices = BTreeSet::new();
    for indices in members.values_mut() {
        let count = indices.len();
        let n_eval = ((count as f64 * test_ratio).round() as usize).clamp(1, count - 1);
        indices.shuffle(&mut rng);
        eval_indices.extend(indices.iter().take(n_eval).copied());
    }

    let mut split = StratifiedSplit::default();
    for (idx, example) in examples.iter().enumerate() {
        if eval_indices.contains(&idx) {
            split.eval.push(example.clone());
        } else {
            split.train.push(example.clone());
        }
    }

    info!(
        "Stratified split: {} train / {} eval (seed {seed})",
        split.train.len(),
        split.eval.len()
    );

    Ok(split)
}
