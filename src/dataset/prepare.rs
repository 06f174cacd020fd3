//! Cleaning raw rows into labeled examples.

use std::collections::BTreeMap;

use ahash::AHashSet;
use log::info;
use serde::{Deserialize, Serialize};

use crate::analysis::normalize;
use crate::dataset::reader::RawRecord;
use crate::level::CefrLevel;

/// A normalized headword with its level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabeledExample {
    pub headword: String,
    pub level: CefrLevel,
}

impl LabeledExample {
    pub fn new<S: Into<String>>(headword: S, level: CefrLevel) -> Self {
        Self {
            headword: headword.into(),
            level,
        }
    }
}

/// Row accounting for one cleaning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareStats {
    pub rows_read: usize,
    pub invalid_level: usize,
    pub empty_headword: usize,
    pub duplicates: usize,
    pub retained: usize,
}

/// Output of [`prepare`].
#[derive(Debug, Clone, Default)]
pub struct PreparedDataset {
    pub examples: Vec<LabeledExample>,
    pub stats: PrepareStats,
}

/// Normalize, filter and deduplicate raw rows.
///
/// Levels are trimmed and upper-cased; rows whose level is not one of the six
/// CEFR levels are dropped, then rows whose headword normalizes to nothing.
/// Rows repeating an earlier (headword, level) pair are dropped; the same
/// headword under a different level is kept.
pub fn prepare(records: &[RawRecord]) -> PreparedDataset {
    let mut stats = PrepareStats {
        rows_read: records.len(),
        ..Default::default()
    };
    let mut seen: AHashSet<(String, CefrLevel)> = AHashSet::with_capacity(records.len());
    let mut examples = Vec::with_capacity(records.len());

    for record in records {
        let Some(level) = CefrLevel::parse_label(&record.level) else {
            stats.invalid_level += 1;
            continue;
        };

        let headword = normalize(&record.headword);
        if headword.is_empty() {
            stats.empty_headword += 1;
            continue;
        }

        if !seen.insert((headword.clone(), level)) {
            stats.duplicates += 1;
            continue;
        }

        examples.push(LabeledExample { headword, level });
    }

    stats.retained = examples.len();
    info!(
        "Retained {} of {} rows ({} invalid level, {} empty headword, {} duplicates)",
        stats.retained, stats.rows_read, stats.invalid_level, stats.empty_headword, stats.duplicates
    );

    PreparedDataset { examples, stats }
}

/// Count examples per level.
pub fn class_counts(examples: &[LabeledExample]) -> BTreeMap<CefrLevel, usize> {
    let mut counts = BTreeMap::new();
    for example in examples {
        *counts.entry(example.level).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(headword: &str, level: &str) -> RawRecord {
        RawRecord {
            headword: headword.to_string(),
            level: level.to_string(),
        }
    }

    #[test]
    fn test_normalizes_and_filters() {
        let records = vec![
            raw("  Cat ", " a1"),
            raw("dog", "X1"),
            raw("!!!", "A1"),
            raw("Ubiquitous", "c2 "),
        ];
        let prepared = prepare(&records);

        assert_eq!(
            prepared.examples,
            vec![
                LabeledExample::new("cat", CefrLevel::A1),
                LabeledExample::new("ubiquitous", CefrLevel::C2),
            ]
        );
        assert_eq!(prepared.stats.rows_read, 4);
        assert_eq!(prepared.stats.invalid_level, 1);
        assert_eq!(prepared.stats.empty_headword, 1);
        assert_eq!(prepared.stats.retained, 2);
    }

    #[test]
    fn test_deduplicates_same_word_same_level() {
        let records = vec![raw("Cat", "A1"), raw("cat ", "a1"), raw("CAT", "A1")];
        let prepared = prepare(&records);

        assert_eq!(prepared.examples.len(), 1);
        assert_eq!(prepared.stats.duplicates, 2);
    }

    #[test]
    fn test_keeps_same_word_different_levels() {
        let records = vec![raw("run", "A1"), raw("run", "B2")];
        let prepared = prepare(&records);

        assert_eq!(prepared.examples.len(), 2);
        assert_eq!(prepared.stats.duplicates, 0);
    }

    #[test]
    fn test_class_counts() {
        let examples = vec![
            LabeledExample::new("a", CefrLevel::B1),
            LabeledExample::new("b", CefrLevel::A1),
            LabeledExample::new("c", CefrLevel::B1),
        ];
        let counts = class_counts(&examples);
        assert_eq!(counts.get(&CefrLevel::A1), Some(&1));
        assert_eq!(counts.get(&CefrLevel::B1), Some(&2));
        assert_eq!(counts.keys().next(), Some(&CefrLevel::A1));
    }
}
