//! CEFR proficiency levels and prediction labels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The six CEFR levels, ordered from beginner to mastery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    /// All levels in ascending order.
    pub const ALL: [CefrLevel; 6] = [
        CefrLevel::A1,
        CefrLevel::A2,
        CefrLevel::B1,
        CefrLevel::B2,
        CefrLevel::C1,
        CefrLevel::C2,
    ];

    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
            CefrLevel::C2 => "C2",
        }
    }

    /// Position in [`CefrLevel::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Parse a raw dataset label: trimmed and upper-cased before matching.
    ///
    /// Returns `None` for anything outside the six levels.
    pub fn parse_label(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "A1" => Some(CefrLevel::A1),
            "A2" => Some(CefrLevel::A2),
            "B1" => Some(CefrLevel::B1),
            "B2" => Some(CefrLevel::B2),
            "C1" => Some(CefrLevel::C1),
            "C2" => Some(CefrLevel::C2),
            _ => None,
        }
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CefrLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CefrLevel::parse_label(s).ok_or_else(|| format!("unknown CEFR level: {s:?}"))
    }
}

/// Outcome of classifying one word: a level, or `-` when the word
/// normalizes to nothing.
///
/// Serialized as its display form: `"A1"` through `"C2"`, or `"-"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum LevelLabel {
    Level(CefrLevel),
    Unclassified,
}

impl LevelLabel {
    /// Textual sentinel for unclassifiable input.
    pub const UNCLASSIFIED: &'static str = "-";

    pub fn level(&self) -> Option<CefrLevel> {
        match self {
            LevelLabel::Level(level) => Some(*level),
            LevelLabel::Unclassified => None,
        }
    }

    pub fn is_classified(&self) -> bool {
        matches!(self, LevelLabel::Level(_))
    }
}

impl From<CefrLevel> for LevelLabel {
    fn from(level: CefrLevel) -> Self {
        LevelLabel::Level(level)
    }
}

impl fmt::Display for LevelLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelLabel::Level(level) => f.write_str(level.as_str()),
            LevelLabel::Unclassified => f.write_str(Self::UNCLASSIFIED),
        }
    }
}

impl From<LevelLabel> for String {
    fn from(label: LevelLabel) -> Self {
        label.to_string()
    }
}

impl FromStr for LevelLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == Self::UNCLASSIFIED {
            Ok(LevelLabel::Unclassified)
        } else {
            s.parse::<CefrLevel>().map(LevelLabel::Level)
        }
    }
}

impl TryFrom<String> for LevelLabel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A word together with the label assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub word: String,
    pub level: LevelLabel,
}
