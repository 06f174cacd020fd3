//! Headword normalization shared by training and inference.
//!
//! Every word that reaches the vectorizer passes through [`normalize`], both
//! when the training set is prepared and when a word is classified. Keeping a
//! single implementation is what prevents train/serve skew.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9'\- ]").expect("valid charset pattern"));
static SPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("valid space pattern"));

/// Normalize a raw headword.
///
/// The input is trimmed and lower-cased, whitespace runs become one space,
/// and every character outside `[a-z0-9'\- ]` is dropped. Spaces left
/// adjacent by a dropped character are collapsed again, so the result is
/// stable under repeated application. Returns an empty string when nothing
/// survives.
///
/// # Examples
///
/// ```
/// use lugat::analysis::normalize;
///
/// assert_eq!(normalize("  Ice   Cream! "), "ice cream");
/// assert_eq!(normalize("Don't"), "don't");
/// assert_eq!(normalize("well-known"), "well-known");
/// assert_eq!(normalize("!!!"), "");
/// ```
pub fn normalize(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let spaced = WHITESPACE_RUN.replace_all(&lowered, " ");
    let filtered = DISALLOWED.replace_all(&spaced, "");
    let collapsed = SPACE_RUN.replace_all(&filtered, " ");
    collapsed.trim().to_string()
}

/// True if `c` may appear in a normalized word.
pub fn is_normalized_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '\'' | '-' | ' ')
}
