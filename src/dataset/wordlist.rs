//! Word lists to classify.
//!
//! Unlike the training reader, this reader guesses its input layout. A
//! header row of two or more columns naming an English column (`en`,
//! `english`, `word` or `eng`, compared after removing a byte order mark,
//! trimming and lower-casing) selects that column of a CSV file. Anything
//! else is read as one word per line.

use std::fs;
use std::path::Path;

use csv::ReaderBuilder;
use log::debug;

use crate::error::Result;

/// Header names accepted for the English column, in priority order.
pub const ENGLISH_COLUMN_CANDIDATES: [&str; 4] = ["en", "english", "word", "eng"];

/// Canonical form of a header cell for matching.
pub fn clean_header(header: &str) -> String {
    header.replace('\u{feff}', "").trim().to_lowercase()
}

/// Find the English column among `headers`.
///
/// Candidates are tried in priority order, so `english` wins over `word`
/// regardless of column order.
pub fn detect_english_column<S: AsRef<str>>(headers: &[S]) -> Option<usize> {
    let cleaned: Vec<String> = headers.iter().map(|h| clean_header(h.as_ref())).collect();
    ENGLISH_COLUMN_CANDIDATES
        .iter()
        .find_map(|candidate| cleaned.iter().position(|h| h == candidate))
}

/// Read words from a file.
pub fn read_word_list(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    parse_word_list(&content)
}

/// Parse words from text; see the module documentation for the layout rules.
pub fn parse_word_list(content: &str) -> Result<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let column = match records.next() {
        Some(first) => {
            let first = first?;
            let headers: Vec<&str> = first.iter().collect();
            // A single cell is an ordinary word, even one spelled like a header.
            if headers.len() > 1 {
                detect_english_column(&headers)
            } else {
                None
            }
        }
        None => return Ok(Vec::new()),
    };

    match column {
        Some(idx) => {
            debug!("Word list: using CSV column {idx}");
            let mut words = Vec::new();
            for record in records {
                let record = record?;
                let word = record.get(idx).unwrap_or_default().trim();
                if !word.is_empty() {
                    words.push(word.to_string());
                }
            }
            Ok(words)
        }
        None => {
            debug!("Word list: no header detected, reading one word per line");
            Ok(content
                .lines()
                .map(|line| line.trim_start_matches('\u{feff}').trim())
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect())
        }
    }
}
