//! Dataset ingestion: reading, cleaning and splitting labeled headwords, and
//! reading word lists to classify.

pub mod prepare;
pub mod reader;
pub mod split;
pub mod wordlist;

pub use prepare::{LabeledExample, PrepareStats, PreparedDataset, class_counts, prepare};
pub use reader::{DatasetReader, RawDataset, RawRecord};
pub use split::{StratifiedSplit, check_stratifiable, stratified_split};
pub use wordlist::{detect_english_column, parse_word_list, read_word_list};
