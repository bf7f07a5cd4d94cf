//! Tabular Output Parser
//!
//! Turns one raw response block from ISOTROPY into typed records:
//!
//! 1. [`ColumnBoundaries::detect`] infers field extents from whitespace alignment
//! 2. every line is split into one token per field
//! 3. [`merge_rows`] folds continuation rows into the preceding record
//! 4. every cell is decomposed into a [`Value`] tree
//!
//! Misaligned input (a field's data starting left of its header) is not
//! detected; it silently yields shifted tokens.

pub mod columns;
pub mod rows;
pub mod value;

use indexmap::IndexMap;

pub use columns::ColumnBoundaries;
pub use rows::merge_rows;
pub use value::{decompose_str, Value};

/// One logical result row keyed by header label, in header order
pub type Record = IndexMap<String, Value>;

/// Parse a response block whose first line is the header
pub fn parse_block<S: AsRef<str>>(lines: &[S]) -> Vec<Record> {
    if lines.is_empty() {
        return Vec::new();
    }

    let boundaries = ColumnBoundaries::detect(lines);
    trace!(boundaries = ?boundaries.as_slice(), "detected column boundaries");

    let split: Vec<Vec<String>> = lines
        .iter()
        .map(|line| boundaries.split(line.as_ref()))
        .collect();

    merge_rows(&split)
        .into_iter()
        .map(|record| {
            record
                .into_iter()
                .map(|(name, cell)| (name, cell.decompose()))
                .collect()
        })
        .collect()
}
