//! Property-based tests for the tabular output parser

use isodrive::notation::{fraction_string, parse_number};
use isodrive::parser::{decompose_str, ColumnBoundaries};
use isodrive::{parse_block, Value};
use proptest::prelude::*;

/// Header labels and rows of single-token cells, every cell non-empty
fn aligned_table() -> impl Strategy<Value = (Vec<String>, Vec<Vec<String>>)> {
    (1usize..5).prop_flat_map(|columns| {
        let headers = prop::collection::vec("[a-z]{0,6}", columns).prop_map(|suffixes| {
            suffixes
                .into_iter()
                .enumerate()
                .map(|(i, s)| format!("F{}{}", i, s))
                .collect::<Vec<_>>()
        });
        let rows = prop::collection::vec(
            prop::collection::vec("[A-Za-z0-9/+-]{1,8}", columns),
            0..6,
        );
        (headers, rows)
    })
}

/// Pad every field to its widest cell plus `gap` spaces
fn render(headers: &[String], rows: &[Vec<String>], gap: usize) -> Vec<String> {
    let widths: Vec<usize> = (0..headers.len())
        .map(|i| {
            rows.iter()
                .map(|row| row[i].len())
                .chain(std::iter::once(headers[i].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();
    std::iter::once(headers)
        .chain(rows.iter().map(Vec::as_slice))
        .map(|cells| {
            let mut line = String::new();
            for (i, cell) in cells.iter().enumerate() {
                line.push_str(cell);
                if i + 1 < cells.len() {
                    line.push_str(&" ".repeat(widths[i] - cell.len() + gap));
                }
            }
            line
        })
        .collect()
}

fn atoms(value: &Value) -> Vec<&str> {
    value.flatten_atoms()
}

proptest! {
    #[test]
    fn test_parse_block_handles_any_lines(lines in prop::collection::vec("\\PC{0,40}", 0..8)) {
        let records = parse_block(&lines);
        prop_assert!(records.len() <= lines.len().saturating_sub(1));
    }

    #[test]
    fn test_decompose_handles_any_text(text in "\\PC{0,60}") {
        let _ = decompose_str(&text);
    }

    #[test]
    fn test_aligned_tables_round_trip((headers, rows) in aligned_table(), gap in 1usize..4) {
        let lines = render(&headers, &rows, gap);
        let boundaries = ColumnBoundaries::detect(&lines);
        prop_assert_eq!(boundaries.field_count(), headers.len());

        let records = parse_block(&lines);
        prop_assert_eq!(records.len(), rows.len());
        for (record, row) in records.iter().zip(&rows) {
            let keys: Vec<&String> = record.keys().collect();
            prop_assert_eq!(keys, headers.iter().collect::<Vec<_>>());
            for (header, cell) in headers.iter().zip(row) {
                prop_assert_eq!(&record[header.as_str()], &decompose_str(cell));
            }
        }
    }

    #[test]
    fn test_atoms_never_contain_delimiters(text in "[a-z0-9/ ,|]{0,40}") {
        let value = decompose_str(&text);
        if text.trim().is_empty() {
            prop_assert_eq!(value, Value::atom(""));
        } else {
            for atom in atoms(&value) {
                prop_assert!(!atom.contains(|c: char| c == ',' || c == '|' || c.is_whitespace()));
            }
        }
    }

    #[test]
    fn test_parenthesised_vectors(items in prop::collection::vec("[0-9a-z]{1,4}", 1..4)) {
        let text = format!("({})", items.join(","));
        let value = decompose_str(&text);
        if items.len() == 1 {
            prop_assert_eq!(value, Value::atom(items[0].as_str()));
        } else {
            prop_assert_eq!(value, Value::atoms(items.iter().map(String::as_str)));
        }
    }

    #[test]
    fn test_small_fractions_render_exactly(p in -20i64..20, q in 1i64..=10) {
        let x = p as f64 / q as f64;
        let rendered = fraction_string(x, 10);
        let parsed = parse_number(&rendered).unwrap();
        prop_assert!((parsed - x).abs() < 1e-9, "{} rendered as {}", x, rendered);
    }
}
