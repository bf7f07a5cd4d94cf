//! Multi-row record assembly
//!
//! One logical entity may occupy several printed lines. A row whose first
//! field is empty continues the previous record: each of its non-empty
//! tokens is appended to the matching field, promoting that field to a list.

use super::value::Value;
use super::Record;

/// Group split rows (header first) into records of raw, undecomposed cells
pub fn merge_rows(split_lines: &[Vec<String>]) -> Vec<Record> {
    let Some((header, rows)) = split_lines.split_first() else {
        return Vec::new();
    };

    let mut records: Vec<Record> = Vec::new();
    for row in rows {
        let starts_record = row.first().is_some_and(|first| !first.is_empty());
        if !starts_record {
            if let Some(record) = records.last_mut() {
                extend_record(record, header, row);
                continue;
            }
            if row.iter().all(String::is_empty) {
                continue;
            }
            debug!("continuation row with no record to extend; starting a new one");
        }
        let record: Record = header
            .iter()
            .zip(row)
            .map(|(name, token)| (name.clone(), Value::atom(token.as_str())))
            .collect();
        records.push(record);
    }
    records
}

fn extend_record(record: &mut Record, header: &[String], row: &[String]) {
    for (name, token) in header.iter().zip(row) {
        if token.is_empty() {
            continue;
        }
        match record.get_mut(name) {
            Some(existing) => existing.push(Value::atom(token.as_str())),
            None => {
                record.insert(name.clone(), Value::atom(token.as_str()));
            }
        }
    }
}
