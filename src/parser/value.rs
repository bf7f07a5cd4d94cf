//! Decomposed table cells
//!
//! A cell is either an atomic string or an ordered list of cells. Numbers are
//! left as text (ISOTROPY prints fractions such as `1/2`, and callers usually
//! hand values straight back to it); the `to_f64*` helpers interpret them on
//! request.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::notation::parse_number;

/// Atomic string or nested list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Atom(String),
    List(Vec<Value>),
}

impl Value {
    /// Build an atom
    pub fn atom(text: impl Into<String>) -> Self {
        Value::Atom(text.into())
    }

    /// Build a list of atoms
    pub fn atoms<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(items.into_iter().map(|s| Value::Atom(s.into())).collect())
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Value::Atom(text) => Some(text),
            Value::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::Atom(_) => None,
            Value::List(items) => Some(items),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Element `index` of a list; an atom only has element 0 (itself)
    pub fn get(&self, index: usize) -> Option<&Value> {
        match self {
            Value::List(items) => items.get(index),
            atom if index == 0 => Some(atom),
            Value::Atom(_) => None,
        }
    }

    /// Every atom in depth-first order
    pub fn flatten_atoms(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_atoms(&mut out);
        out
    }

    fn collect_atoms<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Value::Atom(text) => out.push(text),
            Value::List(items) => items.iter().for_each(|item| item.collect_atoms(out)),
        }
    }

    /// Promote an atom to a one-element list, then append `item`
    pub(crate) fn push(&mut self, item: Value) {
        match self {
            Value::List(items) => items.push(item),
            Value::Atom(_) => {
                let first = std::mem::replace(self, Value::List(Vec::new()));
                *self = Value::List(vec![first, item]);
            }
        }
    }

    /// Apply the pipe/comma/paren/whitespace decomposition recursively
    pub fn decompose(self) -> Value {
        match self {
            Value::List(items) => Value::List(items.into_iter().map(Value::decompose).collect()),
            Value::Atom(text) => decompose_str(&text),
        }
    }

    /// Read an atom as a number (`0.25`, `-1/2`, `3`)
    pub fn to_f64(&self) -> Result<f64> {
        match self {
            Value::Atom(text) => parse_number(text),
            Value::List(_) => Err(Error::UnexpectedShape {
                expected: "number".to_string(),
                found: self.shape(),
            }),
        }
    }

    /// Read a list of atoms as a vector
    pub fn to_f64_vec(&self) -> Result<Vec<f64>> {
        match self {
            Value::List(items) => items.iter().map(Value::to_f64).collect(),
            Value::Atom(_) => Err(Error::UnexpectedShape {
                expected: "list of numbers".to_string(),
                found: self.shape(),
            }),
        }
    }

    /// Read a list of lists as a row-major matrix
    pub fn to_f64_matrix(&self) -> Result<Vec<Vec<f64>>> {
        match self {
            Value::List(rows) => rows.iter().map(Value::to_f64_vec).collect(),
            Value::Atom(_) => Err(Error::UnexpectedShape {
                expected: "list of lists".to_string(),
                found: self.shape(),
            }),
        }
    }

    fn shape(&self) -> String {
        match self {
            Value::Atom(text) => format!("atom '{}'", text),
            Value::List(items) => format!("list of {}", items.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Atom(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Atom(text)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// Decompose one cell string
///
/// Precedence is fixed: `|` alternatives, then `,` components, then
/// parenthesised groups, then whitespace. Delimiters nested inside
/// parentheses never split the outer level.
pub fn decompose_str(text: &str) -> Value {
    if let Some(pieces) = split_top_level(text, '|') {
        return decompose_pieces(trim_blank_ends(pieces));
    }
    if let Some(pieces) = split_top_level(text, ',') {
        return decompose_pieces(trim_blank_ends(pieces));
    }

    let trimmed = text.trim();
    if trimmed.starts_with('(') && trimmed.ends_with(')') {
        let mut groups = paren_groups(trimmed);
        if groups.len() > 1 {
            return decompose_pieces(groups);
        }
        if let Some(group) = groups.pop() {
            return decompose_str(group);
        }
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.len() > 1 {
        return decompose_pieces(tokens);
    }

    Value::Atom(trimmed.to_string())
}

fn decompose_pieces(pieces: Vec<&str>) -> Value {
    Value::List(pieces.into_iter().map(decompose_str).collect())
}

/// `|x,0,0|x,y,0|` has empty pieces at both ends; interior blanks keep
/// their position
fn trim_blank_ends(pieces: Vec<&str>) -> Vec<&str> {
    let first = pieces.iter().position(|p| !p.trim().is_empty());
    let last = pieces.iter().rposition(|p| !p.trim().is_empty());
    match (first, last) {
        (Some(first), Some(last)) => pieces[first..=last].to_vec(),
        _ => Vec::new(),
    }
}

/// Split on `sep` outside parentheses; `None` when there is nothing to split
fn split_top_level(text: &str, sep: char) -> Option<Vec<&str>> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                pieces.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if pieces.is_empty() {
        return None;
    }
    pieces.push(&text[start..]);
    Some(pieces)
}

/// Contents of each top-level `( ... )` group
fn paren_groups(text: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut open = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => {
                if depth == 0 {
                    open = i + 1;
                }
                depth += 1;
            }
            ')' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    groups.push(&text[open..i]);
                }
            }
            _ => {}
        }
    }
    groups
}
