//! Column boundary inference
//!
//! ISOTROPY prints tables without delimiters; the only structure is vertical
//! whitespace alignment. A field starts where a column that is blank in
//! every line is followed by a column with content, provided the header has
//! a non-space character there (header labels may contain spaces, data may
//! not start a field).

/// Left edges (in characters) of each field in one response block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBoundaries(Vec<usize>);

impl ColumnBoundaries {
    /// Infer boundaries from a block whose first line is the header
    ///
    /// Positions past the end of a short line count as blank, so blank lines
    /// and ragged rows do not hide the gaps between fields.
    pub fn detect<S: AsRef<str>>(lines: &[S]) -> Self {
        let rows: Vec<Vec<char>> = lines.iter().map(|l| l.as_ref().chars().collect()).collect();
        let Some(header) = rows.first() else {
            return Self(vec![0]);
        };
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);

        let mut boundaries = vec![0];
        let mut previous_blank = false;
        for column in 0..width {
            let blank = rows
                .iter()
                .all(|row| row.get(column).map_or(true, |c| *c == ' '));
            let header_has_text = header.get(column).is_some_and(|c| *c != ' ');
            if !blank && previous_blank && header_has_text {
                boundaries.push(column);
            }
            previous_blank = blank;
        }
        Self(boundaries)
    }

    /// Build from known offsets (must start at 0 and be increasing)
    pub fn from_offsets(offsets: Vec<usize>) -> Self {
        Self(offsets)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Number of fields every line is split into
    pub fn field_count(&self) -> usize {
        self.0.len()
    }

    /// Slice `line` into one right-trimmed token per field; the last field
    /// runs to the end of the line
    pub fn split(&self, line: &str) -> Vec<String> {
        let chars: Vec<char> = line.chars().collect();
        let slice = |start: usize, end: usize| -> String {
            let start = start.min(chars.len());
            let end = end.min(chars.len());
            chars[start..end].iter().collect::<String>().trim_end().to_string()
        };

        let mut tokens: Vec<String> = self
            .0
            .windows(2)
            .map(|pair| slice(pair[0], pair[1]))
            .collect();
        if let Some(last) = self.0.last() {
            tokens.push(slice(*last, chars.len()));
        }
        tokens
    }
}
