//! Interactive database sub-prompts
//!
//! Some displays make ISOTROPY build a derived database first. It announces
//! this, prints a few explanatory lines ending in "Enter RETURN", and waits
//! for an empty line before printing "Adding ..." and then the results.

use once_cell::sync::Lazy;
use regex::Regex;

/// One recognised sub-prompt
#[derive(Debug)]
pub struct DatabasePrompt {
    /// Short name for logs
    pub name: &'static str,
    pattern: Regex,
    /// Lines between the announcement and the acknowledgement, inclusive
    /// of the "Enter RETURN" line
    pub preamble_lines: usize,
}

static DATABASE_PROMPTS: Lazy<Vec<DatabasePrompt>> = Lazy::new(|| {
    [
        ("requested information", r"(?i)you have requested information about", 4),
        ("coupled subgroups", r"(?i)data base for these coupled subgroups", 2),
    ]
    .into_iter()
    .filter_map(|(name, pattern, preamble_lines)| match Regex::new(pattern) {
        Ok(pattern) => Some(DatabasePrompt {
            name,
            pattern,
            preamble_lines,
        }),
        Err(e) => {
            warn!("Failed to compile prompt pattern '{}': {}", pattern, e);
            None
        }
    })
    .collect()
});

/// The sub-prompt announced by `line`, if any
pub fn match_database_prompt(line: &str) -> Option<&'static DatabasePrompt> {
    DATABASE_PROMPTS.iter().find(|p| p.pattern.is_match(line))
}
