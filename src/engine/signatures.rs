//! Fatal output signatures
//!
//! ISOTROPY never exits with a status on failure; it prints a phrase and
//! carries on (or stops responding). Each line read is checked against these
//! phrasings in order.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Error;

/// A failure announced in the engine's output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFault {
    /// Internal fault; the process must be restarted
    Crashed,
    /// Basis vectors rejected as not right-handed
    InvalidBasis,
    /// Requested subgroup is not a subgroup of the parent
    SubgroupMismatch,
}

impl From<EngineFault> for Error {
    fn from(fault: EngineFault) -> Self {
        match fault {
            EngineFault::Crashed => Error::EngineCrashed,
            EngineFault::InvalidBasis => Error::InvalidBasis,
            EngineFault::SubgroupMismatch => Error::SubgroupMismatch,
        }
    }
}

static DEFAULT_SIGNATURES: Lazy<SignatureTable> = Lazy::new(SignatureTable::new);

/// Ordered list of (pattern, fault) pairs
#[derive(Debug, Clone)]
pub struct SignatureTable {
    patterns: Vec<(Regex, EngineFault)>,
}

impl SignatureTable {
    /// Table with the engine's known fatal phrasings
    pub fn new() -> Self {
        let mut table = Self {
            patterns: Vec::new(),
        };
        table.add_pattern(r"(?i)program\s+has\s+bombed", EngineFault::Crashed);
        table.add_pattern(
            r"(?i)basis\s+vectors\s+are\s+not\s+a\s+right-handed\s+set",
            EngineFault::InvalidBasis,
        );
        table.add_pattern(
            r"(?i)not\s+all\s+elements\s+of\s+the\s+subgroup\s+are\s+elements\s+of\s+parent\s+group",
            EngineFault::SubgroupMismatch,
        );
        table
    }

    /// Shared instance of [`SignatureTable::new`]
    pub fn shared() -> &'static SignatureTable {
        &DEFAULT_SIGNATURES
    }

    fn add_pattern(&mut self, pattern: &str, fault: EngineFault) {
        match Regex::new(pattern) {
            Ok(regex) => self.patterns.push((regex, fault)),
            Err(e) => {
                warn!("Failed to compile signature pattern '{}': {}", pattern, e);
            }
        }
    }

    /// First fault whose pattern occurs anywhere in `line`
    pub fn classify(&self, line: &str) -> Option<EngineFault> {
        self.patterns
            .iter()
            .find(|(regex, _)| regex.is_match(line))
            .map(|(_, fault)| *fault)
    }
}

impl Default for SignatureTable {
    fn default() -> Self {
        Self::new()
    }
}
