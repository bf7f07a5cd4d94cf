//! Error types and Result aliases for isodrive

use std::path::PathBuf;

/// Result type alias for isodrive operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for isodrive
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // === Signals sniffed from engine output ===
    /// The engine reported an internal fault ("program has bombed")
    #[error("ISOTROPY bombed; the session must be restarted")]
    EngineCrashed,

    /// Basis vectors were rejected as not right-handed
    #[error("ISOTROPY rejected the basis: basis vectors are not a right-handed set")]
    InvalidBasis,

    /// The engine could not establish the claimed group/subgroup relation
    #[error("ISOTROPY found no group-subgroup relation: not all elements of the subgroup are elements of the parent group")]
    SubgroupMismatch,

    /// The engine pipe closed outside of a planned shutdown
    #[error("ISOTROPY terminated unexpectedly (pipe closed)")]
    EngineTerminated,

    // === State mirror errors ===
    /// Attempted to cancel a value that was never set
    #[error("Value '{key}' is not set")]
    KeyNotFound { key: String },

    // === Lifecycle errors ===
    /// Neither the configuration nor ISOLOCATION names the engine location
    #[error("ISOTROPY location is not configured (set engine.location or ISOLOCATION)")]
    EngineLocationUnset,

    /// The engine executable does not exist
    #[error("Couldn't find ISOTROPY at '{}': {reason}", path.display())]
    EngineNotFound { path: PathBuf, reason: String },

    /// Spawning the engine failed for another reason
    #[error("Failed to spawn ISOTROPY at '{}': {reason}", path.display())]
    EngineSpawnFailed { path: PathBuf, reason: String },

    /// The session was already closed
    #[error("Session is closed")]
    SessionClosed,

    // === Configuration errors ===
    /// Configuration file not found
    #[error("Configuration file not found")]
    ConfigNotFound,

    /// Failed to parse configuration
    #[error("Failed to parse {format} config: {reason}")]
    ConfigParseFailed { format: String, reason: String },

    /// Failed to serialize configuration
    #[error("Failed to serialize config as {format}: {reason}")]
    ConfigSerializationFailed { format: String, reason: String },

    /// Configuration validation failed
    #[error("Configuration validation failed for '{field}': {reason}")]
    ConfigValidationFailed { field: String, reason: String },

    // === Record interpretation errors ===
    /// A value could not be read as a number or fraction
    #[error("'{text}' is not a number")]
    NotNumeric { text: String },

    /// A value had a different nesting than the caller expected
    #[error("Expected {expected}, found {found}")]
    UnexpectedShape { expected: String, found: String },

    /// A record lacked a column the caller relies on
    #[error("Record has no '{field}' field")]
    MissingField { field: String },

    // === Wrapped errors ===
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON errors
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Regex compilation errors
    #[error("Regex compilation error: {0}")]
    Regex(#[from] regex::Error),

    /// Invalid scratch-file glob
    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),
}

impl Error {
    /// Whether the session has a built-in recovery path for this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::EngineCrashed)
    }

    /// Whether this error was raised by sniffing an engine output line
    pub fn is_engine_signal(&self) -> bool {
        matches!(
            self,
            Error::EngineCrashed | Error::InvalidBasis | Error::SubgroupMismatch
        )
    }

    /// Map an I/O error on the engine pipes, treating a broken pipe as termination
    pub(crate) fn from_pipe(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::UnexpectedEof => {
                Error::EngineTerminated
            }
            _ => Error::Io(err),
        }
    }
}
