//! isodrive - drive the ISOTROPY crystallography console from Rust
//!
//! ISOTROPY is an interactive, line-oriented program. This crate keeps one
//! engine process per [`Session`], speaks its console protocol, and turns its
//! whitespace-aligned tables into typed [`Record`]s.
//!
//! ## Module Organization
//!
//! ### Core
//!
//! - [`session`] - process lifecycle, command dispatch, response collection,
//!   database sub-prompts, restart after a crash
//! - [`parser`] - column inference, continuation rows, value decomposition
//! - [`mirror`] - local copy of the engine's values and shows
//!
//! ### Plumbing
//!
//! - [`engine`] - transports for the real executable and for scripted tests
//! - [`command`] - console command wire text
//! - [`config`] - engine location and protocol conventions
//! - [`mod@error`] - Error types and Result aliases
//!
//! ### Helpers
//!
//! - [`notation`] - fraction parsing and rendering for engine input
//! - [`queries`] - common crystallographic queries built on sessions
//!
//! ## Quick Start
//!
//! ```no_run
//! use isodrive::{Session, SessionOptions};
//!
//! # async fn demo() -> isodrive::Result<()> {
//! let config = isodrive::load_config();
//! let mut session = Session::open_with_config(
//!     &config,
//!     SessionOptions::new().value("PARENT", 221).show("IRREP"),
//! )
//! .await?;
//! let records = session.display("IRREP", None).await?;
//! session.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! A session allows one command in flight at a time; every method takes
//! `&mut self`. Independent queries in parallel need independent sessions,
//! each with its own working directory so their scratch files do not clash.

#[macro_use]
extern crate tracing;

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod mirror;
pub mod notation;
pub mod parser;
pub mod queries;
pub mod session;

// Re-exports for core functionality
pub use command::{EngineCommand, PageMode};
pub use config::loader::ConfigLoader;
pub use config::{Config, EngineConfig, ProtocolConfig};
pub use engine::{Launcher, ProcessLauncher, ScriptedLauncher, Transport};
pub use error::{Error, Result};
pub use mirror::{ShowSet, ValueMap};
pub use parser::{parse_block, Record, Value};
pub use queries::QueryClient;
pub use session::{with_session, Session, SessionInfo, SessionOptions, SessionState};

// Version information
/// The current version of isodrive from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The crate name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Load configuration from the default locations, falling back to defaults
///
/// `ISOLOCATION` fills in the engine location when no file names one.
pub fn load_config() -> Config {
    match ConfigLoader::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load configuration: {}. Using defaults", e);
            let mut config = Config::default();
            if let Ok(location) = config.engine.resolve_location() {
                config.engine.location = Some(location);
            }
            config
        }
    }
}
