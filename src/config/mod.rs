//! Configuration management for isodrive
//!
//! [`EngineConfig`] says where the ISOTROPY executable and its data live;
//! [`ProtocolConfig`] holds the console conventions the session relies on.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Environment variable naming the ISOTROPY install directory
pub const LOCATION_ENV: &str = "ISOLOCATION";

/// Environment variable the engine reads to find its data files
pub const DATA_ENV: &str = "ISODATA";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where and how to launch the engine
    pub engine: EngineConfig,

    /// Console protocol conventions
    pub protocol: ProtocolConfig,
}

/// Engine process configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory containing the executable (falls back to `ISOLOCATION`)
    pub location: Option<PathBuf>,

    /// Executable name inside `location`
    pub executable: String,

    /// Data directory exported as `ISODATA` (defaults to `location`)
    pub data_directory: Option<PathBuf>,

    /// Working directory for the engine; scratch files land here
    pub working_directory: Option<PathBuf>,

    /// Glob matching the scratch database files the engine writes
    pub scratch_pattern: String,

    /// How long `close` waits for the engine to exit after `QUIT`
    pub shutdown_grace_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            location: None,
            executable: "iso".to_string(),
            data_directory: None,
            working_directory: None,
            scratch_pattern: "*.iso".to_string(),
            shutdown_grace_ms: 500,
        }
    }
}

impl EngineConfig {
    /// Configured location, or `ISOLOCATION` from the environment
    pub fn resolve_location(&self) -> Result<PathBuf> {
        if let Some(location) = &self.location {
            return Ok(location.clone());
        }
        env::var_os(LOCATION_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .ok_or(Error::EngineLocationUnset)
    }

    /// Full path of the engine executable
    pub fn executable_path(&self) -> Result<PathBuf> {
        Ok(self.resolve_location()?.join(&self.executable))
    }

    /// Value for `ISODATA`; the engine concatenates file names onto it, so it
    /// always ends with a separator
    pub fn data_directory_env(&self) -> Result<String> {
        let dir = match &self.data_directory {
            Some(dir) => dir.clone(),
            None => self.resolve_location()?,
        };
        let mut dir = dir.to_string_lossy().into_owned();
        if !dir.ends_with('/') {
            dir.push('/');
        }
        Ok(dir)
    }

    /// Working directory, defaulting to the current directory
    pub fn resolve_working_directory(&self) -> Result<PathBuf> {
        match &self.working_directory {
            Some(dir) => Ok(dir.clone()),
            None => Ok(env::current_dir()?),
        }
    }
}

/// Console protocol configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Banner line after which the engine accepts commands
    pub ready_banner: String,

    /// Prompt line printed before each command is read
    pub prompt_sentinel: String,

    /// Console width sent with `SCREEN`; wide enough that rows never wrap
    pub screen_width: u32,

    /// Page length sent with `PAGE`; `None` sends `PAGE NOBREAK`
    pub page_length: Option<u32>,

    /// Settings applied when a session does not request its own
    pub default_settings: Vec<String>,

    /// Lines scanned for the first result after a database prompt
    pub database_scan_limit: usize,

    /// Restart and retry once when the engine bombs during a display
    pub restart_on_crash: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            ready_banner:
                "Current setting is International (new ed.) with conventional basis vectors."
                    .to_string(),
            prompt_sentinel: "*".to_string(),
            screen_width: 999,
            // NOBREAK still inserts periodic labels
            page_length: Some(999),
            default_settings: vec!["INTERNATIONAL".to_string()],
            database_scan_limit: 10,
            restart_on_crash: true,
        }
    }
}
