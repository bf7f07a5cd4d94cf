//! Configuration File Loading
//!
//! Finds, validates and saves isodrive configuration files in TOML or JSON.

use super::{Config, LOCATION_ENV};
use crate::error::{Error, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file loader
#[derive(Debug)]
pub struct ConfigLoader {
    /// Search paths for configuration files (without extension)
    search_paths: Vec<PathBuf>,
    /// Supported configuration file formats
    supported_formats: Vec<ConfigFormat>,
    /// Current configuration file path (if loaded)
    current_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    fn extension(self) -> &'static str {
        match self {
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }

    fn name(self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Json => "JSON",
        }
    }

    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Whether to fall back to the default config if none exists
    pub create_default: bool,
    /// Whether to validate configuration after loading
    pub validate: bool,
    /// Whether `ISOLOCATION` fills in a missing engine location
    pub apply_env: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            create_default: true,
            validate: true,
            apply_env: true,
        }
    }
}

impl ConfigLoader {
    /// Create a loader over the default search paths
    pub fn new() -> Self {
        Self {
            search_paths: Self::get_search_paths(),
            supported_formats: vec![ConfigFormat::Toml, ConfigFormat::Json],
            current_path: None,
        }
    }

    /// Load configuration with default options
    pub fn load() -> Result<Config> {
        Self::new().load_with_options(LoadOptions::default())
    }

    /// Load configuration with custom options
    pub fn load_with_options(&mut self, options: LoadOptions) -> Result<Config> {
        let mut config = match self.find_and_load_config()? {
            Some((path, config)) => {
                debug!("loaded configuration from {}", path.display());
                self.current_path = Some(path);
                config
            }
            None if options.create_default => Config::default(),
            None => return Err(Error::ConfigNotFound),
        };

        if options.apply_env {
            Self::apply_env_overrides(&mut config);
        }
        if options.validate {
            Self::validate_config(&config)?;
        }
        Ok(config)
    }

    /// Load and validate a specific file
    pub fn load_from_path(path: &Path) -> Result<Config> {
        let mut config = Self::load_config_file(path, ConfigFormat::from_path(path))?;
        Self::apply_env_overrides(&mut config);
        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to a specific path; the extension picks the format
    pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let format = ConfigFormat::from_path(path);
        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(config).map_err(|e| {
                Error::ConfigSerializationFailed {
                    format: format.name().to_string(),
                    reason: e.to_string(),
                }
            })?,
            ConfigFormat::Toml => {
                toml::to_string_pretty(config).map_err(|e| Error::ConfigSerializationFailed {
                    format: format.name().to_string(),
                    reason: e.to_string(),
                })?
            }
        };

        fs::write(path, content)?;
        Ok(())
    }

    /// Find and load configuration from search paths
    fn find_and_load_config(&self) -> Result<Option<(PathBuf, Config)>> {
        for path in &self.search_paths {
            for format in &self.supported_formats {
                let config_path = path.with_extension(format.extension());
                if !config_path.exists() {
                    continue;
                }
                match Self::load_config_file(&config_path, *format) {
                    Ok(config) => return Ok(Some((config_path, config))),
                    Err(e) => {
                        warn!("Failed to load config from {}: {}", config_path.display(), e);
                        continue;
                    }
                }
            }
        }
        Ok(None)
    }

    /// Load a specific configuration file
    fn load_config_file(path: &Path, format: ConfigFormat) -> Result<Config> {
        let content = fs::read_to_string(path)?;
        match format {
            ConfigFormat::Toml => toml::from_str(&content).map_err(|e| Error::ConfigParseFailed {
                format: format.name().to_string(),
                reason: e.to_string(),
            }),
            ConfigFormat::Json => {
                serde_json::from_str(&content).map_err(|e| Error::ConfigParseFailed {
                    format: format.name().to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Default search paths, most specific first
    fn get_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(cwd) = env::current_dir() {
            paths.push(cwd.join(".isodrive"));
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("isodrive").join("config"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".isodrive"));
        }

        paths
    }

    fn apply_env_overrides(config: &mut Config) {
        if config.engine.location.is_none() {
            if let Some(location) = env::var_os(LOCATION_ENV).filter(|v| !v.is_empty()) {
                config.engine.location = Some(PathBuf::from(location));
            }
        }
    }

    /// Validate configuration
    pub fn validate_config(config: &Config) -> Result<()> {
        let invalid = |field: &str, reason: &str| {
            Err(Error::ConfigValidationFailed {
                field: field.to_string(),
                reason: reason.to_string(),
            })
        };

        if config.engine.executable.trim().is_empty() {
            return invalid("engine.executable", "Executable name cannot be empty");
        }
        if config.engine.scratch_pattern.trim().is_empty() {
            return invalid("engine.scratch_pattern", "Scratch pattern cannot be empty");
        }
        if glob::Pattern::new(&config.engine.scratch_pattern).is_err() {
            return invalid("engine.scratch_pattern", "Scratch pattern is not a valid glob");
        }
        if config.protocol.ready_banner.trim().is_empty() {
            return invalid("protocol.ready_banner", "Ready banner cannot be empty");
        }
        if config.protocol.prompt_sentinel.is_empty() {
            return invalid("protocol.prompt_sentinel", "Prompt sentinel cannot be empty");
        }
        if config.protocol.screen_width == 0 {
            return invalid("protocol.screen_width", "Screen width must be greater than 0");
        }
        if config.protocol.page_length == Some(0) {
            return invalid("protocol.page_length", "Page length must be greater than 0");
        }
        if config.protocol.database_scan_limit == 0 {
            return invalid(
                "protocol.database_scan_limit",
                "Database scan limit must be greater than 0",
            );
        }

        Ok(())
    }

    /// Get the current configuration file path
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// List all search paths
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Add a custom search path
    pub fn add_search_path(&mut self, path: PathBuf) {
        self.search_paths.push(path);
    }

    /// Clear all search paths and add a single path
    pub fn set_search_path(&mut self, path: PathBuf) {
        self.search_paths = vec![path];
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
