// crates/fixtrail-config/src/config.rs
// ============================================================================
// Module: fixtrail Configuration
// Description: Configuration loading and validation for the fixtrail agent.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: fixtrail-core, fixtrail-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional and falls back to defaults that mirror a fresh
//! install: a collector on the local network, a `fixtrail.db` store next to
//! the working directory, 30 s sampling with a 15 s floor, manual uploads,
//! and events on stderr.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use fixtrail_core::SamplingCadence;
use fixtrail_core::interfaces::DEFAULT_FASTEST_INTERVAL_MS;
use fixtrail_core::interfaces::DEFAULT_SAMPLING_INTERVAL_MS;
use fixtrail_core::submission_endpoint;
use fixtrail_store_sqlite::SqliteStoreConfig;
use fixtrail_store_sqlite::SqliteStoreMode;
use fixtrail_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "fixtrail.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "FIXTRAIL_CONFIG";
/// Default collector base URL.
pub const DEFAULT_SERVER_URL: &str = "http://192.168.1.100:5000";
/// Default sample store path.
pub const DEFAULT_STORE_PATH: &str = "fixtrail.db";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a device identifier.
pub(crate) const MAX_DEVICE_ID_LENGTH: usize = 256;
/// Maximum length of a collector URL.
pub(crate) const MAX_SERVER_URL_LENGTH: usize = 2048;
/// Default busy timeout for the sample store (ms).
pub(crate) const DEFAULT_STORE_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum busy timeout for the sample store (ms).
pub(crate) const MAX_STORE_BUSY_TIMEOUT_MS: u64 = 600_000;
/// Minimum scheduled upload interval in seconds.
pub(crate) const MIN_UPLOAD_INTERVAL_SECS: u64 = 10;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// fixtrail agent configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtrailConfig {
    /// Collector endpoint and device identity.
    #[serde(default)]
    pub collector: CollectorConfig,
    /// Sample store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Sampling cadence.
    #[serde(default)]
    pub sampling: SamplingConfig,
    /// Upload scheduling.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Event output.
    #[serde(default)]
    pub events: EventsConfig,
}

impl FixtrailConfig {
    /// Loads configuration from disk using the default resolution rules:
    /// explicit path, then `FIXTRAIL_CONFIG`, then `fixtrail.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        Self::load_from(&resolved)
    }

    /// Loads configuration like [`FixtrailConfig::load`], but returns the
    /// defaults when neither a path nor `FIXTRAIL_CONFIG` is given and the
    /// default file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a resolved file cannot be read or is
    /// invalid.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        let implicit = path.is_none() && env::var_os(CONFIG_ENV_VAR).is_none();
        if implicit && !resolved.exists() {
            let mut config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        Self::load_from(&resolved)
    }

    /// Reads, parses, and validates a config file.
    fn load_from(resolved: &Path) -> Result<Self, ConfigError> {
        validate_path(resolved)?;
        let bytes = fs::read(resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.collector.validate()?;
        self.store.validate()?;
        self.sampling.validate()?;
        self.upload.validate()?;
        self.events.validate()?;
        Ok(())
    }
}

/// Collector configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectorConfig {
    /// Collector base URL; `/api/localizacoes` is appended.
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Stable per-install device identifier.
    #[serde(default)]
    pub device_id: Option<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            device_id: None,
        }
    }
}

impl CollectorConfig {
    /// Validates collector configuration and trims surrounding whitespace.
    fn validate(&mut self) -> Result<(), ConfigError> {
        self.server_url = validate_server_url(&self.server_url)?;
        if let Some(device_id) = &self.device_id {
            self.device_id = Some(validate_device_id(device_id)?);
        }
        Ok(())
    }
}

/// Sample store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// `SQLite` database path.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("store.path", &self.path.to_string_lossy())?;
        if self.busy_timeout_ms > MAX_STORE_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "store.busy_timeout_ms must be at most {MAX_STORE_BUSY_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }

    /// Returns the `SQLite` store configuration.
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.path.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        }
    }
}

/// Sampling cadence configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplingConfig {
    /// Target interval between fixes in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Minimum interval between accepted fixes in milliseconds.
    #[serde(default = "default_fastest_interval_ms")]
    pub fastest_interval_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            fastest_interval_ms: default_fastest_interval_ms(),
        }
    }
}

impl SamplingConfig {
    /// Validates sampling configuration.
    fn validate(self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 || self.fastest_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "sampling intervals must be greater than zero".to_string(),
            ));
        }
        if self.fastest_interval_ms > self.interval_ms {
            return Err(ConfigError::Invalid(
                "sampling.fastest_interval_ms must not exceed sampling.interval_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the sampler cadence.
    #[must_use]
    pub const fn cadence(self) -> SamplingCadence {
        SamplingCadence {
            interval_ms: self.interval_ms,
            fastest_interval_ms: self.fastest_interval_ms,
        }
    }
}

/// Upload scheduling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadConfig {
    /// Scheduled upload interval while tracking; manual uploads only when
    /// unset.
    #[serde(default)]
    pub interval_secs: Option<u64>,
    /// Whether uploads may run on metered networks without confirmation.
    #[serde(default)]
    pub allow_metered: bool,
}

impl UploadConfig {
    /// Validates upload configuration.
    fn validate(self) -> Result<(), ConfigError> {
        if let Some(interval) = self.interval_secs
            && interval < MIN_UPLOAD_INTERVAL_SECS
        {
            return Err(ConfigError::Invalid(format!(
                "upload.interval_secs must be at least {MIN_UPLOAD_INTERVAL_SECS}"
            )));
        }
        Ok(())
    }
}

/// Event sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Events are discarded.
    None,
}

/// Event output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventsConfig {
    /// Sink type.
    #[serde(default)]
    pub sink: EventSinkKind,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl EventsConfig {
    /// Validates event configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.sink {
            EventSinkKind::File => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("file events sink requires path".to_string())
                })?;
                validate_path_string("events.path", &path.to_string_lossy())
            }
            EventSinkKind::Stderr | EventSinkKind::None => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "events.path is only valid for the file sink".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Returns the default collector URL.
fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

/// Returns the default store path.
fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

/// Returns the default store busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    DEFAULT_STORE_BUSY_TIMEOUT_MS
}

/// Returns the default sampling interval.
const fn default_interval_ms() -> u64 {
    DEFAULT_SAMPLING_INTERVAL_MS
}

/// Returns the default fastest sampling interval.
const fn default_fastest_interval_ms() -> u64 {
    DEFAULT_FASTEST_INTERVAL_MS
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a collector base URL and returns it trimmed.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the URL is blank, too long, or does
/// not yield a valid `http`/`https` submission endpoint.
pub fn validate_server_url(value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid("collector.server_url must be non-empty".to_string()));
    }
    if trimmed.len() > MAX_SERVER_URL_LENGTH {
        return Err(ConfigError::Invalid("collector.server_url exceeds max length".to_string()));
    }
    submission_endpoint(trimmed)
        .map_err(|err| ConfigError::Invalid(format!("collector.server_url: {err}")))?;
    Ok(trimmed.to_string())
}

/// Validates a device identifier and returns it trimmed.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the identifier is blank, too long, or
/// contains control characters.
pub fn validate_device_id(value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid("collector.device_id must be non-empty".to_string()));
    }
    if trimmed.len() > MAX_DEVICE_ID_LENGTH {
        return Err(ConfigError::Invalid("collector.device_id exceeds max length".to_string()));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(ConfigError::Invalid(
            "collector.device_id must not contain control characters".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
