//! Configuration for the NiFi OpenTelemetry receiver
//!
//! A single TOML file, found through `--config`, `NIFI_OTEL_CONFIG` or the
//! usual XDG and `/etc` locations, with `NIFI_OTEL_*` variables applied on
//! top. The raw `[translator]` section is checked and turned into
//! [`TranslatorSettings`] before the receiver starts.

use crate::carrier::ContextAliases;
use crate::events::ProvenanceEventType;
use crate::translator::TranslatorSettings;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "NIFI_OTEL_CONFIG";

const APP_DIR: &str = "nifi-otel";

/// Routes the receiver serves itself
const RESERVED_PATHS: [&str; 3] = ["/health", "/metrics", "/api/metrics"];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete receiver configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    pub receiver: ReceiverSettings,
    pub server: ServerConfig,
    pub translator: TranslatorConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverSettings {
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,
}

impl Default for ReceiverSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, host:port
    pub endpoint: String,

    /// Route accepting provenance batches
    pub provenance_url_path: String,

    /// Route accepting bulletin batches
    pub bulletin_url_path: String,

    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: "localhost:8200".to_string(),
            provenance_url_path: "/v1/provenance".to_string(),
            bulletin_url_path: "/v1/bulletin".to_string(),
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Translation settings as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Provenance event type literals that never produce spans
    pub ignored_events: Vec<String>,

    /// Seconds a lineage entry is retained
    pub lineage_ttl_secs: u64,

    /// Periodic sweep interval in seconds (0 = only after each batch)
    pub sweep_interval_secs: u64,

    /// Canonical propagation key -> key used by the producer
    pub context_propagation_aliases: HashMap<String, String>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            ignored_events: vec![ProvenanceEventType::Download.as_str().to_string()],
            lineage_ttl_secs: 300,
            sweep_interval_secs: 0,
            context_propagation_aliases: HashMap::new(),
        }
    }
}

impl TryFrom<&TranslatorConfig> for TranslatorSettings {
    type Error = ConfigError;

    fn try_from(config: &TranslatorConfig) -> ConfigResult<Self> {
        let ignored_event_types = config
            .ignored_events
            .iter()
            .map(|literal| literal.parse::<ProvenanceEventType>())
            .collect::<Result<HashSet<_>, _>>()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        let aliases = ContextAliases::try_from(config.context_propagation_aliases.clone())
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        if config.lineage_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "lineage_ttl_secs must be greater than 0".to_string(),
            ));
        }
        let ttl_secs = i64::try_from(config.lineage_ttl_secs).map_err(|_| {
            ConfigError::ValidationError(format!(
                "lineage_ttl_secs is too large: {}",
                config.lineage_ttl_secs
            ))
        })?;
        let lineage_ttl = Duration::try_seconds(ttl_secs).ok_or_else(|| {
            ConfigError::ValidationError(format!("lineage_ttl_secs is too large: {}", ttl_secs))
        })?;

        Ok(Self {
            ignored_event_types,
            aliases,
            lineage_ttl,
        })
    }
}

/// Downstream export settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub otlp: OtlpExportConfig,
    pub jsonl: JsonlExportConfig,
}

impl ExportConfig {
    /// Whether any exporter is switched on
    pub fn any_enabled(&self) -> bool {
        self.otlp.enabled || self.jsonl.enabled
    }
}

/// OTLP/gRPC export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtlpExportConfig {
    /// Enable OTLP export
    pub enabled: bool,

    /// Collector endpoint URL
    pub endpoint: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Enable gzip compression
    pub compression: bool,

    /// Extra request metadata
    pub headers: HashMap<String, String>,
}

impl Default for OtlpExportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://localhost:4317".to_string(),
            timeout_secs: 10,
            compression: true,
            headers: HashMap::new(),
        }
    }
}

/// JSONL file export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonlExportConfig {
    /// Enable JSONL export
    pub enabled: bool,

    /// Output file
    pub path: String,

    /// Append instead of truncating on start
    pub append: bool,

    /// Flush after every batch
    pub flush_each: bool,
}

impl Default for JsonlExportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "/tmp/nifi-otel-traces.jsonl".to_string(),
            append: true,
            flush_each: true,
        }
    }
}

/// Configuration loader
pub struct ConfigLoader {
    /// Path to config file (if specified via CLI)
    cli_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { cli_path: None }
    }

    /// Set the config path from CLI argument
    pub fn with_cli_path(mut self, path: Option<PathBuf>) -> Self {
        self.cli_path = path;
        self
    }

    /// First match wins: `--config`, `NIFI_OTEL_CONFIG`,
    /// `$XDG_CONFIG_HOME/nifi-otel/config.toml`, `/etc/nifi-otel/config.toml`,
    /// then built-in defaults.
    ///
    /// A CLI path that does not exist is an error rather than a fallthrough.
    pub fn load(&self) -> ConfigResult<ReceiverConfig> {
        let mut config = match self.find_config_file()? {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                Self::load_from_file(&path)?
            }
            None => {
                debug!("No config file found, using defaults");
                ReceiverConfig::default()
            }
        };

        apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        validate(&config)?;

        Ok(config)
    }

    fn find_config_file(&self) -> ConfigResult<Option<PathBuf>> {
        // 1. CLI --config flag
        if let Some(path) = &self.cli_path {
            if path.exists() {
                return Ok(Some(path.clone()));
            }
            return Err(ConfigError::NotFound(path.clone()));
        }

        // 2. NIFI_OTEL_CONFIG environment variable
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Ok(Some(path));
            }
            warn!("{} path does not exist: {}", CONFIG_ENV, env_path);
        }

        // 3. ~/.config/nifi-otel/config.toml
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Ok(Some(path));
            }
        }

        // 4. /etc/nifi-otel/config.toml (Unix only)
        #[cfg(unix)]
        {
            let path = PathBuf::from("/etc").join(APP_DIR).join("config.toml");
            if path.exists() {
                return Ok(Some(path));
            }
        }

        Ok(None)
    }

    /// Load configuration from a TOML file, without overrides or validation
    pub fn load_from_file(path: &Path) -> ConfigResult<ReceiverConfig> {
        let content = std::fs::read_to_string(path)?;
        let config: ReceiverConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// User-level config file location for the current platform
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiverConfig {
    /// Typed translator settings for this configuration
    pub fn translator_settings(&self) -> ConfigResult<TranslatorSettings> {
        TranslatorSettings::try_from(&self.translator)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            ConfigError::ValidationError(format!("Failed to serialize config: {}", e))
        })
    }
}

/// Apply environment variable overrides, reading variables through `lookup`
pub fn apply_env_overrides<F>(config: &mut ReceiverConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("NIFI_OTEL_LOG_LEVEL") {
        config.receiver.log_level = val;
    }
    if let Some(val) = lookup("NIFI_OTEL_ENDPOINT") {
        config.server.endpoint = val;
    }
    if let Some(val) = lookup("NIFI_OTEL_OTLP_ENDPOINT") {
        config.export.otlp.endpoint = val;
        config.export.otlp.enabled = true;
    }
    if let Some(val) = lookup("NIFI_OTEL_JSONL_PATH") {
        config.export.jsonl.path = val;
        config.export.jsonl.enabled = true;
    }
}

/// Validate a fully assembled configuration
pub fn validate(config: &ReceiverConfig) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.receiver.log_level.to_lowercase().as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "Invalid log level: {}. Must be one of: {:?}",
            config.receiver.log_level, valid_levels
        )));
    }

    let server = &config.server;
    if server.endpoint.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Server endpoint cannot be empty".to_string(),
        ));
    }
    validate_route(&server.provenance_url_path)?;
    validate_route(&server.bulletin_url_path)?;
    if server.provenance_url_path == server.bulletin_url_path {
        return Err(ConfigError::ValidationError(format!(
            "Provenance and bulletin routes must differ: {}",
            server.provenance_url_path
        )));
    }
    if server.max_body_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "max_body_bytes cannot be 0".to_string(),
        ));
    }

    TranslatorSettings::try_from(&config.translator)?;

    let otlp = &config.export.otlp;
    if otlp.enabled {
        // the gRPC channel is plaintext h2c
        if !otlp.endpoint.starts_with("http://") {
            return Err(ConfigError::ValidationError(format!(
                "OTLP endpoint must be an http:// URL (TLS is not supported): {}",
                otlp.endpoint
            )));
        }
        if otlp.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "OTLP timeout_secs must be greater than 0".to_string(),
            ));
        }
    }

    let jsonl = &config.export.jsonl;
    if jsonl.enabled && jsonl.path.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "JSONL export path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// A receiver route must be a literal path that axum can mount
fn validate_route(path: &str) -> ConfigResult<()> {
    if !path.starts_with('/') {
        return Err(ConfigError::ValidationError(format!(
            "URL path must start with '/': {}",
            path
        )));
    }
    if path.contains(['{', '}'])
        || path
            .split('/')
            .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
    {
        return Err(ConfigError::ValidationError(format!(
            "URL path must not contain route parameters or wildcards: {}",
            path
        )));
    }
    if RESERVED_PATHS.contains(&path) {
        return Err(ConfigError::ValidationError(format!(
            "URL path is reserved by the receiver: {}",
            path
        )));
    }
    Ok(())
}
