//! Server configuration loading from file and environment variables.

use cosmos_hdfs::{HdfsApi, HdfsConfig};
use cosmos_sink::{BackoffPolicy, DEFAULT_CAPACITY};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Notification endpoint network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Remote HDFS store.
    #[serde(default)]
    pub hdfs: HdfsConfig,

    /// Channel and runner tuning.
    #[serde(default)]
    pub sink: SinkConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    /// Events the in-memory channel holds before `/notify` answers 503.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl SinkConfig {
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.backoff_step_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "cosmos_sink=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8081
}

fn default_channel_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_backoff_step_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            backoff_step_ms: default_backoff_step_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override carries a value that cannot be used.
    #[error("invalid value for {var}: {reason}")]
    InvalidEnv { var: &'static str, reason: String },
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `COSMOS_HOST` overrides `server.host`
/// - `COSMOS_PORT` overrides `server.port`
/// - `COSMOS_HDFS_HOST` overrides `hdfs.host`
/// - `COSMOS_HDFS_PORT` overrides `hdfs.port`
/// - `COSMOS_HDFS_USERNAME` overrides `hdfs.username`
/// - `COSMOS_HDFS_DATASET` overrides `hdfs.dataset`
/// - `COSMOS_HDFS_API` overrides `hdfs.api` (`httpfs` or `webhdfs`)
/// - `COSMOS_LOG_LEVEL` overrides `logging.level`
/// - `COSMOS_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed,
/// or if `COSMOS_HDFS_API` names an unknown API.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    load_config_with(path, |var| std::env::var(var).ok())
}

/// Same as [`load_config`], reading overrides through `env`.
pub fn load_config_with(
    path: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    if let Some(host) = env("COSMOS_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = env("COSMOS_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(host) = env("COSMOS_HDFS_HOST") {
        config.hdfs.host = host;
    }
    if let Some(port) = env("COSMOS_HDFS_PORT") {
        if let Ok(parsed) = port.parse() {
            config.hdfs.port = parsed;
        }
    }
    if let Some(username) = env("COSMOS_HDFS_USERNAME") {
        config.hdfs.username = username;
    }
    if let Some(dataset) = env("COSMOS_HDFS_DATASET") {
        config.hdfs.dataset = dataset;
    }
    if let Some(api) = env("COSMOS_HDFS_API") {
        config.hdfs.api = api.parse::<HdfsApi>().map_err(|e| ConfigError::InvalidEnv {
            var: "COSMOS_HDFS_API",
            reason: e.to_string(),
        })?;
    }
    if let Some(level) = env("COSMOS_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = env("COSMOS_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}
