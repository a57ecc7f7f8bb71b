//! Configuration management for winrm-ps.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file (JSON)
//! 3. Default values
//!
//! Connection parameters are the transport's business and do not live here.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::execution::{
    LengthGuard, RemoteTempFile, DEFAULT_MAX_COMMAND_LENGTH, DEFAULT_TEMP_FILE_PREFIX,
};
use crate::session::{
    PollPolicy, DEFAULT_COMMAND_TIMEOUT, DEFAULT_MAX_POLL_INTERVAL, DEFAULT_POLL_INTERVAL,
};

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Protocol limits.
    pub protocol: ProtocolSection,
    /// Receive loop pacing.
    pub polling: PollingSection,
    /// Upload-and-run settings.
    pub upload: UploadSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Protocol configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolSection {
    /// Longest command line, in bytes, sent in one request.
    pub max_command_length: usize,
}

impl Default for ProtocolSection {
    fn default() -> Self {
        Self {
            max_command_length: DEFAULT_MAX_COMMAND_LENGTH,
        }
    }
}

/// Polling configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSection {
    /// Delay after an empty receive, in milliseconds.
    pub poll_interval_ms: u64,
    /// Backoff cap, in milliseconds.
    pub max_poll_interval_ms: u64,
    /// Per-command limit in seconds. `null` or 0 disables it.
    pub command_timeout_secs: Option<u64>,
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            max_poll_interval_ms: DEFAULT_MAX_POLL_INTERVAL.as_millis() as u64,
            command_timeout_secs: Some(DEFAULT_COMMAND_TIMEOUT.as_secs()),
        }
    }
}

/// Upload configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    /// Send oversized inline commands through the upload path.
    pub auto_upload: bool,
    /// Prefix for remote temp file names.
    pub temp_file_prefix: String,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            auto_upload: false,
            temp_file_prefix: DEFAULT_TEMP_FILE_PREFIX.to_string(),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or a full filter.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Unparseable values are ignored.
    pub fn apply_env(&mut self) {
        if let Some(length) = env_parse("WINRM_PS_MAX_COMMAND_LENGTH") {
            self.protocol.max_command_length = length;
        }

        if let Some(secs) = env_parse::<u64>("WINRM_PS_COMMAND_TIMEOUT") {
            self.polling.command_timeout_secs = Some(secs);
        }

        if let Ok(value) = std::env::var("WINRM_PS_AUTO_UPLOAD") {
            self.upload.auto_upload = matches!(value.as_str(), "1" | "true" | "yes" | "on");
        }

        if let Ok(level) = std::env::var("WINRM_PS_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: env vars > config file > defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env();
        config.validate()?;

        Ok(config)
    }

    /// Check values that would make the engine unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Generated names have a fixed length, so any sample gives the bound
        let required = RemoteTempFile::generate(&self.upload.temp_file_prefix)
            .required_command_length();
        if self.protocol.max_command_length < required {
            return Err(ConfigError::Invalid(format!(
                "protocol.max_command_length must be at least {required}, got {}",
                self.protocol.max_command_length
            )));
        }
        if self.polling.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "polling.poll_interval_ms must be greater than 0".into(),
            ));
        }
        if self.polling.max_poll_interval_ms < self.polling.poll_interval_ms {
            return Err(ConfigError::Invalid(
                "polling.max_poll_interval_ms must not be below polling.poll_interval_ms".into(),
            ));
        }
        Ok(())
    }

    /// Build the length guard.
    pub fn length_guard(&self) -> LengthGuard {
        LengthGuard::new(self.protocol.max_command_length).with_auto_upload(self.upload.auto_upload)
    }

    /// Build the receive loop policy.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            poll_interval: Duration::from_millis(self.polling.poll_interval_ms),
            max_poll_interval: Duration::from_millis(self.polling.max_poll_interval_ms),
            command_timeout: self
                .polling
                .command_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing error.
    #[error("failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
