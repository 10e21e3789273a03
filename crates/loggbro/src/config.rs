// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::time::Duration;

use reqwest::header::HeaderValue;

use crate::errors::ConfigError;

pub const DEFAULT_INGEST_URL: &str = "https://cloud.humio.com/api/v1/ingest/humio-structured";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_SYSLOG_PORT: u16 = 514;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer token for the ingestion endpoint
    pub token: String,
    /// Full URL batches are posted to
    pub ingest_url: String,
    /// Host the syslog listener binds to
    pub host: String,
    /// Port for both the UDP and TCP syslog listeners
    pub port: u16,
    pub flush_interval: Duration,
    /// Upper bound for one shipping request
    pub flush_timeout: Duration,
    /// Opt-in cap on buffered events; `None` (the default) keeps every record
    pub max_buffered_events: Option<usize>,
    /// Log every received record
    pub verbose: bool,
    pub https_proxy: Option<String>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Default settings around the given token.
    pub fn for_token(token: &str) -> Self {
        Self {
            token: token.to_string(),
            ingest_url: DEFAULT_INGEST_URL.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_SYSLOG_PORT,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            max_buffered_events: None,
            verbose: false,
            https_proxy: None,
            log_level: "info".to_string(),
        }
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = env::var("HUMIO_TOKEN").unwrap_or_default();
        let mut config = Self::for_token(&token);

        if let Ok(url) = env::var("LOGGBRO_INGEST_URL") {
            config.ingest_url = url;
        }
        if let Ok(host) = env::var("LOGGBRO_HOST") {
            config.host = host;
        }
        if let Some(port) = parse_var::<u16>("LOGGBRO_PORT")? {
            config.port = port;
        }
        if let Some(secs) = parse_var::<u64>("LOGGBRO_FLUSH_INTERVAL")? {
            config.flush_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>("LOGGBRO_FLUSH_TIMEOUT")? {
            config.flush_timeout = Duration::from_secs(secs);
        }
        if let Some(max) = parse_var::<usize>("LOGGBRO_MAX_BUFFERED_EVENTS")? {
            config.max_buffered_events = (max > 0).then_some(max);
        }
        config.verbose = env::var("LOGGBRO_VERBOSE")
            .map(|val| matches!(val.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);
        config.https_proxy = env::var("LOGGBRO_PROXY_HTTPS")
            .or_else(|_| env::var("HTTPS_PROXY"))
            .ok();
        if let Ok(level) = env::var("LOGGBRO_LOG_LEVEL") {
            config.log_level = level.to_lowercase();
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::Invalid("HUMIO_TOKEN is not set".to_string()));
        }
        self.authorization()?;

        if !(self.ingest_url.starts_with("http://") || self.ingest_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "Ingest URL '{}' must start with http:// or https://",
                self.ingest_url
            )));
        }

        if self.flush_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "Flush interval must be greater than 0".to_string(),
            ));
        }

        if self.flush_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "Flush timeout must be greater than 0".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    /// `Bearer <token>`, marked sensitive so it never shows up in debug output.
    pub fn authorization(&self) -> Result<HeaderValue, ConfigError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.token)).map_err(|_| {
            ConfigError::Invalid(
                "HUMIO_TOKEN contains characters not allowed in an HTTP header".to_string(),
            )
        })?;
        value.set_sensitive(true);
        Ok(value)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{name} has an invalid value '{val}'"))),
        Err(_) => Ok(None),
    }
}
