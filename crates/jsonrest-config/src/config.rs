//! Main configuration types.
//!
//! This module provides the top-level [`JsonRestConfig`] struct and its builder.

use jsonrest_telemetry::{create_env_filter, LogConfig};
use serde::{Deserialize, Serialize};

use crate::{ApiConfig, ConfigError, LogFormat, LoggingConfig, ServerConfig, StackKind};

/// Complete jsonrest service configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use jsonrest_config::JsonRestConfig;
///
/// let config = JsonRestConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct JsonRestConfig {
    /// HTTP host configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Pipeline configuration.
    #[serde(default)]
    pub api: ApiConfig,
}

impl JsonRestConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use jsonrest_config::{JsonRestConfig, ServerConfig};
    ///
    /// let config = JsonRestConfig::builder()
    ///     .server(ServerConfig {
    ///         http_addr: "127.0.0.1:3000".to_string(),
    ///         ..Default::default()
    ///     })
    ///     .build();
    ///
    /// assert_eq!(config.server.http_addr, "127.0.0.1:3000");
    /// ```
    #[must_use]
    pub fn builder() -> JsonRestConfigBuilder {
        JsonRestConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `server.http_addr` is not a socket address
    /// - `server.max_body_bytes` is zero
    /// - `logging.level` is not a valid filter
    /// - `api.powered_by` is empty or not a valid header value
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .server
            .http_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        if let Err(e) = create_env_filter(&self.logging.level) {
            return Err(ConfigError::invalid_value("logging.level", e.to_string()));
        }

        if let Some(powered_by) = &self.api.powered_by {
            if powered_by.is_empty() || powered_by.chars().any(char::is_control) {
                return Err(ConfigError::invalid_value(
                    "api.powered_by",
                    "must be a non-empty header value",
                ));
            }
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// - Pretty log formatting at `debug`
    /// - The dev middleware stack
    /// - Indented JSON
    ///
    /// # Example
    ///
    /// ```
    /// use jsonrest_config::{JsonRestConfig, StackKind};
    ///
    /// let config = JsonRestConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// assert_eq!(config.api.stack, StackKind::Dev);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.server.http_addr = "127.0.0.1:8080".to_string();
        config.server.shutdown_timeout_secs = 5;

        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;

        config.api.stack = StackKind::Dev;
        config.api.indent_json = true;

        config
    }

    /// Create a production configuration preset.
    ///
    /// - JSON log formatting at `info`
    /// - The prod middleware stack
    ///
    /// # Example
    ///
    /// ```
    /// use jsonrest_config::JsonRestConfig;
    ///
    /// let config = JsonRestConfig::production();
    /// assert_eq!(config.logging.format, jsonrest_config::LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;

        config.api.stack = StackKind::Prod;
        config.api.indent_json = false;

        config
    }

    /// The logging setup matching this configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use jsonrest_config::JsonRestConfig;
    ///
    /// let log = JsonRestConfig::development().log_config();
    /// assert!(!log.json_format);
    /// assert_eq!(log.level, "debug");
    /// ```
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        let base = match self.logging.format {
            LogFormat::Json => LogConfig::production(),
            LogFormat::Pretty => LogConfig::development(),
        };
        LogConfig {
            level: self.logging.level.clone(),
            access_log: self.logging.access_log,
            ..base
        }
    }
}

/// Builder for [`JsonRestConfig`].
#[derive(Debug, Default)]
pub struct JsonRestConfigBuilder {
    server: Option<ServerConfig>,
    logging: Option<LoggingConfig>,
    api: Option<ApiConfig>,
}

impl JsonRestConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server configuration.
    #[must_use]
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.server = Some(server);
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Set the pipeline configuration.
    #[must_use]
    pub fn api(mut self, api: ApiConfig) -> Self {
        self.api = Some(api);
        self
    }

    /// Build the configuration.
    ///
    /// Any unset sections will use their default values.
    #[must_use]
    pub fn build(self) -> JsonRestConfig {
        JsonRestConfig {
            server: self.server.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
            api: self.api.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<JsonRestConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
