//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating a [`JsonRestConfig`](crate::JsonRestConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The configuration file exists but could not be read.
    #[error("cannot read configuration file {path}")]
    ReadError {
        /// Path of the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Neither TOML nor JSON.
    #[error("unsupported configuration format `{format}` (expected toml or json)")]
    UnsupportedFormat {
        /// File extension or format name that was given.
        format: String,
    },

    /// A TOML layer did not parse.
    #[error("invalid TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A JSON layer did not parse, or the merged layers do not fit the schema
    /// (unknown fields, wrong types).
    #[error("invalid JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A `.env` file exists but is malformed.
    #[error("cannot load .env file: {0}")]
    DotEnv(#[from] dotenvy::Error),

    /// A field holds a value the server cannot run with.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted field path, e.g. `server.http_addr`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An environment override could not be parsed.
    #[error("cannot parse environment variable {var}: {reason}")]
    EnvParseError {
        /// Full variable name, prefix included.
        var: String,
        /// What was expected.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub(crate) fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Creates an [`InvalidValue`](Self::InvalidValue) error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_names_path() {
        let err = ConfigError::file_not_found("/etc/jsonrest/config.toml");
        assert!(err.to_string().contains("/etc/jsonrest/config.toml"));
    }

    #[test]
    fn test_unsupported_format_message() {
        let err = ConfigError::unsupported_format("yaml");
        assert_eq!(
            err.to_string(),
            "unsupported configuration format `yaml` (expected toml or json)"
        );
    }

    #[test]
    fn test_invalid_value_names_field() {
        let err = ConfigError::invalid_value("api.powered_by", "must not be empty");
        assert_eq!(
            err.to_string(),
            "invalid value for api.powered_by: must not be empty"
        );
    }

    #[test]
    fn test_env_parse_error_names_variable() {
        let err = ConfigError::env_parse_error("JSONREST__SERVER__MAX_BODY_BYTES", "expected integer");
        assert!(err.to_string().contains("JSONREST__SERVER__MAX_BODY_BYTES"));
        assert!(err.to_string().contains("expected integer"));
    }
}
