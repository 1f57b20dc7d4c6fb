//! Typed configuration for jsonrest services.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → files → env)
//!
//! # Overview
//!
//! [`JsonRestConfig`] has three sections:
//!
//! - [`ServerConfig`] - HTTP host settings (address, shutdown, body limit)
//! - [`LoggingConfig`] - Log level and format, mapped to
//!   [`jsonrest_telemetry::LogConfig`] by [`JsonRestConfig::log_config`]
//! - [`ApiConfig`] - Stock middleware stack and base writer options
//!
//! # Example
//!
//! ```no_run
//! use jsonrest_config::ConfigLoader;
//!
//! # fn main() -> Result<(), jsonrest_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("jsonrest.toml")?
//!     .with_dotenv()?
//!     .with_env_prefix("JSONREST")
//!     .load()?;
//!
//! println!("Server will listen on: {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! max_body_bytes = 10485760
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [api]
//! stack = "prod"
//! powered_by = "my-service"
//! indent_json = false
//! disable_trie_compression = false
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `PREFIX__SECTION__KEY` variables:
//!
//! - `JSONREST__SERVER__HTTP_ADDR=0.0.0.0:9000`
//! - `JSONREST__LOGGING__LEVEL=debug`
//! - `JSONREST__API__STACK=dev`

#![doc(html_root_url = "https://docs.rs/jsonrest-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{JsonRestConfig, JsonRestConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{ApiConfig, LogFormat, LoggingConfig, ServerConfig, StackKind};
