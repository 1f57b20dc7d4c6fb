//! Logging setup for jsonrest services.
//!
//! jsonrest crates log through `tracing`. This crate installs a
//! `tracing-subscriber` registry with a JSON or pretty formatter and an
//! `EnvFilter`, configured by [`LogConfig`].
//!
//! ```no_run
//! use jsonrest_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development()).unwrap();
//! ```

#![doc(html_root_url = "https://docs.rs/jsonrest-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, ACCESS_LOG_TARGET};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
