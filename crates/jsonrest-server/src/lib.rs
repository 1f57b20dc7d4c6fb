//! # jsonrest Server
//!
//! HTTP host for jsonrest pipelines.
//!
//! The pipeline itself is synchronous: a handler writes to a
//! [`ResponseWriter`](jsonrest_core::ResponseWriter) and returns. This crate
//! bridges it to an async Hyper server:
//!
//! - HTTP/1.1 via Hyper, one Tokio task per connection
//! - Request bodies collected up to a configurable limit (413 beyond it)
//! - Pipelines run on the blocking pool, responses are buffered
//! - Client disconnects fire the request's close-notify
//! - Graceful shutdown on SIGTERM/SIGINT or a [`ShutdownSignal`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use jsonrest_middleware::Api;
//! use jsonrest_server::{Server, ShutdownSignal};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), jsonrest_server::ServerError> {
//!     let shutdown = ShutdownSignal::new();
//!     Server::builder()
//!         .http_addr("127.0.0.1:8080")
//!         .build(Api::new().make_handler())
//!         .run_with_shutdown(shutdown)
//!         .await
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/jsonrest-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod server;
mod shutdown;

pub use config::{
    ServerConfig, ServerConfigBuilder, DEFAULT_HTTP_ADDR, DEFAULT_MAX_BODY_BYTES,
    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
pub use error::{ServerError, ServerResult};
pub use server::{HttpResponse, ResponseBody, Server, ServerBuilder};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
