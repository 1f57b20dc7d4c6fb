//! # jsonrest Core
//!
//! Core contracts shared by every jsonrest crate.
//!
//! This crate provides:
//!
//! - [`Handler`]: anything that serves a request through a writer
//! - [`ResponseWriter`]: the JSON writer capability set, plus the
//!   [`BaseResponseWriter`] and the indent / gzip / JSONP decorators
//! - [`Request`]: the host request plus path params and the per-request [`Env`]
//! - [`HostResponseWriter`]: what a host HTTP stack must provide
//! - The error taxonomy ([`ConfigError`], [`HttpError`], [`HandlerFault`], [`WriteError`])
//!
//! ## Example
//!
//! ```
//! use jsonrest_core::{
//!     handler_fn, BaseResponseWriter, BufferedHostWriter, Handler, Request, ResponseWriter,
//!     WriterOptions,
//! };
//! use bytes::Bytes;
//! use serde_json::json;
//!
//! let handler = handler_fn(|w: &mut dyn ResponseWriter, r: &mut Request| {
//!     let _ = w.write_json(&json!({ "Path": r.uri().path() }));
//! });
//!
//! let mut host = BufferedHostWriter::new();
//! let mut request = Request::new(http::Request::new(Bytes::new()));
//! {
//!     let mut writer = BaseResponseWriter::new(&mut host, WriterOptions::default());
//!     handler.serve(&mut writer, &mut request);
//! }
//! assert_eq!(host.body(), br#"{"Path":"/"}"#);
//! ```

#![doc(html_root_url = "https://docs.rs/jsonrest-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod env;
pub mod error;
pub mod handler;
pub mod host;
pub mod request;
pub mod writer;

pub use env::Env;
pub use error::{
    write_error, write_not_found, ConfigError, ErrorEnvelope, HandlerFault, HttpError,
    PayloadError, WriteError, ERROR_FIELD_NAME,
};
pub use handler::{boxed, handler_fn, BoxHandler, Handler};
pub use host::{BufferedHostWriter, HostResponseWriter};
pub use request::{canonical_header_key, query_unescape, CorsInfo, Request};
pub use writer::{
    BaseResponseWriter, CloseNotifier, CloseNotify, GzipResponseWriter, HijackedConnection,
    IndentResponseWriter, JsonpResponseWriter, ResponseWriter, WriterOptions,
};
