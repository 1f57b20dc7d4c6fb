//! # jsonrest Test
//!
//! Test utilities for jsonrest: build a request, run it through a handler
//! in memory, and assert on the recorded response. No socket is opened.
//!
//! ## Key Features
//!
//! - **Request Builder**: fluent API for headers, JSON bodies and credentials
//! - **In-Memory Runs**: any [`Handler`](jsonrest_core::Handler), from a bare
//!   closure to a full pipeline
//! - **Assertions**: chained checks on status, headers and body
//! - **Gzip Aware**: JSON decoding gunzips compressed bodies
//!
//! ## Example
//!
//! ```
//! use jsonrest_core::{handler_fn, Request, ResponseWriter};
//! use jsonrest_test::{make_simple_request, run_request};
//! use serde_json::json;
//!
//! let handler = handler_fn(|w: &mut dyn ResponseWriter, _r: &mut Request| {
//!     let _ = w.write_json(&json!({ "Id": "123" }));
//! });
//!
//! let request = make_simple_request("GET", "http://1.2.3.4/users/123", None).unwrap();
//! run_request(&handler, request)
//!     .code_is(200)
//!     .content_type_is_json()
//!     .body_is(r#"{"Id":"123"}"#);
//! ```

#![doc(html_root_url = "https://docs.rs/jsonrest-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod recorded;
mod request;

pub use error::TestError;
pub use recorded::{run_request, run_request_with_options, Recorded};
pub use request::{make_simple_request, TestRequest, TestRequestBuilder};
