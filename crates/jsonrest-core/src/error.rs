//! Error types for jsonrest.
//!
//! Errors fall into four families:
//!
//! | Type | When | Surfaced as |
//! |---|---|---|
//! | [`ConfigError`] | startup (routes, middleware options) | `Err` from the builder |
//! | [`HttpError`] | request time, client mistakes | JSON error envelope with a 4xx/5xx status |
//! | [`HandlerFault`] | a handler panicked | logged by the recover middleware, 500 |
//! | [`WriteError`] | the response could not be written | logged |
//!
//! Every error response body has the same shape:
//!
//! ```json
//! {"Error":"Resource not found"}
//! ```

use std::io;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::Request;
use crate::writer::ResponseWriter;

/// Name of the field carrying the message in the error envelope.
pub const ERROR_FIELD_NAME: &str = "Error";

/// Errors detected while building routes or middlewares.
///
/// A `ConfigError` means the service must not start.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The path pattern is the empty string.
    #[error("empty path pattern")]
    EmptyPattern,

    /// The path pattern does not begin with `/`.
    #[error("path pattern must start with /: {0}")]
    MissingLeadingSlash(String),

    /// The path pattern carries a query string.
    #[error("path pattern must not contain the query string: {0}")]
    QueryInPattern(String),

    /// The path pattern could not be parsed as a URL path.
    #[error("invalid path pattern {pattern}: {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Why parsing failed.
        reason: String,
    },

    /// The same method and pattern were declared twice.
    #[error("duplicated route: {method} {pattern}")]
    DuplicateRoute {
        /// HTTP method of the route.
        method: String,
        /// Path pattern of the route.
        pattern: String,
    },

    /// Sibling routes name the same placeholder position differently.
    #[error("routes sharing a common placeholder must name it consistently: {existing} != {found}")]
    InconsistentPlaceholder {
        /// Name registered first.
        existing: String,
        /// Name found in the new pattern.
        found: String,
    },

    /// A pattern uses the same placeholder name twice.
    #[error("a route can't have two placeholders with the same name: {0}")]
    DuplicatePlaceholder(String),

    /// A placeholder marker is not followed by a name.
    #[error("placeholder without a name in pattern: {0}")]
    EmptyPlaceholderName(String),

    /// A placeholder name is not `[A-Za-z_][A-Za-z0-9_]*`.
    #[error("invalid placeholder name: {0}")]
    InvalidPlaceholderName(String),

    /// A route was added to a trie that has already been compressed.
    #[error("routes can't be added after compression")]
    TrieCompressed,

    /// A middleware was built without a required option.
    #[error("{middleware}: {option} is required")]
    MissingOption {
        /// Middleware name.
        middleware: &'static str,
        /// Missing option.
        option: &'static str,
    },

    /// A middleware option has an unusable value.
    #[error("{middleware}: invalid {option}: {reason}")]
    InvalidOption {
        /// Middleware name.
        middleware: &'static str,
        /// Offending option.
        option: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates a missing option error.
    pub fn missing_option(middleware: &'static str, option: &'static str) -> Self {
        Self::MissingOption { middleware, option }
    }

    /// Creates an invalid option error.
    pub fn invalid_option(
        middleware: &'static str,
        option: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidOption {
            middleware,
            option,
            reason: reason.into(),
        }
    }
}

/// Errors that become an HTTP response.
///
/// Each variant carries the message placed in the error envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// 400, e.g. a malformed `Authorization` header.
    #[error("{0}")]
    BadRequest(String),

    /// 401, missing or rejected credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// 403, e.g. a rejected CORS origin.
    #[error("{0}")]
    Forbidden(String),

    /// 404, no route matched the path.
    #[error("{0}")]
    NotFound(String),

    /// 405, a route matched the path but not the method.
    #[error("{0}")]
    MethodNotAllowed(String),

    /// 413, the request body exceeds the host limit.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// 415, the request body is not JSON.
    #[error("{0}")]
    UnsupportedMediaType(String),

    /// 500, a handler fault.
    #[error("{0}")]
    Internal(String),
}

impl HttpError {
    /// The stock 404 error.
    #[must_use]
    pub fn not_found() -> Self {
        Self::NotFound("Resource not found".to_string())
    }

    /// The stock 405 error.
    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self::MethodNotAllowed("Method not allowed".to_string())
    }

    /// The stock 401 error.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::Unauthorized("Not Authorized".to_string())
    }

    /// The stock 500 error.
    #[must_use]
    pub fn internal() -> Self {
        Self::Internal("Internal Server Error".to_string())
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the message carried in the envelope.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::MethodNotAllowed(m)
            | Self::PayloadTooLarge(m)
            | Self::UnsupportedMediaType(m)
            | Self::Internal(m) => m,
        }
    }

    /// Converts this error to a serializable error envelope.
    #[must_use]
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope::new(self.message())
    }

    /// Writes the status and the envelope to `writer`.
    pub fn write_to(&self, writer: &mut dyn ResponseWriter) {
        write_error(writer, self.message(), self.status_code());
    }
}

/// The JSON error body: `{"Error":"<message>"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorEnvelope {
    /// Human-readable error message.
    #[serde(rename = "Error")]
    pub error: String,
}

impl ErrorEnvelope {
    /// Creates an envelope for `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// A panic caught inside a handler.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct HandlerFault {
    message: String,
    backtrace: String,
}

impl HandlerFault {
    /// Creates a fault from a panic message and a rendered backtrace.
    pub fn new(message: impl Into<String>, backtrace: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            backtrace: backtrace.into(),
        }
    }

    /// The panic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The backtrace captured when the panic happened.
    #[must_use]
    pub fn backtrace(&self) -> &str {
        &self.backtrace
    }

    /// Message and backtrace, separated by a blank line.
    #[must_use]
    pub fn report(&self) -> String {
        format!("{}\n\n{}", self.message, self.backtrace)
    }
}

/// Errors raised while writing a response.
#[derive(Error, Debug)]
pub enum WriteError {
    /// The host writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The value could not be encoded as JSON.
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// The writer chain does not provide this capability.
    #[error("{0} is not supported by this response writer")]
    Unsupported(&'static str),

    /// A header value could not be built.
    #[error("invalid header value: {0}")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),
}

/// Errors raised while decoding a request payload.
#[derive(Error, Debug)]
pub enum PayloadError {
    /// The request has no body.
    #[error("JSON payload is empty")]
    Empty,

    /// The body is not valid JSON for the target type.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes `status` and the JSON error envelope for `message`.
///
/// If a header was already written the status is ignored by the writer chain,
/// only the body is appended.
pub fn write_error(writer: &mut dyn ResponseWriter, message: &str, status: StatusCode) {
    writer.write_header(status);
    let body = serde_json::json!({ ERROR_FIELD_NAME: message });
    if let Err(e) = writer.write_json(&body) {
        tracing::error!(error = %e, status = status.as_u16(), "failed to write error response");
    }
}

/// Writes the stock 404 response.
pub fn write_not_found(writer: &mut dyn ResponseWriter, _request: &Request) {
    HttpError::not_found().write_to(writer);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_status_codes() {
        assert_eq!(HttpError::not_found().status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            HttpError::method_not_allowed().status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(HttpError::unauthorized().status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            HttpError::UnsupportedMediaType("x".into()).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            HttpError::internal().status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_envelope_shape() {
        let json = serde_json::to_string(&HttpError::not_found().to_envelope()).unwrap();
        assert_eq!(json, r#"{"Error":"Resource not found"}"#);

        let json = serde_json::to_string(&HttpError::method_not_allowed().to_envelope()).unwrap();
        assert_eq!(json, r#"{"Error":"Method not allowed"}"#);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::DuplicateRoute {
            method: "GET".into(),
            pattern: "/users/:id".into(),
        };
        assert_eq!(err.to_string(), "duplicated route: GET /users/:id");

        let err = ConfigError::missing_option("auth-basic", "realm");
        assert_eq!(err.to_string(), "auth-basic: realm is required");
    }

    #[test]
    fn test_handler_fault_report() {
        let fault = HandlerFault::new("boom", "frame 0");
        assert_eq!(fault.to_string(), "boom");
        assert_eq!(fault.report(), "boom\n\nframe 0");
    }

    #[test]
    fn test_payload_error_empty() {
        assert_eq!(PayloadError::Empty.to_string(), "JSON payload is empty");
    }
}
