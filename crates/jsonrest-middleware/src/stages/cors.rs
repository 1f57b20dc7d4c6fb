//! CORS (Cross-Origin Resource Sharing) middleware.
//!
//! Preflight requests are answered here without reaching the app. Simple
//! cross-origin requests get their response headers and continue.
//!
//! ## Example
//!
//! ```
//! use jsonrest_middleware::stages::CorsMiddleware;
//! use std::time::Duration;
//!
//! let cors = CorsMiddleware::builder()
//!     .origin_validator(|origin, _request| origin == "https://app.example.com")
//!     .allowed_methods(["GET", "POST", "PUT"])
//!     .allowed_headers(["Accept", "Content-Type", "X-Custom-Header", "Origin"])
//!     .allow_credentials(true)
//!     .max_age(Duration::from_secs(3600))
//!     .build()
//!     .unwrap();
//! # let _ = cors;
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::header::{self, HeaderValue};
use http::StatusCode;
use jsonrest_core::{canonical_header_key, ConfigError, HttpError, Request, ResponseWriter};

use crate::middleware::{Middleware, Next};

const NAME: &str = "cors";

/// Decides whether an `Origin` is accepted.
pub type OriginValidator = Arc<dyn Fn(&str, &Request) -> bool + Send + Sync>;

/// Handles CORS preflight and simple cross-origin requests.
#[derive(Clone)]
pub struct CorsMiddleware {
    reject_non_cors_requests: bool,
    origin_validator: OriginValidator,
    allowed_methods: Vec<String>,
    allowed_headers: Vec<String>,
    allow_methods_value: HeaderValue,
    allow_headers_value: HeaderValue,
    expose_headers_value: Option<HeaderValue>,
    allow_credentials: bool,
    max_age: Option<Duration>,
}

impl CorsMiddleware {
    /// Creates a CORS builder.
    #[must_use]
    pub fn builder() -> CorsBuilder {
        CorsBuilder::default()
    }

    fn forbid(writer: &mut dyn ResponseWriter, message: &str, origin: &str) {
        tracing::warn!(origin, reason = message, "CORS request rejected");
        HttpError::Forbidden(message.to_string()).write_to(writer);
    }

    fn is_allowed_method(&self, method: &str) -> bool {
        self.allowed_methods.iter().any(|m| m == method)
    }

    fn is_allowed_header(&self, name: &str) -> bool {
        self.allowed_headers.iter().any(|h| h == name)
    }

    fn set_common_headers(&self, writer: &mut dyn ResponseWriter, origin: HeaderValue) {
        let headers = writer.headers();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        if self.allow_credentials {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
    }
}

impl fmt::Debug for CorsMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorsMiddleware")
            .field("reject_non_cors_requests", &self.reject_non_cors_requests)
            .field("allowed_methods", &self.allowed_methods)
            .field("allowed_headers", &self.allowed_headers)
            .field("expose_headers", &self.expose_headers_value)
            .field("allow_credentials", &self.allow_credentials)
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

impl Middleware for CorsMiddleware {
    fn name(&self) -> &'static str {
        NAME
    }

    fn process(&self, writer: &mut dyn ResponseWriter, request: &mut Request, next: Next<'_>) {
        let info = request.cors_info();

        if !info.is_cors {
            if self.reject_non_cors_requests {
                Self::forbid(writer, "Non CORS request", &info.origin);
            } else {
                next.run(writer, request);
            }
            return;
        }

        if !(self.origin_validator)(&info.origin, request) {
            Self::forbid(writer, "Invalid Origin", &info.origin);
            return;
        }
        let Ok(origin) = HeaderValue::from_str(&info.origin) else {
            Self::forbid(writer, "Invalid Origin", &info.origin);
            return;
        };

        if info.is_preflight {
            let headers_allowed = info
                .access_control_request_headers
                .iter()
                .all(|h| self.is_allowed_header(h));
            if !self.is_allowed_method(&info.access_control_request_method) || !headers_allowed {
                Self::forbid(writer, "Invalid Preflight Request", &info.origin);
                return;
            }

            let headers = writer.headers();
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                self.allow_methods_value.clone(),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                self.allow_headers_value.clone(),
            );
            if let Some(max_age) = self.max_age {
                headers.insert(header::ACCESS_CONTROL_MAX_AGE, max_age.as_secs().into());
            }
            self.set_common_headers(writer, origin);
            writer.write_header(StatusCode::OK);
            return;
        }

        if let Some(expose) = &self.expose_headers_value {
            writer
                .headers()
                .append(header::ACCESS_CONTROL_EXPOSE_HEADERS, expose.clone());
        }
        self.set_common_headers(writer, origin);
        next.run(writer, request);
    }
}

/// Builder for [`CorsMiddleware`].
#[derive(Default)]
#[must_use]
pub struct CorsBuilder {
    reject_non_cors_requests: bool,
    origin_validator: Option<OriginValidator>,
    allowed_methods: Vec<String>,
    allowed_headers: Vec<String>,
    expose_headers: Vec<String>,
    allow_credentials: bool,
    max_age: Option<Duration>,
}

impl CorsBuilder {
    /// Answers non-CORS requests with 403 instead of passing them through.
    pub fn reject_non_cors_requests(mut self, reject: bool) -> Self {
        self.reject_non_cors_requests = reject;
        self
    }

    /// Sets the origin check. Required.
    pub fn origin_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str, &Request) -> bool + Send + Sync + 'static,
    {
        self.origin_validator = Some(Arc::new(validator));
        self
    }

    /// Methods accepted in preflight requests. Compared upper-cased.
    pub fn allowed_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_methods = methods
            .into_iter()
            .map(|m| m.as_ref().to_ascii_uppercase())
            .collect();
        self
    }

    /// Request headers accepted in preflight requests. Compared canonicalized.
    pub fn allowed_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_headers = headers
            .into_iter()
            .map(|h| canonical_header_key(h.as_ref()))
            .collect();
        self
    }

    /// Response headers exposed to scripts.
    pub fn expose_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.expose_headers = headers
            .into_iter()
            .map(|h| canonical_header_key(h.as_ref()))
            .collect();
        self
    }

    /// Sends `Access-Control-Allow-Credentials: true`.
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    /// How long browsers may cache a preflight answer.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Builds the middleware.
    pub fn build(self) -> Result<CorsMiddleware, ConfigError> {
        let origin_validator = self
            .origin_validator
            .ok_or_else(|| ConfigError::missing_option(NAME, "origin_validator"))?;

        let join = |option: &'static str, values: &[String]| {
            HeaderValue::from_str(&values.join(","))
                .map_err(|e| ConfigError::invalid_option(NAME, option, e.to_string()))
        };
        let allow_methods_value = join("allowed_methods", &self.allowed_methods)?;
        let allow_headers_value = join("allowed_headers", &self.allowed_headers)?;
        let expose_headers_value = if self.expose_headers.is_empty() {
            None
        } else {
            Some(join("expose_headers", &self.expose_headers)?)
        };

        Ok(CorsMiddleware {
            reject_non_cors_requests: self.reject_non_cors_requests,
            origin_validator,
            allowed_methods: self.allowed_methods,
            allowed_headers: self.allowed_headers,
            allow_methods_value,
            allow_headers_value,
            expose_headers_value,
            allow_credentials: self.allow_credentials,
            max_age: self.max_age,
        })
    }
}
