//! `X-Powered-By` header.

use http::header::HeaderName;
use http::HeaderValue;
use jsonrest_core::{ConfigError, Request, ResponseWriter};

use crate::middleware::{Middleware, Next};

/// Default header value.
pub const DEFAULT_POWERED_BY: &str = "jsonrest";

const X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");

/// Adds `X-Powered-By` to every response.
#[derive(Debug, Clone)]
pub struct PoweredByMiddleware {
    value: HeaderValue,
}

impl PoweredByMiddleware {
    /// Uses `value` as the header value.
    pub fn new(value: &str) -> Result<Self, ConfigError> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| ConfigError::invalid_option("powered-by", "value", e.to_string()))?;
        Ok(Self { value })
    }
}

impl Default for PoweredByMiddleware {
    fn default() -> Self {
        Self {
            value: HeaderValue::from_static(DEFAULT_POWERED_BY),
        }
    }
}

impl Middleware for PoweredByMiddleware {
    fn name(&self) -> &'static str {
        "powered-by"
    }

    fn process(&self, writer: &mut dyn ResponseWriter, request: &mut Request, next: Next<'_>) {
        writer.headers().insert(X_POWERED_BY, self.value.clone());
        next.run(writer, request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Api;
    use jsonrest_core::handler_fn;
    use jsonrest_test::{run_request, TestRequest};

    fn run(middleware: PoweredByMiddleware) -> jsonrest_test::Recorded {
        let mut api = Api::new();
        api.use_middleware(middleware).set_app(handler_fn(|w, _r| {
            let _ = w.write_json(&serde_json::json!({}));
        }));
        run_request(&api.make_handler(), TestRequest::get("/").build().unwrap())
    }

    #[test]
    fn test_default_value() {
        run(PoweredByMiddleware::default()).header_is("x-powered-by", DEFAULT_POWERED_BY);
    }

    #[test]
    fn test_custom_value() {
        run(PoweredByMiddleware::new("my-service").unwrap()).header_is("x-powered-by", "my-service");
    }

    #[test]
    fn test_invalid_value_is_rejected() {
        assert!(PoweredByMiddleware::new("bad\nvalue").is_err());
    }
}
