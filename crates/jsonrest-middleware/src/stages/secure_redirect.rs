//! Redirection of plain HTTP requests behind a TLS-terminating proxy.

use http::header::{HeaderValue, LOCATION};
use http::StatusCode;
use jsonrest_core::{Request, ResponseWriter};

use crate::middleware::{Middleware, Next};

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Answers `301` towards `https://` when the proxy reports another scheme.
///
/// Only requests carrying `X-Forwarded-Proto` are considered, so direct
/// connections are served as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureRedirectMiddleware;

impl SecureRedirectMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for SecureRedirectMiddleware {
    fn name(&self) -> &'static str {
        "secure-redirect"
    }

    fn process(&self, writer: &mut dyn ResponseWriter, request: &mut Request, next: Next<'_>) {
        let proto = request.header_str(X_FORWARDED_PROTO).map(str::trim);
        match proto {
            Some(proto) if !proto.eq_ignore_ascii_case("https") => {
                let location = format!(
                    "https://{}{}",
                    request.host().unwrap_or_default(),
                    request.request_uri()
                );
                match HeaderValue::from_str(&location) {
                    Ok(location) => {
                        writer.headers().insert(LOCATION, location);
                        writer.write_header(StatusCode::MOVED_PERMANENTLY);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "cannot build redirect location");
                        next.run(writer, request);
                    }
                }
            }
            _ => next.run(writer, request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Api;
    use jsonrest_core::handler_fn;
    use jsonrest_test::{run_request, Recorded, TestRequest, TestRequestBuilder};

    fn run(request: TestRequestBuilder) -> Recorded {
        let mut api = Api::new();
        api.use_middleware(SecureRedirectMiddleware::new())
            .set_app(handler_fn(|w, _r| {
                let _ = w.write_json(&serde_json::json!({ "Id": "123" }));
            }));
        run_request(&api.make_handler(), request.build().unwrap())
    }

    #[test]
    fn test_redirects_plain_http() {
        run(TestRequest::get("http://api.example.com/users/1?x=y").header("X-Forwarded-Proto", "http"))
            .code_is(301)
            .header_is("location", "https://api.example.com/users/1?x=y")
            .body_is("");
    }

    #[test]
    fn test_https_and_direct_pass_through() {
        run(TestRequest::get("http://api.example.com/").header("X-Forwarded-Proto", "https"))
            .code_is(200);
        run(TestRequest::get("http://api.example.com/")).code_is(200);
    }
}
