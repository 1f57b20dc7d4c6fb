//! Request body media type check.

use http::header::CONTENT_TYPE;
use jsonrest_core::{HttpError, Request, ResponseWriter};

use crate::middleware::{Middleware, Next};

/// Rejects request bodies that are not UTF-8 JSON with a 415.
///
/// Requests without a body are not checked. A missing charset counts as
/// UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentTypeCheckerMiddleware;

impl ContentTypeCheckerMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Media type (lower-cased) and charset (upper-cased, UTF-8 by default).
fn parse_content_type(value: &str) -> (String, String) {
    let mut parts = value.split(';');
    let media_type = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
    let charset = parts
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"').to_ascii_uppercase())
        .unwrap_or_else(|| "UTF-8".to_string());
    (media_type, charset)
}

impl Middleware for ContentTypeCheckerMiddleware {
    fn name(&self) -> &'static str {
        "content-type-checker"
    }

    fn process(&self, writer: &mut dyn ResponseWriter, request: &mut Request, next: Next<'_>) {
        if request.content_length() > 0 {
            let (media_type, charset) =
                parse_content_type(request.header_str(CONTENT_TYPE).unwrap_or_default());
            if media_type != "application/json" || charset != "UTF-8" {
                HttpError::UnsupportedMediaType(
                    "Bad Content-Type or charset, expected 'application/json'".to_string(),
                )
                .write_to(writer);
                return;
            }
        }
        next.run(writer, request);
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
        api.use_middleware(ContentTypeCheckerMiddleware::new())
            .set_app(handler_fn(|w, _r| {
                let _ = w.write_json(&serde_json::json!({ "Id": "123" }));
            }));
        run_request(&api.make_handler(), request.build().unwrap())
    }

    #[test]
    fn test_json_utf8_is_accepted() {
        let body = r#"{"Id":"123"}"#;
        run(TestRequest::post("/")
            .content_type("application/json; charset=utf-8")
            .body(body))
        .code_is(200);
        run(TestRequest::post("/").content_type("application/json").body(body)).code_is(200);
    }

    #[test]
    fn test_other_types_are_rejected() {
        run(TestRequest::post("/")
            .content_type("text/x-json")
            .body(r#"{"Id":"123"}"#))
        .code_is(415)
        .body_is(r#"{"Error":"Bad Content-Type or charset, expected 'application/json'"}"#);

        run(TestRequest::post("/")
            .content_type("application/json; charset=ISO-8859-1")
            .body("{}"))
        .code_is(415);
    }

    #[test]
    fn test_empty_body_is_not_checked() {
        run(TestRequest::get("/").content_type("text/plain")).code_is(200);
    }

    #[test]
    fn test_parse_content_type() {
        assert_eq!(
            parse_content_type(r#"Application/JSON; Charset="utf-8""#),
            ("application/json".to_string(), "UTF-8".to_string())
        );
        assert_eq!(parse_content_type(""), (String::new(), "UTF-8".to_string()));
    }
}
