//! JSONP responses.

use jsonrest_core::{JsonpResponseWriter, Request, ResponseWriter};

use crate::middleware::{Middleware, Next};

/// Wraps JSON payloads in a callback when the request names one.
///
/// The callback is read from the query parameter `callback` unless another
/// key is configured. Requests without it are passed through untouched.
#[derive(Debug, Clone)]
pub struct JsonpMiddleware {
    callback_name_key: String,
}

impl JsonpMiddleware {
    /// Reads the callback from `?callback=`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            callback_name_key: "callback".to_string(),
        }
    }

    /// Reads the callback from another query parameter.
    #[must_use]
    pub fn with_callback_name_key(mut self, key: impl Into<String>) -> Self {
        self.callback_name_key = key.into();
        self
    }
}

impl Default for JsonpMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for JsonpMiddleware {
    fn name(&self) -> &'static str {
        "jsonp"
    }

    fn process(&self, writer: &mut dyn ResponseWriter, request: &mut Request, next: Next<'_>) {
        match request.query_param(&self.callback_name_key) {
            Some(callback) if !callback.is_empty() => {
                let mut jsonp = JsonpResponseWriter::new(writer, &callback);
                next.run(&mut jsonp, request);
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
    use jsonrest_test::{run_request, TestRequest};

    fn api(middleware: JsonpMiddleware) -> Api {
        let mut api = Api::new();
        api.use_middleware(middleware).set_app(handler_fn(|w, _r| {
            let _ = w.write_json(&serde_json::json!({ "Id": "123" }));
        }));
        api
    }

    #[test]
    fn test_wraps_with_callback() {
        let request = TestRequest::get("/users/123?callback=parseResponse").build().unwrap();
        run_request(&api(JsonpMiddleware::new()).make_handler(), request)
            .code_is(200)
            .header_is("content-type", "text/javascript")
            .header_is("x-content-type-options", "nosniff")
            .body_is(r#"parseResponse({"Id":"123"})"#);
    }

    #[test]
    fn test_without_callback_is_plain_json() {
        let request = TestRequest::get("/users/123?callback=").build().unwrap();
        run_request(&api(JsonpMiddleware::new()).make_handler(), request)
            .content_type_is_json()
            .body_is(r#"{"Id":"123"}"#);
    }

    #[test]
    fn test_custom_key() {
        let middleware = JsonpMiddleware::new().with_callback_name_key("cb");
        let request = TestRequest::get("/?cb=handle&callback=ignored").build().unwrap();
        run_request(&api(middleware).make_handler(), request).body_is(r#"handle({"Id":"123"})"#);
    }
}
