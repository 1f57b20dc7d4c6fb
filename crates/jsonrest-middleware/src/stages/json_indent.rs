//! Pretty-printed JSON.

use jsonrest_core::{IndentResponseWriter, Request, ResponseWriter};

use crate::middleware::{Middleware, Next};

/// Renders JSON payloads with indentation.
///
/// Kept for existing stacks; new code can set `WriterOptions::indent`
/// instead.
#[derive(Debug, Clone)]
pub struct JsonIndentMiddleware {
    prefix: String,
    indent: String,
}

impl JsonIndentMiddleware {
    /// Two-space indentation, no prefix.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prefix: String::new(),
            indent: "  ".to_string(),
        }
    }

    /// Sets the string starting every line after the first.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the indentation unit.
    #[must_use]
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }
}

impl Default for JsonIndentMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for JsonIndentMiddleware {
    fn name(&self) -> &'static str {
        "json-indent"
    }

    fn process(&self, writer: &mut dyn ResponseWriter, request: &mut Request, next: Next<'_>) {
        let mut indent = IndentResponseWriter::new(writer, &self.prefix, &self.indent);
        next.run(&mut indent, request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Api;
    use jsonrest_core::handler_fn;
    use jsonrest_test::{run_request, TestRequest};

    #[test]
    fn test_indents_payload() {
        let mut api = Api::new();
        api.use_middleware(JsonIndentMiddleware::new())
            .set_app(handler_fn(|w, _r| {
                let _ = w.write_json(&serde_json::json!({ "Id": "123" }));
            }));
        run_request(&api.make_handler(), TestRequest::get("/").build().unwrap())
            .content_type_is_json()
            .body_is("{\n  \"Id\": \"123\"\n}");
    }
}
