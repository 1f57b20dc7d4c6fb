//! Running handlers in memory and asserting on what they wrote.

use std::io::Read;

use flate2::read::GzDecoder;
use http::{header, HeaderMap, StatusCode};
use jsonrest_core::{BaseResponseWriter, BufferedHostWriter, Handler, WriterOptions};
use serde::de::DeserializeOwned;

use crate::error::TestError;
use crate::request::TestRequest;

/// Runs `request` through `handler` with a default base writer.
///
/// # Panics
///
/// Panics if the request cannot be converted, which only happens for
/// requests assembled by hand with inconsistent parts.
pub fn run_request<H: Handler + ?Sized>(handler: &H, request: TestRequest) -> Recorded {
    run_request_with_options(handler, request, WriterOptions::default())
}

/// Runs `request` through `handler` with the given base writer options.
///
/// # Panics
///
/// Same as [`run_request`].
pub fn run_request_with_options<H: Handler + ?Sized>(
    handler: &H,
    request: TestRequest,
    options: WriterOptions,
) -> Recorded {
    let mut request = match request.into_request() {
        Ok(request) => request,
        Err(e) => panic!("cannot run test request: {e}"),
    };
    let mut host = BufferedHostWriter::new();
    {
        let mut writer = BaseResponseWriter::new(&mut host, options);
        handler.serve(&mut writer, &mut request);
    }
    Recorded::from_host(host)
}

/// A recorded response with assertion helpers.
///
/// Assertion methods panic with a descriptive message and return `&Self` so
/// they can be chained.
#[derive(Debug, Clone)]
pub struct Recorded {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Recorded {
    /// Captures what was written to a buffered host writer.
    #[must_use]
    pub fn from_host(host: BufferedHostWriter) -> Self {
        let response = host.into_response();
        let (parts, body) = response.into_parts();
        Self {
            status: parts.status,
            headers: parts.headers,
            body: body.to_vec(),
        }
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the headers as sent.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header as a string.
    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Asserts the status code.
    #[track_caller]
    pub fn code_is(&self, expected: u16) -> &Self {
        assert_eq!(
            self.status.as_u16(),
            expected,
            "status code: expected {expected}, got {} (body: {})",
            self.status.as_u16(),
            self.body_text()
        );
        self
    }

    /// Asserts a header value.
    #[track_caller]
    pub fn header_is(&self, name: &str, expected: &str) -> &Self {
        let actual = self.header_str(name);
        assert_eq!(actual, Some(expected), "header {name}");
        self
    }

    /// Asserts the media type is `application/json`, ignoring parameters.
    #[track_caller]
    pub fn content_type_is_json(&self) -> &Self {
        let media_type = self
            .header_str(header::CONTENT_TYPE.as_str())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase());
        assert_eq!(
            media_type.as_deref(),
            Some("application/json"),
            "Content-Type"
        );
        self
    }

    /// Asserts `Content-Encoding: gzip`.
    #[track_caller]
    pub fn content_encoding_is_gzip(&self) -> &Self {
        self.header_is(header::CONTENT_ENCODING.as_str(), "gzip")
    }

    /// Asserts the body, as text.
    #[track_caller]
    pub fn body_is(&self, expected: &str) -> &Self {
        assert_eq!(self.body_text(), expected, "body");
        self
    }

    /// Returns the body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decodes the body as JSON, gunzipping it first when needed.
    ///
    /// # Errors
    ///
    /// Fails if the body cannot be decompressed or decoded.
    pub fn decode_json_payload<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        let body = self.decompressed_body()?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Returns the body, gunzipped when `Content-Encoding: gzip` is set.
    ///
    /// # Errors
    ///
    /// Fails if the gzip stream is invalid.
    pub fn decompressed_body(&self) -> Result<Vec<u8>, TestError> {
        if self.header_str(header::CONTENT_ENCODING.as_str()) != Some("gzip") {
            return Ok(self.body.clone());
        }
        let mut out = Vec::new();
        GzDecoder::new(self.body.as_slice()).read_to_end(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrest_core::{handler_fn, Request, ResponseWriter};
    use serde_json::{json, Value};

    #[test]
    fn test_run_request_records_response() {
        let handler = handler_fn(|w: &mut dyn ResponseWriter, _r: &mut Request| {
            let _ = w.write_json(&json!({ "Id": "123" }));
        });
        let request = TestRequest::get("http://localhost/").build().unwrap();

        let recorded = run_request(&handler, request);
        recorded.code_is(200).content_type_is_json().body_is(r#"{"Id":"123"}"#);

        let payload: Value = recorded.decode_json_payload().unwrap();
        assert_eq!(payload["Id"], "123");
    }

    #[test]
    #[should_panic(expected = "status code")]
    fn test_code_is_panics_on_mismatch() {
        let handler = handler_fn(|w: &mut dyn ResponseWriter, _r: &mut Request| {
            w.write_header(StatusCode::NOT_FOUND);
        });
        let request = TestRequest::get("/").build().unwrap();
        run_request(&handler, request).code_is(200);
    }

    #[test]
    fn test_decompressed_body_plain() {
        let handler = handler_fn(|w: &mut dyn ResponseWriter, _r: &mut Request| {
            let _ = w.write(b"plain");
        });
        let recorded = run_request(&handler, TestRequest::get("/").build().unwrap());
        assert_eq!(recorded.decompressed_body().unwrap(), b"plain");
    }
}
