//! Test request building.

use std::net::SocketAddr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use jsonrest_core::Request;
use serde::Serialize;
use serde_json::Value;

use crate::error::TestError;

/// A request ready to be run against a handler.
#[derive(Debug)]
pub struct TestRequest {
    /// HTTP method
    pub method: Method,
    /// Request URI, absolute or origin-form
    pub uri: Uri,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Bytes,
    /// Peer address seen by the handler
    pub remote_addr: Option<SocketAddr>,
}

impl TestRequest {
    /// Creates a new GET request.
    pub fn get(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::GET, uri)
    }

    /// Creates a new POST request.
    pub fn post(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::POST, uri)
    }

    /// Creates a new PUT request.
    pub fn put(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PUT, uri)
    }

    /// Creates a new PATCH request.
    pub fn patch(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PATCH, uri)
    }

    /// Creates a new DELETE request.
    pub fn delete(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::DELETE, uri)
    }

    /// Creates a new OPTIONS request.
    pub fn options(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::OPTIONS, uri)
    }

    /// Creates a new HEAD request.
    pub fn head(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::HEAD, uri)
    }

    /// Converts this request to the host request type.
    ///
    /// # Errors
    ///
    /// Fails if the parts do not form a valid request.
    pub fn into_http_request(self) -> Result<http::Request<Bytes>, TestError> {
        let mut request = http::Request::builder()
            .method(self.method)
            .uri(self.uri)
            .body(self.body)
            .map_err(|e| TestError::RequestBuild(e.to_string()))?;
        *request.headers_mut() = self.headers;
        Ok(request)
    }

    /// Converts this request to the pipeline request type.
    ///
    /// # Errors
    ///
    /// Same as [`into_http_request`](Self::into_http_request).
    pub fn into_request(self) -> Result<Request, TestError> {
        let remote_addr = self.remote_addr;
        Ok(Request::new(self.into_http_request()?).with_remote_addr(remote_addr))
    }
}

/// Builder for constructing test requests.
///
/// Header errors are kept until [`build`](Self::build).
#[must_use]
#[derive(Debug)]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Option<Bytes>,
    remote_addr: Option<SocketAddr>,
    error: Option<TestError>,
}

impl TestRequestBuilder {
    /// Creates a new request builder.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            headers: HeaderMap::new(),
            body: None,
            remote_addr: None,
            error: None,
        }
    }

    /// Sets a header on the request, replacing any previous value.
    ///
    /// # Example
    ///
    /// ```
    /// use jsonrest_test::TestRequest;
    ///
    /// let request = TestRequest::get("http://localhost/users")
    ///     .header("Accept-Encoding", "gzip")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(request.headers["accept-encoding"], "gzip");
    /// ```
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = match HeaderName::try_from(name.as_ref()) {
            Ok(name) => name,
            Err(e) => return self.fail(TestError::InvalidHeader(e.to_string())),
        };
        match HeaderValue::try_from(value.as_ref()) {
            Ok(value) => {
                self.headers.insert(name, value);
                self
            }
            Err(e) => self.fail(TestError::InvalidHeader(e.to_string())),
        }
    }

    /// Sets the Content-Type header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Sets the Authorization header with Basic credentials.
    pub fn basic_auth(self, user: &str, password: &str) -> Self {
        let token = STANDARD.encode(format!("{user}:{password}"));
        self.header(header::AUTHORIZATION.as_str(), format!("Basic {token}"))
    }

    /// Sets the Authorization header with a Bearer token.
    pub fn bearer_token(self, token: impl AsRef<str>) -> Self {
        self.header(header::AUTHORIZATION.as_str(), format!("Bearer {}", token.as_ref()))
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the request body as JSON.
    ///
    /// This also sets `Content-Type: application/json`.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.body = Some(Bytes::from(bytes));
                self.content_type("application/json")
            }
            Err(e) => self.fail(TestError::Json(e)),
        }
    }

    /// Sets the peer address.
    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Builds the test request.
    ///
    /// A `Host` header is derived from absolute URIs.
    ///
    /// # Errors
    ///
    /// Returns the first header or body error, or an invalid URI error.
    pub fn build(mut self) -> Result<TestRequest, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let uri: Uri = self
            .uri
            .parse()
            .map_err(|e| TestError::RequestBuild(format!("invalid URI: {e}")))?;

        if !self.headers.contains_key(header::HOST) {
            if let Some(authority) = uri.authority() {
                let host = HeaderValue::from_str(authority.as_str())
                    .map_err(|e| TestError::InvalidHeader(e.to_string()))?;
                self.headers.insert(header::HOST, host);
            }
        }

        Ok(TestRequest {
            method: self.method,
            uri,
            headers: self.headers,
            body: self.body.unwrap_or_default(),
            remote_addr: self.remote_addr,
        })
    }

    fn fail(mut self, error: TestError) -> Self {
        self.error.get_or_insert(error);
        self
    }
}

/// Builds a request the way most tests need it.
///
/// `Accept-Encoding: gzip` is always set. With a payload, the body is its
/// JSON encoding and `Content-Type` is `application/json`.
///
/// # Errors
///
/// Fails on an invalid method or URL.
pub fn make_simple_request(
    method: &str,
    url: &str,
    payload: Option<&Value>,
) -> Result<TestRequest, TestError> {
    let method =
        Method::from_bytes(method.as_bytes()).map_err(|e| TestError::RequestBuild(e.to_string()))?;
    let mut builder = TestRequestBuilder::new(method, url).header("Accept-Encoding", "gzip");
    if let Some(payload) = payload {
        builder = builder.json(payload);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_request_with_payload() {
        let request =
            make_simple_request("POST", "http://1.2.3.4/users", Some(&json!({ "Name": "a" })))
                .unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.headers["accept-encoding"], "gzip");
        assert_eq!(request.headers["content-type"], "application/json");
        assert_eq!(request.headers["host"], "1.2.3.4");
        assert_eq!(request.body, Bytes::from_static(br#"{"Name":"a"}"#));
    }

    #[test]
    fn test_basic_auth_header() {
        let request = TestRequest::get("/").basic_auth("admin", "admin").build().unwrap();
        assert_eq!(request.headers["authorization"], "Basic YWRtaW46YWRtaW4=");
    }

    #[test]
    fn test_invalid_header_surfaces_at_build() {
        let result = TestRequest::get("/").header("bad header", "x").build();
        assert!(matches!(result, Err(TestError::InvalidHeader(_))));
    }

    #[test]
    fn test_into_request_keeps_remote_addr() {
        let addr: SocketAddr = "10.0.0.1:4242".parse().unwrap();
        let request = TestRequest::get("/x")
            .remote_addr(addr)
            .build()
            .unwrap()
            .into_request()
            .unwrap();
        assert_eq!(request.remote_addr(), Some(addr));
        assert_eq!(request.uri().path(), "/x");
    }
}
