//! The request object seen by middlewares and handlers.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::{header, HeaderMap, Method, Uri, Version};
use serde::de::DeserializeOwned;
use url::Url;

use crate::env::Env;
use crate::error::PayloadError;

/// CORS request header names.
pub mod cors_headers {
    /// `Origin` header.
    pub const ORIGIN: &str = "origin";
    /// `Access-Control-Request-Method` header (preflight).
    pub const REQUEST_METHOD: &str = "access-control-request-method";
    /// `Access-Control-Request-Headers` header (preflight).
    pub const REQUEST_HEADERS: &str = "access-control-request-headers";
}

/// A host request plus the per-request data added by the pipeline.
///
/// Created by the pipeline adapter with an empty [`Env`] and no path params;
/// the router fills `path_params` once a route is chosen.
#[derive(Debug)]
pub struct Request {
    inner: http::Request<Bytes>,
    remote_addr: Option<SocketAddr>,

    /// Raw (still percent-encoded) path parameters captured by the router.
    pub path_params: HashMap<String, String>,

    /// Per-request environment.
    pub env: Env,
}

impl Request {
    /// Wraps a host request.
    #[must_use]
    pub fn new(inner: http::Request<Bytes>) -> Self {
        Self {
            inner,
            remote_addr: None,
            path_params: HashMap::new(),
            env: Env::new(),
        }
    }

    /// Sets the peer address.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: Option<SocketAddr>) -> Self {
        self.remote_addr = addr;
        self
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// The request URI as received.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// The protocol version.
    #[must_use]
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// The request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Mutable access to the request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    /// Gets a header value as a string, if present and visible ASCII.
    #[must_use]
    pub fn header_str(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.inner.headers().get(name).and_then(|v| v.to_str().ok())
    }

    /// The buffered request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        self.inner.body()
    }

    /// The peer address, when the host knows it.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// The `Host` header, falling back to the URI authority.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.header_str(header::HOST)
            .or_else(|| self.inner.uri().authority().map(http::uri::Authority::as_str))
    }

    /// Path and query as sent on the request line.
    #[must_use]
    pub fn request_uri(&self) -> &str {
        self.inner
            .uri()
            .path_and_query()
            .map_or("/", http::uri::PathAndQuery::as_str)
    }

    /// Declared body length, or the buffered length when undeclared.
    #[must_use]
    pub fn content_length(&self) -> u64 {
        self.header_str(header::CONTENT_LENGTH)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(self.inner.body().len() as u64)
    }

    /// Returns a path parameter, percent-decoded.
    ///
    /// Decoding follows query-unescape rules, so `+` becomes a space. Missing
    /// parameters and undecodable values yield the empty string.
    #[must_use]
    pub fn path_param(&self, name: &str) -> String {
        self.path_params
            .get(name)
            .map(|raw| query_unescape(raw))
            .unwrap_or_default()
    }

    /// Returns the first query-string value for `name`.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.inner.uri().query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Decodes the JSON body into `T`.
    pub fn decode_json_payload<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        let body = self.inner.body();
        if body.is_empty() {
            return Err(PayloadError::Empty);
        }
        Ok(serde_json::from_slice(body)?)
    }

    /// Scheme and host of this service as seen by the client.
    ///
    /// The scheme comes from the request URI, then `X-Forwarded-Proto`, and
    /// defaults to `http`.
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        let scheme = self
            .inner
            .uri()
            .scheme_str()
            .or_else(|| self.header_str("x-forwarded-proto"))
            .unwrap_or("http");
        let host = self.host().unwrap_or_default().trim_end_matches('/');
        Url::parse(&format!("{scheme}://{host}"))
    }

    /// Builds an absolute URL for `path` on this service.
    pub fn url_for(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, url::ParseError> {
        let mut url = self.base_url()?;
        url.set_path(path);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Derives the CORS view of this request.
    #[must_use]
    pub fn cors_info(&self) -> CorsInfo {
        let origin = self
            .header_str(cors_headers::ORIGIN)
            .unwrap_or_default()
            .to_string();

        let (is_cors, origin_url) = match origin.as_str() {
            "" => (false, None),
            "null" => (true, None),
            other => match Url::parse(other) {
                Ok(url) => {
                    let origin_host = host_with_port(&url);
                    (self.host() != Some(origin_host.as_str()), Some(url))
                }
                Err(_) => (false, None),
            },
        };

        let access_control_request_method = self
            .header_str(cors_headers::REQUEST_METHOD)
            .unwrap_or_default()
            .to_ascii_uppercase();

        let access_control_request_headers = self
            .headers()
            .get_all(cors_headers::REQUEST_HEADERS)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|raw| raw.split(','))
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(canonical_header_key)
            .collect();

        let is_preflight = is_cors
            && self.inner.method() == Method::OPTIONS
            && !access_control_request_method.is_empty();

        CorsInfo {
            is_cors,
            is_preflight,
            origin,
            origin_url,
            access_control_request_method,
            access_control_request_headers,
        }
    }
}

/// CORS-related facts about a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsInfo {
    /// The request carries an `Origin` different from its own host.
    pub is_cors: bool,
    /// CORS `OPTIONS` request with `Access-Control-Request-Method`.
    pub is_preflight: bool,
    /// Raw `Origin` header.
    pub origin: String,
    /// Parsed origin, absent for `null` or unparsable origins.
    pub origin_url: Option<Url>,
    /// Upper-cased `Access-Control-Request-Method`.
    pub access_control_request_method: String,
    /// Canonicalized `Access-Control-Request-Headers` entries.
    pub access_control_request_headers: Vec<String>,
}

fn host_with_port(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Percent-decodes a query component, mapping `+` to a space.
#[must_use]
pub fn query_unescape(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default()
}

/// Canonical MIME header form: `content-type` becomes `Content-Type`.
///
/// Keys containing a space or other non-token byte are returned unchanged.
#[must_use]
pub fn canonical_header_key(key: &str) -> String {
    let is_token = key
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));
    if !is_token {
        return key.to_string();
    }

    let mut upper = true;
    key.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}
