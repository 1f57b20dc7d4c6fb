//! The writer at the bottom of every chain.

use std::io;

use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::Value;

use super::{CloseNotify, HijackedConnection, ResponseWriter};
use crate::error::WriteError;
use crate::host::HostResponseWriter;

/// Header carrying the framework name.
pub(crate) const X_POWERED_BY: &str = "x-powered-by";

/// Options applied by [`BaseResponseWriter`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterOptions {
    /// Pretty-print JSON with two-space indentation.
    pub indent: bool,

    /// Value of the `X-Powered-By` header, if any.
    pub powered_by: Option<String>,
}

/// Adapts a [`HostResponseWriter`] into a JSON [`ResponseWriter`].
pub struct BaseResponseWriter<'a> {
    host: &'a mut dyn HostResponseWriter,
    options: WriterOptions,
    wrote_header: bool,
}

impl<'a> BaseResponseWriter<'a> {
    /// Wraps `host`.
    pub fn new(host: &'a mut dyn HostResponseWriter, options: WriterOptions) -> Self {
        Self {
            host,
            options,
            wrote_header: false,
        }
    }

    /// Returns true once the header has been written.
    #[must_use]
    pub fn wrote_header(&self) -> bool {
        self.wrote_header
    }
}

impl ResponseWriter for BaseResponseWriter<'_> {
    fn headers(&mut self) -> &mut HeaderMap {
        self.host.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.wrote_header {
            return;
        }
        let headers = self.host.headers_mut();
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        if let Some(powered_by) = &self.options.powered_by {
            match HeaderValue::from_str(powered_by) {
                Ok(value) => {
                    headers.insert(X_POWERED_BY, value);
                }
                Err(_) => tracing::warn!(powered_by = %powered_by, "invalid X-Powered-By value"),
            }
        }
        self.host.write_header(status);
        self.wrote_header = true;
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.wrote_header {
            self.write_header(StatusCode::OK);
        }
        self.host.write(buf)
    }

    fn encode_json(&self, value: &Value) -> Result<Vec<u8>, WriteError> {
        let bytes = if self.options.indent {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.wrote_header {
            self.write_header(StatusCode::OK);
        }
        self.host.flush()
    }

    fn close_notify(&self) -> Option<CloseNotify> {
        self.host.close_notify()
    }

    fn hijack(&mut self) -> Result<Box<dyn HijackedConnection>, WriteError> {
        self.host.hijack()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::BufferedHostWriter;
    use serde_json::json;

    #[test]
    fn test_write_json_sets_content_type() {
        let mut host = BufferedHostWriter::new();
        {
            let mut w = BaseResponseWriter::new(&mut host, WriterOptions::default());
            w.write_json(&json!({ "Id": "123" })).unwrap();
        }
        assert_eq!(host.status(), StatusCode::OK);
        assert_eq!(host.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(host.body(), br#"{"Id":"123"}"#);
    }

    #[test]
    fn test_second_write_header_is_ignored() {
        let mut host = BufferedHostWriter::new();
        {
            let mut w = BaseResponseWriter::new(&mut host, WriterOptions::default());
            w.write_header(StatusCode::CREATED);
            w.write_header(StatusCode::INTERNAL_SERVER_ERROR);
            w.write(b"{}").unwrap();
        }
        assert_eq!(host.status(), StatusCode::CREATED);
        assert_eq!(host.header_writes(), 1);
    }

    #[test]
    fn test_indent_and_powered_by() {
        let mut host = BufferedHostWriter::new();
        let options = WriterOptions {
            indent: true,
            powered_by: Some("jsonrest".into()),
        };
        {
            let mut w = BaseResponseWriter::new(&mut host, options);
            w.write_json(&json!({ "Id": "123" })).unwrap();
        }
        assert_eq!(host.headers()[X_POWERED_BY], "jsonrest");
        assert_eq!(host.body(), b"{\n  \"Id\": \"123\"\n}");
    }

    #[test]
    fn test_existing_content_type_is_kept() {
        let mut host = BufferedHostWriter::new();
        {
            let mut w = BaseResponseWriter::new(&mut host, WriterOptions::default());
            w.headers()
                .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
            w.write(b"hi").unwrap();
        }
        assert_eq!(host.headers()[CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn test_flush_writes_header_and_forwards() {
        let mut host = BufferedHostWriter::new();
        {
            let mut w = BaseResponseWriter::new(&mut host, WriterOptions::default());
            w.flush().unwrap();
            assert!(w.close_notify().is_some());
            assert!(matches!(w.hijack(), Err(WriteError::Unsupported("hijack"))));
        }
        assert_eq!(host.flushes(), 1);
        assert_eq!(host.header_writes(), 1);
    }
}
