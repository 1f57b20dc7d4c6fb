//! JSONP writer: wraps JSON payloads in a callback invocation.

use std::io;

use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::Value;

use super::{CloseNotify, HijackedConnection, ResponseWriter};
use crate::error::WriteError;

/// Emits `callback(<json>)` as `text/javascript`.
///
/// `X-Content-Type-Options: nosniff` and `Content-Disposition: filename=f.txt`
/// are sent with every response so browsers will not sniff the payload into
/// something else.
pub struct JsonpResponseWriter<'a> {
    inner: &'a mut dyn ResponseWriter,
    callback_name: &'a str,
    wrote_header: bool,
}

impl<'a> JsonpResponseWriter<'a> {
    /// Wraps `inner` for `callback_name`.
    pub fn new(inner: &'a mut dyn ResponseWriter, callback_name: &'a str) -> Self {
        Self {
            inner,
            callback_name,
            wrote_header: false,
        }
    }
}

impl ResponseWriter for JsonpResponseWriter<'_> {
    fn headers(&mut self) -> &mut HeaderMap {
        self.inner.headers()
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.wrote_header {
            return;
        }
        let headers = self.inner.headers();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/javascript"));
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        headers.insert(CONTENT_DISPOSITION, HeaderValue::from_static("filename=f.txt"));
        self.inner.write_header(status);
        self.wrote_header = true;
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.wrote_header {
            self.write_header(StatusCode::OK);
        }
        self.inner.write(buf)
    }

    fn encode_json(&self, value: &Value) -> Result<Vec<u8>, WriteError> {
        self.inner.encode_json(value)
    }

    fn write_json(&mut self, value: &Value) -> Result<(), WriteError> {
        let payload = self.encode_json(value)?;
        let callback = self.callback_name;
        self.write_all(callback.as_bytes())?;
        self.write_all(b"(")?;
        self.write_all(&payload)?;
        self.write_all(b")")?;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.wrote_header {
            self.write_header(StatusCode::OK);
        }
        self.inner.flush()
    }

    fn close_notify(&self) -> Option<CloseNotify> {
        self.inner.close_notify()
    }

    fn hijack(&mut self) -> Result<Box<dyn HijackedConnection>, WriteError> {
        self.inner.hijack()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::BufferedHostWriter;
    use crate::writer::{BaseResponseWriter, WriterOptions};
    use serde_json::json;

    #[test]
    fn test_jsonp_wraps_payload() {
        let mut host = BufferedHostWriter::new();
        {
            let mut base = BaseResponseWriter::new(&mut host, WriterOptions::default());
            let mut w = JsonpResponseWriter::new(&mut base, "parseResponse");
            w.write_json(&json!({ "Id": "123" })).unwrap();
        }
        assert_eq!(host.body(), br#"parseResponse({"Id":"123"})"#);
        assert_eq!(host.headers()[CONTENT_TYPE], "text/javascript");
        assert_eq!(host.headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(host.headers()[CONTENT_DISPOSITION], "filename=f.txt");
    }

    #[test]
    fn test_error_status_is_kept() {
        let mut host = BufferedHostWriter::new();
        {
            let mut base = BaseResponseWriter::new(&mut host, WriterOptions::default());
            let mut w = JsonpResponseWriter::new(&mut base, "cb");
            crate::error::write_error(&mut w, "Resource not found", StatusCode::NOT_FOUND);
        }
        assert_eq!(host.status(), StatusCode::NOT_FOUND);
        assert_eq!(host.body(), br#"cb({"Error":"Resource not found"})"#);
    }
}
