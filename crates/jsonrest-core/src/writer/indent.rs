//! Pretty-printing writer used by the JSON indent middleware.

use std::io;

use http::{HeaderMap, StatusCode};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

use super::{CloseNotify, HijackedConnection, ResponseWriter};
use crate::error::WriteError;

/// Renders JSON with a configurable prefix and indentation.
pub struct IndentResponseWriter<'a> {
    inner: &'a mut dyn ResponseWriter,
    prefix: &'a str,
    indent: &'a str,
    wrote_header: bool,
}

impl<'a> IndentResponseWriter<'a> {
    /// Wraps `inner`. `prefix` starts every line after the first.
    pub fn new(inner: &'a mut dyn ResponseWriter, prefix: &'a str, indent: &'a str) -> Self {
        Self {
            inner,
            prefix,
            indent,
            wrote_header: false,
        }
    }
}

impl ResponseWriter for IndentResponseWriter<'_> {
    fn headers(&mut self) -> &mut HeaderMap {
        self.inner.headers()
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.wrote_header {
            return;
        }
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
        let mut out = Vec::new();
        let formatter = PrettyFormatter::with_indent(self.indent.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        value.serialize(&mut serializer)?;

        if self.prefix.is_empty() {
            return Ok(out);
        }
        let mut prefixed = Vec::with_capacity(out.len());
        for byte in out {
            prefixed.push(byte);
            if byte == b'\n' {
                prefixed.extend_from_slice(self.prefix.as_bytes());
            }
        }
        Ok(prefixed)
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
