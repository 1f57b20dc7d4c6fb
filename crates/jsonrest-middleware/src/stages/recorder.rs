//! Status code and byte count recording.

use std::io;

use http::{HeaderMap, StatusCode};
use jsonrest_core::{CloseNotify, HijackedConnection, Request, ResponseWriter, WriteError};
use serde_json::Value;

use crate::middleware::{Middleware, Next};

/// Records the response status in `env.status_code` and the number of body
/// bytes in `env.bytes_written`.
///
/// Place it inside the timer and outside gzip: the recorded byte count is
/// then the compressed size.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecorderMiddleware;

impl RecorderMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for RecorderMiddleware {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn process(&self, writer: &mut dyn ResponseWriter, request: &mut Request, next: Next<'_>) {
        let mut recorder = RecorderResponseWriter::new(writer);
        next.run(&mut recorder, request);

        request.env.status_code = Some(recorder.status_code().as_u16());
        request.env.bytes_written = Some(recorder.bytes_written());
    }
}

/// Writer decorator that remembers the status and counts body bytes.
pub struct RecorderResponseWriter<'a> {
    inner: &'a mut dyn ResponseWriter,
    status: Option<StatusCode>,
    bytes_written: u64,
}

impl<'a> RecorderResponseWriter<'a> {
    /// Wraps `inner`.
    pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self {
            inner,
            status: None,
            bytes_written: 0,
        }
    }

    /// The status written, `200` if nothing was written.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Body bytes accepted by the inner writer.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

impl ResponseWriter for RecorderResponseWriter<'_> {
    fn headers(&mut self) -> &mut HeaderMap {
        self.inner.headers()
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.status.is_some() {
            return;
        }
        self.inner.write_header(status);
        self.status = Some(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.write_header(StatusCode::OK);
        }
        let written = self.inner.write(buf)?;
        self.bytes_written += written as u64;
        Ok(written)
    }

    fn encode_json(&self, value: &Value) -> Result<Vec<u8>, WriteError> {
        self.inner.encode_json(value)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.status.is_none() {
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
