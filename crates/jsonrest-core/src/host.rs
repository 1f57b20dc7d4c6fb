//! The interface a host HTTP stack provides to the pipeline.
//!
//! A host hands the pipeline an [`http::Request`] with a buffered body and a
//! [`HostResponseWriter`]. [`BufferedHostWriter`] is an in-memory host writer
//! used by the test helpers and by the hyper adapter.

use std::io;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use crate::error::WriteError;
use crate::writer::{CloseNotifier, CloseNotify, HijackedConnection};

/// The raw response handle of a host HTTP stack.
pub trait HostResponseWriter: Send {
    /// Response headers, sent with the status line.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Sends the status line and headers.
    fn write_header(&mut self, status: StatusCode);

    /// Sends body bytes.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Pushes buffered bytes to the client.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Receiver that fires when the client goes away.
    fn close_notify(&self) -> Option<CloseNotify> {
        None
    }

    /// Takes over the connection.
    fn hijack(&mut self) -> Result<Box<dyn HijackedConnection>, WriteError> {
        Err(WriteError::Unsupported("hijack"))
    }
}

/// A host writer that keeps the whole response in memory.
///
/// Like a real HTTP stack, headers are frozen when the status is written;
/// later header edits are not part of the response.
#[derive(Debug)]
pub struct BufferedHostWriter {
    headers: HeaderMap,
    sent_headers: Option<HeaderMap>,
    status: Option<StatusCode>,
    body: Vec<u8>,
    header_writes: usize,
    flushes: usize,
    close: CloseNotify,
    notifier: Option<CloseNotifier>,
}

impl Default for BufferedHostWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferedHostWriter {
    /// Creates an empty writer with its own close notification channel.
    #[must_use]
    pub fn new() -> Self {
        let (notifier, close) = CloseNotify::channel();
        Self {
            headers: HeaderMap::new(),
            sent_headers: None,
            status: None,
            body: Vec::new(),
            header_writes: 0,
            flushes: 0,
            close,
            notifier: Some(notifier),
        }
    }

    /// Creates an empty writer whose close notification is driven elsewhere.
    #[must_use]
    pub fn with_close_notify(close: CloseNotify) -> Self {
        Self {
            close,
            notifier: None,
            ..Self::new()
        }
    }

    /// Simulates a client disconnect.
    pub fn notify_closed(&self) {
        if let Some(notifier) = &self.notifier {
            notifier.notify();
        }
    }

    /// The response status; `200` if the handler wrote nothing.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Headers as sent with the status line.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.sent_headers.as_ref().unwrap_or(&self.headers)
    }

    /// The body bytes written so far.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// How many times a header write reached this host.
    #[must_use]
    pub fn header_writes(&self) -> usize {
        self.header_writes
    }

    /// How many flushes reached this host.
    #[must_use]
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Converts the buffered response into an [`http::Response`].
    #[must_use]
    pub fn into_response(self) -> http::Response<Bytes> {
        let status = self.status();
        let headers = self.sent_headers.unwrap_or(self.headers);
        let mut response = http::Response::new(Bytes::from(self.body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

impl HostResponseWriter for BufferedHostWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        self.header_writes += 1;
        if self.status.is_some() {
            tracing::warn!(status = status.as_u16(), "superfluous write_header call");
            return;
        }
        self.status = Some(status);
        self.sent_headers = Some(self.headers.clone());
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.write_header(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }

    fn close_notify(&self) -> Option<CloseNotify> {
        Some(self.close.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;
    use http::HeaderValue;

    #[test]
    fn test_write_implies_ok() {
        let mut host = BufferedHostWriter::new();
        host.write(b"hello").unwrap();
        assert_eq!(host.status(), StatusCode::OK);
        assert_eq!(host.body(), b"hello");
        assert_eq!(host.header_writes(), 1);
    }

    #[test]
    fn test_headers_frozen_at_write_header() {
        let mut host = BufferedHostWriter::new();
        host.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        host.write_header(StatusCode::CREATED);
        host.headers_mut()
            .insert("x-late", HeaderValue::from_static("1"));
        host.write_header(StatusCode::ACCEPTED);

        let response = host.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().contains_key(CONTENT_TYPE));
        assert!(!response.headers().contains_key("x-late"));
    }

    #[test]
    fn test_close_notify() {
        let host = BufferedHostWriter::new();
        let notify = host.close_notify().unwrap();
        assert!(!notify.is_closed());
        host.notify_closed();
        assert!(notify.is_closed());
    }
}
