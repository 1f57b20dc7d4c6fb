//! The response writer chain.
//!
//! Every middleware that changes the body decorates the writer it was given
//! and passes the decorated writer down:
//!
//! ```text
//! handler ──▶ JsonpResponseWriter ──▶ GzipResponseWriter ──▶ BaseResponseWriter ──▶ host
//!              callback( … )           gzip stream           Content-Type, status
//! ```
//!
//! Decorators borrow the writer they wrap, so a chain only lives for the
//! duration of the middleware call that built it.
//!
//! Invariants shared by every writer in this module:
//!
//! - a second `write_header` is a no-op
//! - `write` before any `write_header` writes a `200` header first
//! - `flush`, `close_notify` and `hijack` are forwarded to the wrapped writer

mod base;
mod gzip;
mod indent;
mod jsonp;

pub use base::{BaseResponseWriter, WriterOptions};
pub use gzip::GzipResponseWriter;
pub use indent::IndentResponseWriter;
pub use jsonp::JsonpResponseWriter;

use std::io;

use http::{HeaderMap, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::WriteError;

/// A response writer.
///
/// The required methods are the core capability set. `flush`, `close_notify`
/// and `hijack` are optional capabilities whose defaults report them as
/// unsupported; decorators override them to forward.
pub trait ResponseWriter: Send {
    /// Response headers, editable until the header is written.
    fn headers(&mut self) -> &mut HeaderMap;

    /// Writes the status line and headers. Later calls are ignored.
    fn write_header(&mut self, status: StatusCode);

    /// Writes body bytes, writing a `200` header first if needed.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Encodes `value` the way this writer chain renders JSON.
    fn encode_json(&self, value: &Value) -> Result<Vec<u8>, WriteError>;

    /// Encodes `value` with [`encode_json`](Self::encode_json) and writes it.
    fn write_json(&mut self, value: &Value) -> Result<(), WriteError> {
        let bytes = self.encode_json(value)?;
        self.write_all(&bytes)?;
        Ok(())
    }

    /// Writes the whole buffer.
    fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf)? {
                0 => return Err(io::ErrorKind::WriteZero.into()),
                n => buf = &buf[n..],
            }
        }
        Ok(())
    }

    /// Sends buffered data to the client.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Receiver that fires when the client goes away.
    fn close_notify(&self) -> Option<CloseNotify> {
        None
    }

    /// Takes over the underlying connection.
    fn hijack(&mut self) -> Result<Box<dyn HijackedConnection>, WriteError> {
        Err(WriteError::Unsupported("hijack"))
    }
}

impl dyn ResponseWriter + '_ {
    /// Serializes any `Serialize` value and writes it as JSON.
    pub fn write_serialized<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), WriteError> {
        let value = serde_json::to_value(value)?;
        self.write_json(&value)
    }
}

/// A raw connection taken over from the host.
pub trait HijackedConnection: io::Read + io::Write + Send {}

impl<T: io::Read + io::Write + Send> HijackedConnection for T {}

/// Notifies handlers that the client disconnected.
///
/// The host keeps the paired [`CloseNotifier`]; firing it or dropping it
/// marks the connection as closed.
#[derive(Debug, Clone)]
pub struct CloseNotify {
    rx: watch::Receiver<bool>,
}

/// Host side of a [`CloseNotify`].
#[derive(Debug)]
pub struct CloseNotifier {
    tx: watch::Sender<bool>,
}

impl CloseNotify {
    /// Creates a connected notifier/receiver pair.
    #[must_use]
    pub fn channel() -> (CloseNotifier, CloseNotify) {
        let (tx, rx) = watch::channel(false);
        (CloseNotifier { tx }, CloseNotify { rx })
    }

    /// Returns true once the client is gone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Waits until the client is gone.
    pub async fn closed(&mut self) {
        let _ = self.rx.wait_for(|closed| *closed).await;
    }
}

impl CloseNotifier {
    /// Marks the connection as closed.
    pub fn notify(&self) {
        self.tx.send_replace(true);
    }
}
