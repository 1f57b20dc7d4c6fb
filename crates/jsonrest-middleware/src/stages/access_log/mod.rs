//! Access logging.
//!
//! Two access loggers share the same output plumbing:
//!
//! - [`AccessLogApacheMiddleware`] renders a mod_log_config-like format
//! - [`AccessLogJsonMiddleware`] emits one JSON object per request
//!
//! Both read the values the timer, recorder and auth middlewares left in
//! the env, so they must sit outside of them. Lines go to an
//! [`AccessLogSink`] when one is configured, otherwise they are emitted as
//! `tracing` events on the `jsonrest::access` target.

mod apache;
mod json;

pub use apache::{AccessLogApacheMiddleware, AccessLogFormat};
pub use json::{AccessLogJsonMiddleware, AccessLogRecord};

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

/// Target of the `tracing` events emitted when no sink is configured.
pub const ACCESS_LOG_TARGET: &str = "jsonrest::access";

/// A shared line-oriented output.
///
/// Cloning shares the underlying writer. Each line is written and flushed
/// while holding the lock, so lines from parallel requests never interleave.
#[derive(Clone)]
pub struct AccessLogSink {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl AccessLogSink {
    /// Wraps any writer.
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(out))),
        }
    }

    /// A sink writing to standard error.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Writes `line` followed by a newline.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut out = self.out.lock();
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()
    }
}

impl fmt::Debug for AccessLogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessLogSink").finish_non_exhaustive()
    }
}

/// Sends a finished line to the sink, or to `tracing`.
pub(crate) fn emit(sink: Option<&AccessLogSink>, line: &str) {
    match sink {
        Some(sink) => {
            if let Err(e) = sink.write_line(line) {
                tracing::error!(error = %e, "failed to write access log line");
            }
        }
        None => tracing::info!(target: ACCESS_LOG_TARGET, "{line}"),
    }
}
