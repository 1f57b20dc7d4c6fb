//! Response compression.

use flate2::Compression;
use http::header::ACCEPT_ENCODING;
use jsonrest_core::{ConfigError, GzipResponseWriter, Request, ResponseWriter};

use crate::middleware::{Middleware, Next};

/// Gzips the body when the client sends `Accept-Encoding: gzip`.
///
/// `Vary: Accept-Encoding` is sent either way. Place it inside the recorder
/// so the recorded byte count is the compressed size.
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipMiddleware {
    level: Compression,
}

impl GzipMiddleware {
    /// Creates the middleware with the default compression level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compression level, from 0 (none) to 9 (best).
    pub fn with_level(mut self, level: u32) -> Result<Self, ConfigError> {
        if level > 9 {
            return Err(ConfigError::invalid_option(
                "gzip",
                "level",
                format!("{level} is not in 0..=9"),
            ));
        }
        self.level = Compression::new(level);
        Ok(self)
    }

    /// The compression level.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level.level()
    }
}

fn accepts_gzip(request: &Request) -> bool {
    request
        .headers()
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("gzip"))
}

impl Middleware for GzipMiddleware {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn process(&self, writer: &mut dyn ResponseWriter, request: &mut Request, next: Next<'_>) {
        let mut gzip = GzipResponseWriter::new(writer, accepts_gzip(request), self.level);
        next.run(&mut gzip, request);
        if let Err(e) = gzip.finish() {
            tracing::error!(error = %e, "failed to finish gzip stream");
        }
    }
}
