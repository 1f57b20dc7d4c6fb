//! Streaming gzip writer.

use std::io::{self, Write};

use flate2::write::GzEncoder;
use flate2::Compression;
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, VARY};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::Value;

use super::{CloseNotify, HijackedConnection, ResponseWriter};
use crate::error::WriteError;

/// Compresses the body when the client accepts gzip.
///
/// The `Vary: Accept-Encoding` header is always added. When `can_gzip` is
/// set, `Content-Encoding: gzip` is added too and bytes are streamed through
/// a gzip encoder created on first write. Call [`finish`](Self::finish) to
/// emit the gzip trailer; dropping the writer finishes it as well.
pub struct GzipResponseWriter<'a> {
    inner: &'a mut dyn ResponseWriter,
    can_gzip: bool,
    level: Compression,
    encoder: Option<GzEncoder<Vec<u8>>>,
    wrote_header: bool,
}

impl<'a> GzipResponseWriter<'a> {
    /// Wraps `inner`.
    pub fn new(inner: &'a mut dyn ResponseWriter, can_gzip: bool, level: Compression) -> Self {
        Self {
            inner,
            can_gzip,
            level,
            encoder: None,
            wrote_header: false,
        }
    }

    /// Whether the body is being compressed.
    #[must_use]
    pub fn can_gzip(&self) -> bool {
        self.can_gzip
    }

    /// Completes the gzip stream and writes its trailer.
    pub fn finish(mut self) -> io::Result<()> {
        self.finish_stream()
    }

    fn finish_stream(&mut self) -> io::Result<()> {
        match self.encoder.take() {
            Some(encoder) => {
                let rest = encoder.finish()?;
                self.inner.write_all(&rest)
            }
            None => Ok(()),
        }
    }

    /// Moves compressed bytes from the encoder buffer to the inner writer.
    fn drain(&mut self) -> io::Result<()> {
        if let Some(encoder) = self.encoder.as_mut() {
            let pending = std::mem::take(encoder.get_mut());
            if !pending.is_empty() {
                self.inner.write_all(&pending)?;
            }
        }
        Ok(())
    }
}

impl ResponseWriter for GzipResponseWriter<'_> {
    fn headers(&mut self) -> &mut HeaderMap {
        self.inner.headers()
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.wrote_header {
            return;
        }
        let headers = self.inner.headers();
        headers.append(VARY, HeaderValue::from_static("Accept-Encoding"));
        if self.can_gzip {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            headers.remove(CONTENT_LENGTH);
        }
        self.inner.write_header(status);
        self.wrote_header = true;
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.wrote_header {
            self.write_header(StatusCode::OK);
        }
        if !self.can_gzip {
            return self.inner.write(buf);
        }
        let level = self.level;
        self.encoder
            .get_or_insert_with(|| GzEncoder::new(Vec::new(), level))
            .write_all(buf)?;
        self.drain()?;
        Ok(buf.len())
    }

    fn encode_json(&self, value: &Value) -> Result<Vec<u8>, WriteError> {
        self.inner.encode_json(value)
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.wrote_header {
            self.write_header(StatusCode::OK);
        }
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.flush()?;
        }
        self.drain()?;
        self.inner.flush()
    }

    fn close_notify(&self) -> Option<CloseNotify> {
        self.inner.close_notify()
    }

    fn hijack(&mut self) -> Result<Box<dyn HijackedConnection>, WriteError> {
        self.inner.hijack()
    }
}

impl Drop for GzipResponseWriter<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.finish_stream() {
            tracing::error!(error = %e, "failed to finish gzip stream");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::BufferedHostWriter;
    use crate::writer::{BaseResponseWriter, WriterOptions};
    use flate2::read::GzDecoder;
    use serde_json::json;
    use std::io::Read;

    fn gunzip(bytes: &[u8]) -> String {
        let mut out = String::new();
        GzDecoder::new(bytes).read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_gzip_body_decompresses() {
        let mut host = BufferedHostWriter::new();
        {
            let mut base = BaseResponseWriter::new(&mut host, WriterOptions::default());
            let mut w = GzipResponseWriter::new(&mut base, true, Compression::default());
            w.write_json(&json!({ "Id": "123" })).unwrap();
            w.finish().unwrap();
        }
        assert_eq!(host.headers()[VARY], "Accept-Encoding");
        assert_eq!(host.headers()[CONTENT_ENCODING], "gzip");
        assert_eq!(gunzip(host.body()), r#"{"Id":"123"}"#);
    }

    #[test]
    fn test_no_gzip_still_varies() {
        let mut host = BufferedHostWriter::new();
        {
            let mut base = BaseResponseWriter::new(&mut host, WriterOptions::default());
            let mut w = GzipResponseWriter::new(&mut base, false, Compression::default());
            w.write_json(&json!({ "Id": "123" })).unwrap();
        }
        assert_eq!(host.headers()[VARY], "Accept-Encoding");
        assert!(!host.headers().contains_key(CONTENT_ENCODING));
        assert_eq!(host.body(), br#"{"Id":"123"}"#);
    }

    #[test]
    fn test_drop_finishes_stream() {
        let mut host = BufferedHostWriter::new();
        {
            let mut base = BaseResponseWriter::new(&mut host, WriterOptions::default());
            let mut w = GzipResponseWriter::new(&mut base, true, Compression::fast());
            w.write(b"part one, ").unwrap();
            w.flush().unwrap();
            w.write(b"part two").unwrap();
        }
        assert_eq!(host.flushes(), 1);
        assert_eq!(gunzip(host.body()), "part one, part two");
    }
}
