//! Path pattern validation and escaping.
//!
//! Patterns and request paths go through the same percent-encoding before
//! touching the trie, so `/caf%C3%A9` and `/café` meet on the same key.
//! Segments are encoded as they are: `.` and `..` are never resolved, so the
//! router sees the path the client sent.

use jsonrest_core::ConfigError;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Bytes escaped in a path. `%` stays as is so escaped input is not escaped
/// twice; `#` stays as is because it marks relaxed placeholders.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Checks `pattern` and returns its escaped form.
///
/// # Errors
///
/// Returns a [`ConfigError`] for an empty pattern, a pattern without a
/// leading `/`, a pattern carrying a query string, or one with a malformed
/// percent escape.
pub fn escape_pattern(pattern: &str) -> Result<String, ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::EmptyPattern);
    }
    if !pattern.starts_with('/') {
        return Err(ConfigError::MissingLeadingSlash(pattern.to_string()));
    }
    if pattern.contains('?') {
        return Err(ConfigError::QueryInPattern(pattern.to_string()));
    }
    if let Some(at) = malformed_escape(pattern) {
        return Err(ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: format!("malformed percent escape at byte {at}"),
        });
    }

    Ok(escape_path(pattern))
}

/// Percent-encodes a request path the way patterns are encoded.
pub fn escape_path(path: &str) -> String {
    utf8_percent_encode(path, PATH).to_string()
}

fn malformed_escape(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    bytes.iter().enumerate().find_map(|(i, &b)| {
        let valid = b != b'%'
            || (bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit));
        (!valid).then_some(i)
    })
}
