//! Apache-style access log.

use std::fmt::Write as _;

use jsonrest_core::{ConfigError, Request, ResponseWriter};
use regex::Regex;

use super::{emit, AccessLogSink};
use crate::middleware::{Middleware, Next};

const NAME: &str = "access-log-apache";

/// A log line format.
///
/// Supported directives:
///
/// | Directive | Value |
/// |---|---|
/// | `%b` | body bytes, `-` when zero |
/// | `%B` | body bytes |
/// | `%D` | response time in microseconds |
/// | `%h` | remote IP |
/// | `%H` | protocol |
/// | `%l` | always `-` |
/// | `%m` | method |
/// | `%P` | process id |
/// | `%q` | query string with its `?`, or nothing |
/// | `%r` | request line |
/// | `%s` | status |
/// | `%S` | status, coloured by class |
/// | `%t` | start time, `[02/Jan/2006:15:04:05 +0000]` |
/// | `%T` | response time in seconds |
/// | `%u` | remote user |
/// | `%{Name}i` | request header |
/// | `%%` | a literal `%` |
///
/// Any other directive is emitted as written. Missing values render as `-`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessLogFormat {
    /// `%h %l %u %t "%r" %s %b`
    Common,
    /// Common plus referer and user agent.
    Combined,
    /// Coloured terminal format used by the development stack.
    Default,
    /// A user-defined format.
    Custom(String),
}

impl AccessLogFormat {
    /// The format string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Common => r#"%h %l %u %t "%r" %s %b"#,
            Self::Combined => r#"%h %l %u %t "%r" %s %b "%{Referer}i" "%{User-Agent}i""#,
            Self::Default => {
                "%t %S\x1b[0m \x1b[36;1m%D\u{3bc}s\x1b[0m \"%r\" \x1b[1;30m%u \"%{User-Agent}i\"\x1b[0m"
            }
            Self::Custom(format) => format,
        }
    }
}

impl Default for AccessLogFormat {
    fn default() -> Self {
        Self::Default
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Directive(char),
    Header(String),
}

/// Logs one line per request in an Apache-like format.
///
/// # Example
///
/// ```
/// use jsonrest_middleware::stages::{AccessLogApacheMiddleware, AccessLogFormat};
///
/// let logger = AccessLogApacheMiddleware::new(AccessLogFormat::Combined).unwrap();
/// # let _ = logger;
/// ```
#[derive(Debug, Clone)]
pub struct AccessLogApacheMiddleware {
    format: AccessLogFormat,
    segments: Vec<Segment>,
    sink: Option<AccessLogSink>,
}

impl AccessLogApacheMiddleware {
    /// Compiles `format`.
    pub fn new(format: AccessLogFormat) -> Result<Self, ConfigError> {
        let segments = compile(format.as_str())?;
        Ok(Self {
            format,
            segments,
            sink: None,
        })
    }

    /// Writes lines to `sink` instead of `tracing`.
    #[must_use]
    pub fn with_sink(mut self, sink: AccessLogSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The configured format.
    #[must_use]
    pub fn format(&self) -> &AccessLogFormat {
        &self.format
    }

    /// Renders the line for a request that went through the pipeline.
    #[must_use]
    pub fn render(&self, request: &Request) -> String {
        let mut line = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => line.push_str(text),
                Segment::Header(name) => {
                    line.push_str(dash_if_empty(request.header_str(name.as_str()).unwrap_or("")));
                }
                Segment::Directive(directive) => render_directive(&mut line, *directive, request),
            }
        }
        line
    }
}

impl Middleware for AccessLogApacheMiddleware {
    fn name(&self) -> &'static str {
        NAME
    }

    fn process(&self, writer: &mut dyn ResponseWriter, request: &mut Request, next: Next<'_>) {
        next.run(writer, request);
        emit(self.sink.as_ref(), &self.render(request));
    }
}

fn compile(format: &str) -> Result<Vec<Segment>, ConfigError> {
    let directive = Regex::new(r"%\{([^}]+)\}i|%([a-zA-Z%])")
        .map_err(|e| ConfigError::invalid_option(NAME, "format", e.to_string()))?;

    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut last = 0;
    for captures in directive.captures_iter(format) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        literal.push_str(&format[last..whole.start()]);
        last = whole.end();

        if let Some(header) = captures.get(1) {
            flush_literal(&mut segments, &mut literal);
            segments.push(Segment::Header(header.as_str().to_string()));
            continue;
        }
        match captures.get(2).and_then(|m| m.as_str().chars().next()) {
            Some('%') => literal.push('%'),
            Some(c) if is_known_directive(c) => {
                flush_literal(&mut segments, &mut literal);
                segments.push(Segment::Directive(c));
            }
            _ => literal.push_str(whole.as_str()),
        }
    }
    literal.push_str(&format[last..]);
    flush_literal(&mut segments, &mut literal);
    Ok(segments)
}

fn flush_literal(segments: &mut Vec<Segment>, literal: &mut String) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

fn is_known_directive(c: char) -> bool {
    matches!(
        c,
        'b' | 'B' | 'D' | 'h' | 'H' | 'l' | 'm' | 'P' | 'q' | 'r' | 's' | 'S' | 't' | 'T' | 'u'
    )
}

fn render_directive(line: &mut String, directive: char, request: &Request) {
    let env = &request.env;
    // Writing into a String cannot fail.
    let _ = match directive {
        'b' => match env.bytes_written {
            Some(bytes) if bytes > 0 => write!(line, "{bytes}"),
            _ => write!(line, "-"),
        },
        'B' => write!(line, "{}", env.bytes_written.unwrap_or(0)),
        'D' => match env.elapsed_time {
            Some(elapsed) => write!(line, "{}", elapsed.as_micros()),
            None => write!(line, "-"),
        },
        'h' => match request.remote_addr() {
            Some(addr) => write!(line, "{}", addr.ip()),
            None => write!(line, "-"),
        },
        'H' => write!(line, "{:?}", request.version()),
        'l' => write!(line, "-"),
        'm' => write!(line, "{}", request.method()),
        'P' => write!(line, "{}", std::process::id()),
        'q' => match request.uri().query() {
            Some(query) if !query.is_empty() => write!(line, "?{query}"),
            _ => Ok(()),
        },
        'r' => write!(
            line,
            "{} {} {:?}",
            request.method(),
            request.request_uri(),
            request.version()
        ),
        's' => match env.status_code {
            Some(status) => write!(line, "{status}"),
            None => write!(line, "-"),
        },
        'S' => match env.status_code {
            Some(status) => write!(line, "\x1b[{}m{status}", status_colour(status)),
            None => write!(line, "-"),
        },
        't' => match env.start_time {
            Some(start) => write!(line, "[{}]", start.format("%d/%b/%Y:%H:%M:%S %z")),
            None => write!(line, "-"),
        },
        'T' => match env.elapsed_time {
            Some(elapsed) => write!(line, "{:.3}", elapsed.as_secs_f64()),
            None => write!(line, "-"),
        },
        'u' => write!(line, "{}", dash_if_empty(env.remote_user.as_deref().unwrap_or(""))),
        _ => Ok(()),
    };
}

fn status_colour(status: u16) -> &'static str {
    match status {
        500.. => "31;1",
        400..=499 => "33;1",
        _ => "32;1",
    }
}

fn dash_if_empty(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::access_log::testing::SharedBuffer;
    use chrono::{TimeZone, Utc};
    use jsonrest_test::TestRequest;
    use std::time::Duration;

    fn finished_request(uri: &str) -> Request {
        let mut request = TestRequest::get(uri)
            .header("User-Agent", "curl/8.0")
            .header("Referer", "http://example.com/")
            .remote_addr("10.1.2.3:55555".parse().unwrap())
            .build()
            .unwrap()
            .into_request()
            .unwrap();
        request.env.start_time = Some(Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap());
        request.env.elapsed_time = Some(Duration::from_millis(1250));
        request.env.status_code = Some(200);
        request.env.bytes_written = Some(12);
        request.env.remote_user = Some("admin".into());
        request
    }

    fn render(format: AccessLogFormat, request: &Request) -> String {
        AccessLogApacheMiddleware::new(format).unwrap().render(request)
    }

    #[test]
    fn test_common_format() {
        let request = finished_request("/users/123?x=1");
        assert_eq!(
            render(AccessLogFormat::Common, &request),
            r#"10.1.2.3 - admin [09/Mar/2024:14:05:07 +0000] "GET /users/123?x=1 HTTP/1.1" 200 12"#
        );
    }

    #[test]
    fn test_combined_format_appends_headers() {
        let request = finished_request("/");
        let line = render(AccessLogFormat::Combined, &request);
        assert!(line.ends_with(r#" 200 12 "http://example.com/" "curl/8.0""#), "{line}");
    }

    #[test]
    fn test_individual_directives() {
        let request = finished_request("/a?b=c");
        let format = AccessLogFormat::Custom("%m|%q|%D|%T|%B|%H|%l|%s".into());
        assert_eq!(render(format, &request), "GET|?b=c|1250000|1.250|12|HTTP/1.1|-|200");
    }

    #[test]
    fn test_missing_values_render_as_dash() {
        let request = TestRequest::get("/").build().unwrap().into_request().unwrap();
        let format = AccessLogFormat::Custom("%h %u %s %b %t %D %{X-Missing}i%q".into());
        assert_eq!(render(format, &request), "- - - - - - -");
    }

    #[test]
    fn test_unknown_directive_and_percent() {
        let request = finished_request("/");
        let format = AccessLogFormat::Custom("%z 100%% %{Host}x".into());
        assert_eq!(render(format, &request), "%z 100% %{Host}x");
    }

    #[test]
    fn test_status_colours() {
        let mut request = finished_request("/");
        let format = AccessLogFormat::Custom("%S".into());
        assert_eq!(render(format.clone(), &request), "\x1b[32;1m200");
        request.env.status_code = Some(301);
        assert_eq!(render(format.clone(), &request), "\x1b[32;1m301");
        request.env.status_code = Some(404);
        assert_eq!(render(format.clone(), &request), "\x1b[33;1m404");
        request.env.status_code = Some(503);
        assert_eq!(render(format, &request), "\x1b[31;1m503");
    }

    #[test]
    fn test_logs_to_sink_after_request() {
        use crate::pipeline::Api;
        use crate::stages::{RecorderMiddleware, TimerMiddleware};
        use jsonrest_core::handler_fn;
        use jsonrest_test::run_request;

        let buffer = SharedBuffer::default();
        let logger = AccessLogApacheMiddleware::new(AccessLogFormat::Custom("%m %r %s %b".into()))
            .unwrap()
            .with_sink(buffer.sink());

        let mut api = Api::new();
        api.use_middleware(logger)
            .use_middleware(TimerMiddleware::new())
            .use_middleware(RecorderMiddleware::new())
            .set_app(handler_fn(|w, _r| {
                let _ = w.write_json(&serde_json::json!({ "Id": "123" }));
            }));
        run_request(&api.make_handler(), TestRequest::get("/users/123").build().unwrap());

        assert_eq!(buffer.lines(), vec!["GET GET /users/123 HTTP/1.1 200 12"]);
    }
}
