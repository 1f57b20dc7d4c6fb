//! JSON access log.

use chrono::{DateTime, Utc};
use jsonrest_core::{Request, ResponseWriter};
use serde::{Deserialize, Serialize};

use super::{emit, AccessLogSink};
use crate::middleware::{Middleware, Next};

/// One access log entry.
///
/// `ResponseTime` is in nanoseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessLogRecord {
    /// When the request entered the timer.
    pub timestamp: Option<DateTime<Utc>>,
    /// Recorded status, `0` without a recorder.
    pub status_code: u16,
    /// Time spent below the timer.
    pub response_time: u64,
    /// Request method.
    pub http_method: String,
    /// Path and query.
    #[serde(rename = "RequestURI")]
    pub request_uri: String,
    /// Authenticated user, empty when anonymous.
    pub remote_user: String,
    /// `User-Agent` header.
    pub user_agent: String,
}

impl AccessLogRecord {
    /// Builds the record from a request that went through the pipeline.
    #[must_use]
    pub fn from_request(request: &Request) -> Self {
        let env = &request.env;
        Self {
            timestamp: env.start_time,
            status_code: env.status_code.unwrap_or_default(),
            response_time: env
                .elapsed_time
                .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
                .unwrap_or_default(),
            http_method: request.method().to_string(),
            request_uri: request.request_uri().to_string(),
            remote_user: env.remote_user.clone().unwrap_or_default(),
            user_agent: request
                .header_str(http::header::USER_AGENT)
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Logs one JSON object per request.
#[derive(Debug, Clone, Default)]
pub struct AccessLogJsonMiddleware {
    sink: Option<AccessLogSink>,
}

impl AccessLogJsonMiddleware {
    /// Creates a logger emitting `tracing` events.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes records to `sink` instead of `tracing`.
    #[must_use]
    pub fn with_sink(mut self, sink: AccessLogSink) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl Middleware for AccessLogJsonMiddleware {
    fn name(&self) -> &'static str {
        "access-log-json"
    }

    fn process(&self, writer: &mut dyn ResponseWriter, request: &mut Request, next: Next<'_>) {
        next.run(writer, request);

        let record = AccessLogRecord::from_request(request);
        match serde_json::to_string(&record) {
            Ok(line) => emit(self.sink.as_ref(), &line),
            Err(e) => tracing::error!(error = %e, "failed to encode access log record"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Api;
    use crate::stages::access_log::testing::SharedBuffer;
    use crate::stages::{RecorderMiddleware, TimerMiddleware};
    use jsonrest_core::handler_fn;
    use jsonrest_test::{run_request, TestRequest};
    use serde_json::Value;
    use std::time::Duration;

    #[test]
    fn test_record_field_names() {
        let mut request = TestRequest::get("/users/123?verbose=1")
            .header("User-Agent", "curl/8.0")
            .build()
            .unwrap()
            .into_request()
            .unwrap();
        request.env.status_code = Some(200);
        request.env.elapsed_time = Some(Duration::from_micros(3));
        request.env.remote_user = Some("admin".into());

        let value = serde_json::to_value(AccessLogRecord::from_request(&request)).unwrap();
        assert_eq!(value["StatusCode"], 200);
        assert_eq!(value["ResponseTime"], 3000);
        assert_eq!(value["HttpMethod"], "GET");
        assert_eq!(value["RequestURI"], "/users/123?verbose=1");
        assert_eq!(value["RemoteUser"], "admin");
        assert_eq!(value["UserAgent"], "curl/8.0");
        assert_eq!(value["Timestamp"], Value::Null);
    }

    #[test]
    fn test_logs_one_object_per_request() {
        let buffer = SharedBuffer::default();
        let mut api = Api::new();
        api.use_middleware(AccessLogJsonMiddleware::new().with_sink(buffer.sink()))
            .use_middleware(TimerMiddleware::new())
            .use_middleware(RecorderMiddleware::new())
            .set_app(handler_fn(|w, _r| {
                jsonrest_core::write_error(w, "nope", http::StatusCode::NOT_FOUND);
            }));

        let handler = api.make_handler();
        run_request(&handler, TestRequest::get("/a").build().unwrap());
        run_request(&handler, TestRequest::delete("/b").build().unwrap());

        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);
        let second: AccessLogRecord = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(second.status_code, 404);
        assert_eq!(second.http_method, "DELETE");
        assert_eq!(second.request_uri, "/b");
        assert!(second.timestamp.is_some());
    }
}
