//! Request statistics.
//!
//! [`StatusMiddleware`] counts responses per status code and sums response
//! times. Expose a snapshot at a route of your choice:
//!
//! ```
//! use jsonrest_core::{Request, ResponseWriter};
//! use jsonrest_middleware::{
//!     stages::{RecorderMiddleware, TimerMiddleware},
//!     Api, StatusMiddleware,
//! };
//! use jsonrest_router::{Route, Router};
//!
//! let status = StatusMiddleware::new();
//! let snapshot = status.clone();
//!
//! let router = Router::new([Route::get("/.status", move |w, _r| {
//!     let _ = w.write_serialized(&snapshot.get_status());
//! })])
//! .unwrap();
//!
//! let mut api = Api::new();
//! api.use_middleware(status)
//!     .use_middleware(TimerMiddleware::new())
//!     .use_middleware(RecorderMiddleware::new())
//!     .set_app(router);
//! # let _ = api.make_handler();
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use jsonrest_core::{Request, ResponseWriter};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::middleware::{Middleware, Next};

/// A statistics snapshot.
///
/// Durations are rendered like `1.5ms` next to their value in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Status {
    /// Process id.
    pub pid: u32,
    /// Time since the middleware was created.
    pub up_time: String,
    /// Same, in seconds.
    pub up_time_sec: f64,
    /// Snapshot time, RFC 3339.
    pub time: String,
    /// Snapshot time, Unix seconds.
    pub time_unix: i64,
    /// Responses per status code.
    pub status_code_count: BTreeMap<String, u64>,
    /// Number of responses.
    pub total_count: u64,
    /// Sum of response times.
    pub total_response_time: String,
    /// Same, in seconds.
    pub total_response_time_sec: f64,
    /// Mean response time.
    pub average_response_time: String,
    /// Same, in seconds.
    pub average_response_time_sec: f64,
}

#[derive(Debug, Default)]
struct Counters {
    status_code_count: BTreeMap<String, u64>,
    total_count: u64,
    total_response_time: Duration,
}

/// Collects response statistics.
///
/// Must sit outside the timer and recorder: it reads `env.status_code` and
/// `env.elapsed_time` on the way out. Clones share the same counters.
#[derive(Debug, Clone)]
pub struct StatusMiddleware {
    started: Instant,
    counters: Arc<RwLock<Counters>>,
}

impl Default for StatusMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusMiddleware {
    /// Creates the middleware with empty counters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            counters: Arc::new(RwLock::new(Counters::default())),
        }
    }

    fn update(&self, status_code: u16, elapsed: Duration) {
        let mut counters = self.counters.write();
        *counters
            .status_code_count
            .entry(status_code.to_string())
            .or_default() += 1;
        counters.total_count += 1;
        counters.total_response_time += elapsed;
    }

    /// Takes a snapshot of the counters.
    #[must_use]
    pub fn get_status(&self) -> Status {
        let now = Utc::now();
        let up_time = self.started.elapsed();

        let counters = self.counters.read();
        let average = match u128::from(counters.total_count) {
            0 => Duration::ZERO,
            count => Duration::from_nanos((counters.total_response_time.as_nanos() / count) as u64),
        };

        Status {
            pid: std::process::id(),
            up_time: format!("{up_time:?}"),
            up_time_sec: up_time.as_secs_f64(),
            time: now.to_rfc3339(),
            time_unix: now.timestamp(),
            status_code_count: counters.status_code_count.clone(),
            total_count: counters.total_count,
            total_response_time: format!("{:?}", counters.total_response_time),
            total_response_time_sec: counters.total_response_time.as_secs_f64(),
            average_response_time: format!("{average:?}"),
            average_response_time_sec: average.as_secs_f64(),
        }
    }
}

impl Middleware for StatusMiddleware {
    fn name(&self) -> &'static str {
        "status"
    }

    fn process(&self, writer: &mut dyn ResponseWriter, request: &mut Request, next: Next<'_>) {
        next.run(writer, request);

        match (request.env.status_code, request.env.elapsed_time) {
            (Some(status_code), Some(elapsed)) => self.update(status_code, elapsed),
            (None, _) => tracing::error!("status middleware needs the recorder below it"),
            (_, None) => tracing::error!("status middleware needs the timer below it"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::FnMiddleware;
    use crate::pipeline::Api;
    use crate::stages::{RecorderMiddleware, TimerMiddleware};
    use jsonrest_core::handler_fn;
    use jsonrest_test::{run_request, TestRequest};
    use serde_json::Value;

    fn api(status: &StatusMiddleware) -> Api {
        let mut api = Api::new();
        api.use_middleware(status.clone())
            .use_middleware(TimerMiddleware::new())
            .use_middleware(RecorderMiddleware::new())
            .set_app(handler_fn(|w, r| {
                if r.uri().path() == "/missing" {
                    jsonrest_core::write_not_found(w, r);
                } else {
                    let _ = w.write_json(&serde_json::json!({}));
                }
            }));
        api
    }

    #[test]
    fn test_counts_per_status() {
        let status = StatusMiddleware::new();
        let handler = api(&status).make_handler();
        for path in ["/a", "/b", "/missing"] {
            run_request(&handler, TestRequest::get(path).build().unwrap());
        }

        let snapshot = status.get_status();
        assert_eq!(snapshot.total_count, 3);
        assert_eq!(snapshot.status_code_count["200"], 2);
        assert_eq!(snapshot.status_code_count["404"], 1);
        assert_eq!(snapshot.pid, std::process::id());
        assert!(snapshot.average_response_time_sec <= snapshot.total_response_time_sec);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_response_time_sum_and_average() {
        let status = StatusMiddleware::new();
        let mut api = Api::new();
        api.use_middleware(status.clone())
            .use_middleware(FnMiddleware::new("fixed-timing", |w, r, next| {
                next.run(w, r);
                let millis: u64 = r.uri().path()[1..].parse().unwrap();
                r.env.status_code = Some(if millis == 30 { 404 } else { 200 });
                r.env.elapsed_time = Some(Duration::from_millis(millis));
            }))
            .set_app(handler_fn(|_w, _r| {}));
        let handler = api.make_handler();
        for path in ["/10", "/20", "/30"] {
            run_request(&handler, TestRequest::get(path).build().unwrap());
        }

        let snapshot = status.get_status();
        assert_eq!(snapshot.total_count, 3);
        assert_eq!(snapshot.status_code_count["200"], 2);
        assert_eq!(snapshot.status_code_count["404"], 1);
        assert_eq!(snapshot.total_response_time_sec, 0.06);
        assert_eq!(snapshot.total_response_time, "60ms");
        assert_eq!(snapshot.average_response_time_sec, 0.02);
        assert_eq!(snapshot.average_response_time, "20ms");
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = StatusMiddleware::new().get_status();
        assert_eq!(snapshot.total_count, 0);
        assert_eq!(snapshot.average_response_time, "0ns");
        assert!(snapshot.status_code_count.is_empty());
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(StatusMiddleware::new().get_status()).unwrap();
        for field in [
            "Pid",
            "UpTime",
            "UpTimeSec",
            "Time",
            "TimeUnix",
            "StatusCodeCount",
            "TotalCount",
            "TotalResponseTime",
            "TotalResponseTimeSec",
            "AverageResponseTime",
            "AverageResponseTimeSec",
        ] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
        assert!(matches!(value["StatusCodeCount"], Value::Object(_)));
    }

    #[test]
    fn test_missing_recorder_is_skipped() {
        let status = StatusMiddleware::new();
        let mut api = Api::new();
        api.use_middleware(status.clone())
            .set_app(handler_fn(|_w, _r| {}));
        run_request(&api.make_handler(), TestRequest::get("/").build().unwrap());
        assert_eq!(status.get_status().total_count, 0);
    }
}
