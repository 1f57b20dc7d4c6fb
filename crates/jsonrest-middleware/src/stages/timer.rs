//! Request timing.

use std::time::Instant;

use chrono::Utc;
use jsonrest_core::{Request, ResponseWriter};

use crate::middleware::{Middleware, Next};

/// Records when the request started and how long the inner handlers took.
///
/// Sets `env.start_time` on the way in and `env.elapsed_time` on the way
/// out. Place it near the outermost position so the measure covers the
/// whole pipeline below it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimerMiddleware;

impl TimerMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for TimerMiddleware {
    fn name(&self) -> &'static str {
        "timer"
    }

    fn process(&self, writer: &mut dyn ResponseWriter, request: &mut Request, next: Next<'_>) {
        let started = Instant::now();
        request.env.start_time = Some(Utc::now());

        next.run(writer, request);

        request.env.elapsed_time = Some(started.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{BoxedMiddleware, FnMiddleware};
    use crate::pipeline::Api;
    use jsonrest_core::handler_fn;
    use jsonrest_test::{run_request, TestRequest};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_timer_sets_start_and_elapsed() {
        let check = FnMiddleware::new("check", |w, r, next| {
            next.run(w, r);
            assert!(r.env.start_time.is_some());
            assert!(r.env.elapsed_time.unwrap() >= Duration::from_millis(5));
            let _ = w.write_json(&serde_json::json!("checked"));
        });

        let mut api = Api::new();
        api.use_middlewares([
            Arc::new(check) as BoxedMiddleware,
            Arc::new(TimerMiddleware::new()),
        ])
        .set_app(handler_fn(|_w, r| {
            assert!(r.env.start_time.is_some());
            assert!(r.env.elapsed_time.is_none());
            std::thread::sleep(Duration::from_millis(5));
        }));

        run_request(&api.make_handler(), TestRequest::get("/").build().unwrap())
            .body_is(r#""checked""#);
    }
}
