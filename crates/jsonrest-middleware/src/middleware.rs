//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that every stock and user
//! middleware implements. A middleware sees the writer and the request on
//! the way in, decides whether to call [`Next::run`], and sees them again on
//! the way out.
//!
//! # Example
//!
//! ```
//! use jsonrest_core::{Request, ResponseWriter};
//! use jsonrest_middleware::{Middleware, Next};
//!
//! struct LoggingMiddleware;
//!
//! impl Middleware for LoggingMiddleware {
//!     fn name(&self) -> &'static str {
//!         "logging"
//!     }
//!
//!     fn process(&self, w: &mut dyn ResponseWriter, r: &mut Request, next: Next<'_>) {
//!         tracing::info!(path = r.uri().path(), "request in");
//!         next.run(w, r);
//!         tracing::info!(status = ?r.env.status_code, "request out");
//!     }
//! }
//! ```

use std::sync::Arc;

use jsonrest_core::{BoxHandler, Handler, Request, ResponseWriter};

/// The core middleware trait.
///
/// # Invariants
///
/// - A middleware calls `next.run()` at most once. Not calling it
///   short-circuits the pipeline; the middleware then writes the response.
/// - A middleware that decorates the writer passes the decorated writer to
///   `next.run()` and leaves the original untouched afterwards.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this middleware, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Processes one request.
    fn process(&self, writer: &mut dyn ResponseWriter, request: &mut Request, next: Next<'_>);
}

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The rest of the pipeline.
///
/// Consumed by [`run`](Self::run) so it can only be invoked once.
pub struct Next<'a> {
    inner: &'a dyn Handler,
}

impl<'a> Next<'a> {
    /// Creates a `Next` invoking `inner`.
    pub fn new(inner: &'a dyn Handler) -> Self {
        Self { inner }
    }

    /// Invokes the next middleware or the app.
    pub fn run(self, writer: &mut dyn ResponseWriter, request: &mut Request) {
        self.inner.serve(writer, request);
    }
}

impl dyn Middleware {
    /// Wraps `inner` so that this middleware runs around it.
    #[must_use]
    pub fn wrap(self: Arc<Self>, inner: BoxHandler) -> BoxHandler {
        Arc::new(Wrapped {
            middleware: self,
            inner,
        })
    }
}

/// Composes `middlewares` around `app`; the first one is outermost.
#[must_use]
pub fn wrap_middlewares(middlewares: &[BoxedMiddleware], app: BoxHandler) -> BoxHandler {
    middlewares
        .iter()
        .rev()
        .fold(app, |inner, middleware| Arc::clone(middleware).wrap(inner))
}

struct Wrapped {
    middleware: BoxedMiddleware,
    inner: BoxHandler,
}

impl Handler for Wrapped {
    fn serve(&self, writer: &mut dyn ResponseWriter, request: &mut Request) {
        self.middleware
            .process(writer, request, Next::new(self.inner.as_ref()));
    }
}

/// A middleware defined by a closure.
///
/// # Example
///
/// ```
/// use std::time::Instant;
/// use jsonrest_middleware::FnMiddleware;
///
/// let timing = FnMiddleware::new("timing", |w, r, next| {
///     let start = Instant::now();
///     next.run(w, r);
///     tracing::debug!(elapsed = ?start.elapsed(), "request done");
/// });
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: Fn(&mut dyn ResponseWriter, &mut Request, Next<'_>) + Send + Sync + 'static,
{
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut dyn ResponseWriter, &mut Request, Next<'_>) + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process(&self, writer: &mut dyn ResponseWriter, request: &mut Request, next: Next<'_>) {
        (self.func)(writer, request, next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrest_core::handler_fn;
    use jsonrest_test::{run_request, TestRequest};
    use parking_lot::Mutex;

    struct TraceMiddleware {
        name: &'static str,
        trace: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for TraceMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process(&self, w: &mut dyn ResponseWriter, r: &mut Request, next: Next<'_>) {
            self.trace.lock().push(format!("{}.pre", self.name));
            next.run(w, r);
            self.trace.lock().push(format!("{}.post", self.name));
        }
    }

    #[test]
    fn test_first_middleware_is_outermost() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let middlewares: Vec<BoxedMiddleware> = ["A", "B", "C"]
            .into_iter()
            .map(|name| {
                Arc::new(TraceMiddleware {
                    name,
                    trace: Arc::clone(&trace),
                }) as BoxedMiddleware
            })
            .collect();

        let app_trace = Arc::clone(&trace);
        let app: BoxHandler = Arc::new(handler_fn(move |_w, _r| {
            app_trace.lock().push("X".to_string());
        }));

        let handler = wrap_middlewares(&middlewares, app);
        run_request(handler.as_ref(), TestRequest::get("/").build().unwrap());

        assert_eq!(
            *trace.lock(),
            vec!["A.pre", "B.pre", "C.pre", "X", "C.post", "B.post", "A.post"]
        );
    }

    #[test]
    fn test_short_circuit_skips_inner() {
        let blocker = FnMiddleware::new("blocker", |w, _r, _next| {
            jsonrest_core::write_error(w, "blocked", http::StatusCode::FORBIDDEN);
        });
        let app: BoxHandler = Arc::new(handler_fn(|_w, _r| panic!("app must not run")));

        let handler = (Arc::new(blocker) as BoxedMiddleware).wrap(app);
        run_request(handler.as_ref(), TestRequest::get("/").build().unwrap())
            .code_is(403)
            .body_is(r#"{"Error":"blocked"}"#);
    }

    #[test]
    fn test_fn_middleware_name() {
        let mw = FnMiddleware::new("noop", |w, r, next| next.run(w, r));
        assert_eq!(mw.name(), "noop");
    }
}
