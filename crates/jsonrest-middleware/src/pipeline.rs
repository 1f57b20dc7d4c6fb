//! The API pipeline composer.
//!
//! An [`Api`] holds an ordered list of middlewares and an app handler
//! (usually a router). [`Api::make_handler`] composes them, first middleware
//! outermost:
//!
//! ```text
//! host → ApiHandler → m1 → m2 → … → mN → app
//!                     m1 ← m2 ← … ← mN ←─┘
//! ```
//!
//! The resulting [`ApiHandler`] is the host adapter: it creates the
//! [`Request`] (empty env, no path params) and the [`BaseResponseWriter`]
//! for each host request.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use jsonrest_core::{
    handler_fn, write_not_found, BaseResponseWriter, BoxHandler, Handler, HostResponseWriter,
    Request, ResponseWriter, WriterOptions,
};

use crate::middleware::{wrap_middlewares, BoxedMiddleware, Middleware};

/// Middlewares plus the app they wrap.
///
/// # Example
///
/// ```
/// use jsonrest_core::{Request, ResponseWriter};
/// use jsonrest_middleware::{stages::TimerMiddleware, Api};
/// use jsonrest_router::{Route, Router};
/// use serde_json::json;
///
/// let router = Router::new([Route::get("/ping", |w, _r| {
///     let _ = w.write_json(&json!({ "Body": "pong" }));
/// })])
/// .unwrap();
///
/// let mut api = Api::new();
/// api.use_middleware(TimerMiddleware::new());
/// api.set_app(router);
/// let handler = api.make_handler();
/// assert_eq!(api.middleware_names(), vec!["timer"]);
/// # let _ = handler;
/// ```
#[derive(Clone, Default)]
pub struct Api {
    middlewares: Vec<BoxedMiddleware>,
    app: Option<BoxHandler>,
    writer_options: WriterOptions,
}

impl Api {
    /// Creates an API with no middleware and no app.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware.
    pub fn use_middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Appends several middlewares, keeping their order.
    pub fn use_middlewares(
        &mut self,
        middlewares: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> &mut Self {
        self.middlewares.extend(middlewares);
        self
    }

    /// Sets the app handler.
    pub fn set_app(&mut self, app: impl Handler) -> &mut Self {
        self.app = Some(Arc::new(app));
        self
    }

    /// Sets options of the base writer created for each request.
    pub fn set_writer_options(&mut self, options: WriterOptions) -> &mut Self {
        self.writer_options = options;
        self
    }

    /// Names of the middlewares, outermost first.
    #[must_use]
    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    /// Composes the middlewares around the app.
    ///
    /// Without an app every request gets a 404.
    #[must_use]
    pub fn make_handler(&self) -> ApiHandler {
        let app = self.app.clone().unwrap_or_else(|| {
            Arc::new(handler_fn(|w: &mut dyn ResponseWriter, r: &mut Request| {
                write_not_found(w, r);
            }))
        });
        ApiHandler {
            handler: wrap_middlewares(&self.middlewares, app),
            options: self.writer_options.clone(),
        }
    }
}

/// The composed pipeline, ready to serve host requests.
///
/// Cheap to clone and shareable across workers.
#[derive(Clone)]
pub struct ApiHandler {
    handler: BoxHandler,
    options: WriterOptions,
}

impl ApiHandler {
    /// Serves one host request.
    pub fn serve_http(
        &self,
        host: &mut dyn HostResponseWriter,
        request: http::Request<Bytes>,
        remote_addr: Option<SocketAddr>,
    ) {
        let mut request = Request::new(request).with_remote_addr(remote_addr);
        let mut writer = BaseResponseWriter::new(host, self.options.clone());
        self.handler.serve(&mut writer, &mut request);
    }

    /// The composed handler.
    #[must_use]
    pub fn handler(&self) -> &BoxHandler {
        &self.handler
    }
}

impl Handler for ApiHandler {
    fn serve(&self, writer: &mut dyn ResponseWriter, request: &mut Request) {
        self.handler.serve(writer, request);
    }
}
