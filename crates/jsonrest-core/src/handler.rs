//! Handler trait for request processing.
//!
//! A [`Handler`] receives the response writer chain and the request, and
//! writes its response through the writer. Routers, composed pipelines and
//! plain closures are all handlers.

use std::sync::Arc;

use crate::request::Request;
use crate::writer::ResponseWriter;

/// A request handler.
///
/// Handlers run synchronously on the worker that received the request and are
/// free to block. They are shared across workers, so they must be `Send + Sync`.
///
/// Any closure with the right signature is a handler:
///
/// ```
/// use jsonrest_core::{handler_fn, Handler, Request, ResponseWriter};
/// use serde_json::json;
///
/// let hello = handler_fn(|w: &mut dyn ResponseWriter, _r: &mut Request| {
///     let _ = w.write_json(&json!({ "Body": "Hello World!" }));
/// });
/// # fn assert_handler<H: Handler>(_: &H) {}
/// # assert_handler(&hello);
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Serves one request.
    fn serve(&self, writer: &mut dyn ResponseWriter, request: &mut Request);
}

/// A type-erased, shareable handler.
pub type BoxHandler = Arc<dyn Handler>;

impl<F> Handler for F
where
    F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
{
    fn serve(&self, writer: &mut dyn ResponseWriter, request: &mut Request) {
        self(writer, request);
    }
}

/// Pins down the signature of a closure so it can be used as a [`Handler`].
///
/// Closure parameter types are inferred from the bound, which saves spelling
/// out `&mut dyn ResponseWriter` at every call site.
pub fn handler_fn<F>(f: F) -> F
where
    F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
{
    f
}

/// Boxes a handler into a [`BoxHandler`].
pub fn boxed<H: Handler>(handler: H) -> BoxHandler {
    Arc::new(handler)
}
