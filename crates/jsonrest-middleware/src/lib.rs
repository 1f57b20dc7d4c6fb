//! # jsonrest Middleware
//!
//! Middleware contract, pipeline composer and stock middlewares for
//! jsonrest.
//!
//! An [`Api`] holds middlewares in declaration order and an app handler.
//! The first middleware declared is the outermost one:
//!
//! ```text
//! Request → m1 → m2 → … → mN → app
//!                                ↓
//! Response ← m1 ← m2 ← … ← mN ←─┘
//! ```
//!
//! Middlewares talk to each other through the request env (see
//! [`jsonrest_core::Env`]) and by decorating the response writer.
//!
//! ## Stock middlewares
//!
//! | Middleware | Purpose |
//! |------------|---------|
//! | [`stages::TimerMiddleware`] | start time and elapsed time |
//! | [`stages::RecorderMiddleware`] | status code and bytes written |
//! | [`stages::AccessLogApacheMiddleware`] | Apache-style access log |
//! | [`stages::AccessLogJsonMiddleware`] | JSON access log |
//! | [`stages::GzipMiddleware`] | response compression |
//! | [`stages::JsonpMiddleware`] | JSONP callbacks |
//! | [`stages::JsonIndentMiddleware`] | pretty-printed JSON |
//! | [`stages::PoweredByMiddleware`] | `X-Powered-By` |
//! | [`stages::RecoverMiddleware`] | panics become 500 |
//! | [`stages::CorsMiddleware`] | CORS preflight and headers |
//! | [`stages::AuthBasicMiddleware`] | HTTP Basic authentication |
//! | [`stages::AuthJwtMiddleware`] | JWT authentication |
//! | [`stages::ContentTypeCheckerMiddleware`] | 415 on non-JSON bodies |
//! | [`stages::SecureRedirectMiddleware`] | redirect to HTTPS |
//! | [`stages::IfMiddleware`] | conditional dispatch |
//! | [`StatusMiddleware`] | request statistics |
//!
//! ## Example
//!
//! ```
//! use jsonrest_core::{Request, ResponseWriter};
//! use jsonrest_middleware::{stack, Api};
//! use jsonrest_router::{Route, Router};
//! use jsonrest_test::{run_request, TestRequest};
//! use serde_json::json;
//!
//! let router = Router::new([Route::get("/users/:id", |w, r| {
//!     let _ = w.write_json(&json!({ "Id": r.path_param("id") }));
//! })])
//! .unwrap();
//!
//! let mut api = Api::new();
//! api.use_middlewares(stack::default_common_stack()).set_app(router);
//!
//! run_request(&api.make_handler(), TestRequest::get("/users/123").build().unwrap())
//!     .code_is(200)
//!     .body_is(r#"{"Id":"123"}"#);
//! ```

#![doc(html_root_url = "https://docs.rs/jsonrest-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod middleware;
pub mod pipeline;
pub mod stack;
pub mod stages;
pub mod status;

// Re-export main types at crate root
pub use middleware::{wrap_middlewares, BoxedMiddleware, FnMiddleware, Middleware, Next};
pub use pipeline::{Api, ApiHandler};
pub use status::{Status, StatusMiddleware};
