//! # jsonrest
//!
//! **JSON-over-HTTP routing and middleware**
//!
//! jsonrest builds REST APIs that speak JSON:
//!
//! - 🧭 **Trie Router** – `:param`, `#relaxed` and `*splat` placeholders,
//!   earliest declared route wins, 405 with an `Allow` header
//! - 🧅 **Middleware Pipeline** – first declared is outermost; middlewares
//!   share per-request env data and decorate the response writer
//! - 📦 **Stock Middlewares** – access logs, gzip, JSONP, CORS, Basic and
//!   JWT auth, panic recovery, request statistics
//! - 🧪 **In-Memory Testing** – run any handler without a socket
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jsonrest::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), jsonrest::AppError> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("jsonrest.toml")?
//!         .with_env_prefix("JSONREST")
//!         .load()?;
//!
//!     let api = jsonrest::build_api(&config.api, [
//!         Route::get("/users/:id", |w, r| {
//!             let _ = w.write_json(&json!({ "Id": r.path_param("id") }));
//!         }),
//!     ])?;
//!
//!     jsonrest::serve(&config, &api, ShutdownSignal::with_os_signals()).await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → m1 → m2 → … → mN → Router → handler
//!                                          ↓
//! Response ← m1 ← m2 ← … ← mN ←───────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/jsonrest/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;

pub use app::{build_api, serve, stack_for, AppError};

// Re-export core types
pub use jsonrest_core as core;

// Re-export router types
pub use jsonrest_router as router;

// Re-export middleware types
pub use jsonrest_middleware as middleware;

// Re-export telemetry setup
pub use jsonrest_telemetry as telemetry;

// Re-export configuration types
pub use jsonrest_config as config;

// Re-export server types
pub use jsonrest_server as server;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use jsonrest::prelude::*;
/// ```
pub mod prelude {
    pub use jsonrest_core::{
        handler_fn, write_error, write_not_found, Env, Handler, HttpError, Request,
        ResponseWriter,
    };

    pub use jsonrest_router::{Route, Router};

    pub use jsonrest_middleware::stages::{
        extract_claims, AccessLogApacheMiddleware, AccessLogFormat, AccessLogJsonMiddleware,
        AuthBasicMiddleware, AuthJwtMiddleware, ContentTypeCheckerMiddleware, CorsMiddleware,
        GzipMiddleware, IfMiddleware, JsonIndentMiddleware, JsonpMiddleware, PoweredByMiddleware,
        RecorderMiddleware, RecoverMiddleware, SecureRedirectMiddleware, TimerMiddleware,
    };
    pub use jsonrest_middleware::{
        Api, ApiHandler, FnMiddleware, Middleware, Next, StatusMiddleware,
    };

    pub use jsonrest_config::{ConfigLoader, JsonRestConfig};
    pub use jsonrest_server::{Server, ShutdownSignal};
    pub use jsonrest_telemetry::{init_logging, LogConfig};
}
