//! Routing for jsonrest.
//!
//! Routes are declared as a method, a path pattern and a handler. Patterns
//! support three placeholder kinds:
//!
//! | Syntax | Captures |
//! |---|---|
//! | `:name` | up to the next `/` or `.` |
//! | `#name` | up to the next `/` (dots allowed) |
//! | `*name` | the rest of the path |
//!
//! The [`Router`] compiles the routes into a byte-level [`Trie`], compresses
//! it, and serves as the app handler of a pipeline.
//!
//! # Example
//!
//! ```rust
//! use jsonrest_core::{Request, ResponseWriter};
//! use jsonrest_router::{Route, Router};
//! use serde_json::json;
//!
//! let router = Router::new([
//!     Route::get("/users/:id", |w, r| {
//!         let _ = w.write_json(&json!({ "Id": r.path_param("id") }));
//!     }),
//!     Route::get("/files/*path", |_, _| {}),
//! ])
//! .unwrap();
//! assert_eq!(router.routes().len(), 2);
//! ```
//!
//! # Architecture
//!
//! After compression the literal edges of each node share one key length:
//!
//! ```text
//!             (root)
//!               │
//!        ┌──────┴──────┐
//!     "/users/"     "/files/"
//!        │              │
//!      ":id"         "*path"
//!      [GET]          [GET]
//! ```

#![doc(html_root_url = "https://docs.rs/jsonrest-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod params;
mod pattern;
mod route;
mod router;
mod trie;

pub use params::Params;
pub use pattern::{escape_path, escape_pattern};
pub use route::Route;
pub use router::{RouteLookup, Router};
pub use trie::{Match, Trie};
