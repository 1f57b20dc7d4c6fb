//! The routing handler.
//!
//! [`Router`] owns the declared routes and the compiled trie. It is a
//! [`Handler`]: it picks the route for a request, stores the captured path
//! parameters on the request and calls the route's handler. Requests that
//! match nothing get a 404, requests that match a path under another method
//! get a 405 with an `Allow` header.

use http::header::ALLOW;
use http::HeaderValue;
use jsonrest_core::{write_not_found, ConfigError, Handler, HttpError, Request, ResponseWriter};

use crate::params::Params;
use crate::pattern::{escape_path, escape_pattern};
use crate::route::Route;
use crate::trie::Trie;

/// Outcome of routing one request.
#[derive(Debug)]
pub enum RouteLookup<'a> {
    /// A route serves this method and path.
    Found {
        /// The chosen route.
        route: &'a Route,
        /// Captured placeholder values, raw.
        params: Params,
    },

    /// The path exists but not for this method.
    MethodNotAllowed {
        /// Methods the path does accept, sorted.
        allowed: Vec<&'a str>,
    },

    /// No route matches the path.
    NotFound,
}

/// Dispatches requests to the route matching their method and path.
///
/// When several routes match, the one declared first wins.
///
/// # Example
///
/// ```rust
/// use jsonrest_core::{Request, ResponseWriter};
/// use jsonrest_router::{Route, RouteLookup, Router};
///
/// let router = Router::new([
///     Route::get("/r/:id", |_, _| {}),
///     Route::get("/r/*rest", |_, _| {}),
/// ])
/// .unwrap();
///
/// match router.lookup("GET", "/r/abc") {
///     RouteLookup::Found { route, params } => {
///         assert_eq!(route.pattern(), "/r/:id");
///         assert_eq!(params.get("id"), Some("abc"));
///     }
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Route>,
    trie: Trie<usize>,
}

impl Router {
    /// Compiles `routes` into a router.
    ///
    /// # Errors
    ///
    /// Returns the first invalid pattern, duplicate route or placeholder
    /// conflict found.
    pub fn new(routes: impl IntoIterator<Item = Route>) -> Result<Self, ConfigError> {
        Self::with_compression(routes, true)
    }

    /// Like [`new`](Self::new), optionally leaving the trie uncompressed.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_compression(
        routes: impl IntoIterator<Item = Route>,
        compress: bool,
    ) -> Result<Self, ConfigError> {
        let routes: Vec<Route> = routes.into_iter().collect();
        let mut trie = Trie::new();
        for (index, route) in routes.iter().enumerate() {
            let pattern = escape_pattern(route.pattern())?;
            trie.add(route.method(), &pattern, index)?;
        }
        if compress {
            trie.compress();
        }
        tracing::debug!(routes = routes.len(), compress, "router compiled");
        Ok(Self { routes, trie })
    }

    /// The declared routes, in declaration order.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Routes `method` and `path` without serving anything.
    #[must_use]
    pub fn lookup(&self, method: &str, path: &str) -> RouteLookup<'_> {
        let path = escape_path(path);

        let (matches, path_matched) = self.trie.find(method, &path);
        if let Some(best) = matches.into_iter().min_by_key(|m| *m.value) {
            return RouteLookup::Found {
                route: &self.routes[*best.value],
                params: best.params,
            };
        }
        if !path_matched {
            return RouteLookup::NotFound;
        }

        let mut allowed: Vec<&str> = self
            .trie
            .find_routes_for_path(&path)
            .into_iter()
            .map(|m| self.routes[*m.value].method())
            .collect();
        allowed.sort_unstable();
        allowed.dedup();
        RouteLookup::MethodNotAllowed { allowed }
    }

    /// Renders the compiled trie for debugging.
    #[must_use]
    pub fn print_debug(&self) -> String {
        self.trie.print_debug()
    }
}

impl Handler for Router {
    fn serve(&self, writer: &mut dyn ResponseWriter, request: &mut Request) {
        let lookup = self.lookup(request.method().as_str(), request.uri().path());
        match lookup {
            RouteLookup::Found { route, params } => {
                tracing::debug!(
                    method = route.method(),
                    pattern = route.pattern(),
                    "route matched"
                );
                request.path_params = params.into_map();
                route.handler().serve(writer, request);
            }
            RouteLookup::MethodNotAllowed { allowed } => {
                match HeaderValue::from_str(&allowed.join(", ")) {
                    Ok(value) => {
                        writer.headers().insert(ALLOW, value);
                    }
                    Err(e) => tracing::warn!(error = %e, "cannot build Allow header"),
                }
                HttpError::method_not_allowed().write_to(writer);
            }
            RouteLookup::NotFound => write_not_found(writer, request),
        }
    }
}
