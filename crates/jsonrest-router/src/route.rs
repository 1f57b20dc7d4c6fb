//! Route declarations.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use jsonrest_core::{BoxHandler, Handler, Request, ResponseWriter};

/// A method, a path pattern and the handler serving them.
///
/// ```rust
/// use jsonrest_core::{Request, ResponseWriter};
/// use jsonrest_router::Route;
/// use serde_json::json;
///
/// let route = Route::get("/users/:id", |w, r| {
///     let _ = w.write_json(&json!({ "Id": r.path_param("id") }));
/// });
/// assert_eq!(route.method(), "GET");
/// assert_eq!(route.pattern(), "/users/:id");
/// ```
#[derive(Clone)]
pub struct Route {
    method: String,
    pattern: String,
    handler: BoxHandler,
}

macro_rules! method_constructor {
    ($(#[$doc:meta] $name:ident => $method:ident),* $(,)?) => {
        $(
            #[$doc]
            pub fn $name<F>(pattern: impl Into<String>, handler: F) -> Self
            where
                F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
            {
                Self::new(Method::$method.as_str(), pattern, handler)
            }
        )*
    };
}

impl Route {
    /// Creates a route. The method is stored uppercase.
    pub fn new(method: &str, pattern: impl Into<String>, handler: impl Handler) -> Self {
        Self::from_boxed(method, pattern, Arc::new(handler))
    }

    /// Creates a route around an already shared handler.
    pub fn from_boxed(method: &str, pattern: impl Into<String>, handler: BoxHandler) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            pattern: pattern.into(),
            handler,
        }
    }

    method_constructor! {
        /// A `GET` route.
        get => GET,
        /// A `POST` route.
        post => POST,
        /// A `PUT` route.
        put => PUT,
        /// A `PATCH` route.
        patch => PATCH,
        /// A `DELETE` route.
        delete => DELETE,
        /// A `HEAD` route.
        head => HEAD,
        /// An `OPTIONS` route.
        options => OPTIONS,
    }

    /// The uppercase HTTP method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The path pattern as declared.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The handler.
    #[must_use]
    pub fn handler(&self) -> &BoxHandler {
        &self.handler
    }

    /// Builds a concrete path by substituting placeholders with `params`.
    ///
    /// Placeholders without a value are left as written. Values are inserted
    /// as given; the router escapes them on lookup and
    /// [`Request::path_param`](jsonrest_core::Request::path_param) reads them
    /// back with query-string rules, so a `+` meant literally must be sent as
    /// `%2B`.
    ///
    /// ```rust
    /// use std::collections::HashMap;
    /// use jsonrest_core::{Request, ResponseWriter};
    /// use jsonrest_router::Route;
    ///
    /// let route = Route::get("/users/:id.:format", |_, _| {});
    /// let params = HashMap::from([
    ///     ("id".to_string(), "123".to_string()),
    ///     ("format".to_string(), "json".to_string()),
    /// ]);
    /// assert_eq!(route.make_path(&params), "/users/123.json");
    /// ```
    #[must_use]
    pub fn make_path(&self, params: &HashMap<String, String>) -> String {
        let mut path = String::with_capacity(self.pattern.len());
        let mut rest = self.pattern.as_str();

        while let Some(start) = rest.find([':', '#', '*']) {
            path.push_str(&rest[..start]);
            let marker = &rest[start..=start];
            let tail = &rest[start + 1..];
            let end = match marker {
                ":" => tail.find(['/', '.']),
                "#" => tail.find('/'),
                _ => None,
            }
            .unwrap_or(tail.len());
            let name = &tail[..end];
            match params.get(name) {
                Some(value) => path.push_str(value),
                None => {
                    path.push_str(marker);
                    path.push_str(name);
                }
            }
            rest = &tail[end..];
        }
        path.push_str(rest);
        path
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}
