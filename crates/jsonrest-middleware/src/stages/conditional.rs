//! Conditional dispatch between two middlewares.

use std::fmt;
use std::sync::Arc;

use jsonrest_core::{ConfigError, Request, ResponseWriter};

use crate::middleware::{BoxedMiddleware, Middleware, Next};

const NAME: &str = "if";

/// Decides which branch serves a request.
pub type Condition = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

/// Runs `if_true` or `if_false` depending on a condition.
///
/// A missing branch passes the request straight to the next handler.
///
/// # Example
///
/// ```
/// use jsonrest_middleware::stages::{GzipMiddleware, IfMiddleware};
///
/// let gzip_api = IfMiddleware::builder()
///     .condition(|r| r.uri().path().starts_with("/api/"))
///     .if_true(GzipMiddleware::new())
///     .build()
///     .unwrap();
/// # let _ = gzip_api;
/// ```
#[derive(Clone)]
pub struct IfMiddleware {
    condition: Condition,
    if_true: Option<BoxedMiddleware>,
    if_false: Option<BoxedMiddleware>,
}

impl IfMiddleware {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> IfBuilder {
        IfBuilder::default()
    }
}

impl fmt::Debug for IfMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IfMiddleware")
            .field("if_true", &self.if_true.as_ref().map(|m| m.name()))
            .field("if_false", &self.if_false.as_ref().map(|m| m.name()))
            .finish_non_exhaustive()
    }
}

impl Middleware for IfMiddleware {
    fn name(&self) -> &'static str {
        NAME
    }

    fn process(&self, writer: &mut dyn ResponseWriter, request: &mut Request, next: Next<'_>) {
        let branch = if (self.condition)(request) {
            &self.if_true
        } else {
            &self.if_false
        };
        match branch {
            Some(middleware) => middleware.process(writer, request, next),
            None => next.run(writer, request),
        }
    }
}

/// Builder for [`IfMiddleware`].
#[derive(Default)]
#[must_use]
pub struct IfBuilder {
    condition: Option<Condition>,
    if_true: Option<BoxedMiddleware>,
    if_false: Option<BoxedMiddleware>,
}

impl IfBuilder {
    /// The condition. Required.
    pub fn condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// Middleware used when the condition holds.
    pub fn if_true(mut self, middleware: impl Middleware) -> Self {
        self.if_true = Some(Arc::new(middleware));
        self
    }

    /// Middleware used otherwise.
    pub fn if_false(mut self, middleware: impl Middleware) -> Self {
        self.if_false = Some(Arc::new(middleware));
        self
    }

    /// Builds the middleware.
    pub fn build(self) -> Result<IfMiddleware, ConfigError> {
        let condition = self
            .condition
            .ok_or_else(|| ConfigError::missing_option(NAME, "condition"))?;
        Ok(IfMiddleware {
            condition,
            if_true: self.if_true,
            if_false: self.if_false,
        })
    }
}
