//! Ready-made middleware stacks.
//!
//! ```
//! use jsonrest_middleware::{stack, Api};
//!
//! let mut api = Api::new();
//! api.use_middlewares(stack::default_dev_stack());
//! assert_eq!(api.middleware_names()[0], "access-log-apache");
//! ```

use std::sync::Arc;

use crate::middleware::BoxedMiddleware;
use crate::stages::{
    AccessLogApacheMiddleware, AccessLogFormat, ContentTypeCheckerMiddleware, GzipMiddleware,
    JsonIndentMiddleware, PoweredByMiddleware, RecorderMiddleware, RecoverMiddleware,
    TimerMiddleware,
};

fn access_log(format: AccessLogFormat) -> Option<BoxedMiddleware> {
    match AccessLogApacheMiddleware::new(format) {
        Ok(logger) => Some(Arc::new(logger)),
        Err(e) => {
            tracing::error!(error = %e, "access log disabled");
            None
        }
    }
}

/// For development: coloured access log, indented JSON, stack traces in
/// error responses.
#[must_use]
pub fn default_dev_stack() -> Vec<BoxedMiddleware> {
    let mut stack: Vec<BoxedMiddleware> = Vec::new();
    stack.extend(access_log(AccessLogFormat::Default));
    stack.extend([
        Arc::new(TimerMiddleware::new()) as BoxedMiddleware,
        Arc::new(RecorderMiddleware::new()),
        Arc::new(PoweredByMiddleware::default()),
        Arc::new(RecoverMiddleware::new().enable_response_stack_trace(true)),
        Arc::new(JsonIndentMiddleware::new()),
        Arc::new(ContentTypeCheckerMiddleware::new()),
    ]);
    stack
}

/// For production: combined access log, gzip, no stack traces.
#[must_use]
pub fn default_prod_stack() -> Vec<BoxedMiddleware> {
    let mut stack: Vec<BoxedMiddleware> = Vec::new();
    stack.extend(access_log(AccessLogFormat::Combined));
    stack.extend([
        Arc::new(TimerMiddleware::new()) as BoxedMiddleware,
        Arc::new(RecorderMiddleware::new()),
        Arc::new(PoweredByMiddleware::default()),
        Arc::new(RecoverMiddleware::new()),
        Arc::new(GzipMiddleware::new()),
        Arc::new(ContentTypeCheckerMiddleware::new()),
    ]);
    stack
}

/// The middlewares every stack shares, without logging.
#[must_use]
pub fn default_common_stack() -> Vec<BoxedMiddleware> {
    vec![
        Arc::new(TimerMiddleware::new()),
        Arc::new(RecorderMiddleware::new()),
        Arc::new(PoweredByMiddleware::default()),
        Arc::new(RecoverMiddleware::new()),
    ]
}
