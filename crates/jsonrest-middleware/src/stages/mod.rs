//! Stock middlewares.
//!
//! Each middleware documents the env values it reads and writes and where
//! it belongs in the stack. A typical order, outermost first:
//!
//! 1. [`access_log`] - logs on the way out
//! 2. [`timer`] - `env.start_time`, `env.elapsed_time`
//! 3. [`recorder`] - `env.status_code`, `env.bytes_written`
//! 4. [`powered_by`], [`recover`]
//! 5. [`gzip`] - after the recorder so compressed bytes are counted
//! 6. [`cors`], [`auth_basic`] or [`auth_jwt`]
//! 7. [`content_type_checker`], [`jsonp`], [`json_indent`] - next to the app

pub mod access_log;
pub mod auth_basic;
pub mod auth_jwt;
pub mod conditional;
pub mod content_type_checker;
pub mod cors;
pub mod gzip;
pub mod json_indent;
pub mod jsonp;
pub mod powered_by;
pub mod recorder;
pub mod recover;
pub mod secure_redirect;
pub mod timer;

// Re-export main types
pub use access_log::{
    AccessLogApacheMiddleware, AccessLogFormat, AccessLogJsonMiddleware, AccessLogRecord,
    AccessLogSink,
};
pub use auth_basic::{AuthBasicBuilder, AuthBasicMiddleware};
pub use auth_jwt::{extract_claims, AuthJwtBuilder, AuthJwtMiddleware, JwtClaims};
pub use conditional::{IfBuilder, IfMiddleware};
pub use content_type_checker::ContentTypeCheckerMiddleware;
pub use cors::{CorsBuilder, CorsMiddleware};
pub use gzip::GzipMiddleware;
pub use json_indent::JsonIndentMiddleware;
pub use jsonp::JsonpMiddleware;
pub use powered_by::PoweredByMiddleware;
pub use recorder::{RecorderMiddleware, RecorderResponseWriter};
pub use recover::RecoverMiddleware;
pub use secure_redirect::SecureRedirectMiddleware;
pub use timer::TimerMiddleware;
