//! Panic recovery.
//!
//! A panic in an inner handler is caught, logged with the backtrace taken
//! at panic time, and turned into a 500 JSON error. Recover installs a
//! process-wide panic hook once; the hook stays silent for panics raised
//! under a recover guard and defers to the previous hook otherwise.

use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use http::StatusCode;
use jsonrest_core::{write_error, HandlerFault, HttpError, Request, ResponseWriter};
use serde::Serialize;

use super::access_log::AccessLogSink;
use crate::middleware::{Middleware, Next};

thread_local! {
    static GUARD_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

fn install_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if GUARD_DEPTH.with(Cell::get) > 0 {
                let backtrace = Backtrace::force_capture().to_string();
                LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(backtrace));
            } else {
                previous(info);
            }
        }));
    });
}

/// Decrements the guard depth even if the guarded call unwinds.
struct Guard;

impl Guard {
    fn enter() -> Self {
        GUARD_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        GUARD_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct FaultRecord<'a> {
    error: &'a str,
    stack: &'a str,
    http_method: &'a str,
    #[serde(rename = "RequestURI")]
    request_uri: &'a str,
}

/// Turns handler panics into `500 {"Error":"Internal Server Error"}`.
#[derive(Debug, Clone, Default)]
pub struct RecoverMiddleware {
    log_as_json: bool,
    enable_response_stack_trace: bool,
    sink: Option<AccessLogSink>,
}

impl RecoverMiddleware {
    /// Creates the middleware: plain text logs, no trace in responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs each fault as one JSON object.
    #[must_use]
    pub fn log_as_json(mut self, enabled: bool) -> Self {
        self.log_as_json = enabled;
        self
    }

    /// Sends the panic message and backtrace in the error body.
    ///
    /// Development only.
    #[must_use]
    pub fn enable_response_stack_trace(mut self, enabled: bool) -> Self {
        self.enable_response_stack_trace = enabled;
        self
    }

    /// Writes fault reports to `sink` instead of `tracing`.
    #[must_use]
    pub fn with_sink(mut self, sink: AccessLogSink) -> Self {
        self.sink = Some(sink);
        self
    }

    fn log(&self, fault: &HandlerFault, request: &Request) {
        let line = if self.log_as_json {
            let record = FaultRecord {
                error: fault.message(),
                stack: fault.backtrace(),
                http_method: request.method().as_str(),
                request_uri: request.request_uri(),
            };
            match serde_json::to_string(&record) {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!(error = %e, "failed to encode fault record");
                    fault.report()
                }
            }
        } else {
            fault.report()
        };

        match &self.sink {
            Some(sink) => {
                if let Err(e) = sink.write_line(&line) {
                    tracing::error!(error = %e, "failed to write fault report");
                }
            }
            None => tracing::error!(
                method = %request.method(),
                uri = request.request_uri(),
                "recovered from panic: {line}"
            ),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Middleware for RecoverMiddleware {
    fn name(&self) -> &'static str {
        "recover"
    }

    fn process(&self, writer: &mut dyn ResponseWriter, request: &mut Request, next: Next<'_>) {
        install_hook();

        let result = {
            let _guard = Guard::enter();
            panic::catch_unwind(AssertUnwindSafe(|| next.run(writer, request)))
        };

        if let Err(payload) = result {
            let backtrace = LAST_BACKTRACE
                .with(|slot| slot.borrow_mut().take())
                .unwrap_or_default();
            let fault = HandlerFault::new(panic_message(&*payload), backtrace);
            self.log(&fault, request);

            if self.enable_response_stack_trace {
                write_error(writer, &fault.report(), StatusCode::INTERNAL_SERVER_ERROR);
            } else {
                HttpError::internal().write_to(writer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Api;
    use crate::stages::access_log::testing::SharedBuffer;
    use jsonrest_core::handler_fn;
    use jsonrest_test::{run_request, TestRequest};
    use serde_json::Value;

    fn panicking_api(recover: RecoverMiddleware) -> Api {
        let mut api = Api::new();
        api.use_middleware(recover)
            .set_app(handler_fn(|_w, _r| panic!("test panic")));
        api
    }

    #[test]
    fn test_panic_becomes_500() {
        let buffer = SharedBuffer::default();
        let api = panicking_api(RecoverMiddleware::new().with_sink(buffer.sink()));
        run_request(&api.make_handler(), TestRequest::get("/").build().unwrap())
            .code_is(500)
            .content_type_is_json()
            .body_is(r#"{"Error":"Internal Server Error"}"#);

        assert!(buffer.lines()[0].starts_with("test panic"));
    }

    #[test]
    fn test_stack_trace_in_response() {
        let api = panicking_api(
            RecoverMiddleware::new()
                .enable_response_stack_trace(true)
                .with_sink(SharedBuffer::default().sink()),
        );
        let recorded = run_request(&api.make_handler(), TestRequest::get("/").build().unwrap());
        recorded.code_is(500);

        let payload: Value = recorded.decode_json_payload().unwrap();
        assert!(payload["Error"].as_str().unwrap().starts_with("test panic\n\n"));
    }

    #[test]
    fn test_json_fault_log() {
        let buffer = SharedBuffer::default();
        let api = panicking_api(
            RecoverMiddleware::new()
                .log_as_json(true)
                .with_sink(buffer.sink()),
        );
        run_request(&api.make_handler(), TestRequest::post("/boom").build().unwrap());

        let record: Value = serde_json::from_str(&buffer.lines()[0]).unwrap();
        assert_eq!(record["Error"], "test panic");
        assert_eq!(record["HttpMethod"], "POST");
        assert_eq!(record["RequestURI"], "/boom");
        assert!(record["Stack"].is_string());
    }

    #[test]
    fn test_no_panic_passes_through() {
        let mut api = Api::new();
        api.use_middleware(RecoverMiddleware::new())
            .set_app(handler_fn(|w, _r| {
                let _ = w.write_json(&serde_json::json!({ "Id": "1" }));
            }));
        run_request(&api.make_handler(), TestRequest::get("/").build().unwrap())
            .code_is(200)
            .body_is(r#"{"Id":"1"}"#);
    }

    #[test]
    fn test_formatted_panic_message() {
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&42_u8), "unknown panic");
    }
}
