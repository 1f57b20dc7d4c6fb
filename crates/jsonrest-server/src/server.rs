//! HTTP server implementation.
//!
//! Serves an [`ApiHandler`] over HTTP/1.1 with Hyper and Tokio.
//!
//! # Architecture
//!
//! - TCP listener bound to the configured address
//! - One Tokio task per connection
//! - Per request: the body is collected (up to the configured limit), the
//!   synchronous pipeline runs on the blocking pool against a
//!   [`BufferedHostWriter`], and the buffered response is sent back
//! - Graceful shutdown: stop accepting, let connections finish, give up
//!   after the shutdown timeout
//!
//! # Example
//!
//! ```rust,no_run
//! use jsonrest_middleware::{stack::default_prod_stack, Api};
//! use jsonrest_router::{Route, Router};
//! use jsonrest_server::Server;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = Router::new([Route::get("/ping", |w, _r| {
//!         let _ = w.write_json(&json!({ "Body": "pong" }));
//!     })])?;
//!
//!     let mut api = Api::new();
//!     api.use_middlewares(default_prod_stack()).set_app(router);
//!
//!     Server::builder()
//!         .http_addr("0.0.0.0:8080")
//!         .build(api.make_handler())
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Request, Response};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use jsonrest_core::{BufferedHostWriter, CloseNotify, HttpError};
use jsonrest_middleware::ApiHandler;
use tokio::net::{TcpListener, TcpStream};

use crate::config::{ServerConfig, ServerConfigBuilder};
use crate::error::{ServerError, ServerResult};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Type alias for HTTP response body.
pub type ResponseBody = Full<Bytes>;

/// Type alias for the HTTP response.
pub type HttpResponse = Response<ResponseBody>;

/// The jsonrest HTTP server.
pub struct Server {
    config: ServerConfig,
    handler: ApiHandler,
}

impl Server {
    /// Creates a server for `handler`.
    #[must_use]
    pub fn new(config: ServerConfig, handler: ApiHandler) -> Self {
        Self { config, handler }
    }

    /// Creates a new server builder.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Runs until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run(self) -> ServerResult<()> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Runs until `shutdown` is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> ServerResult<()> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|e| ServerError::InvalidAddress {
                addr: self.config.http_addr().to_string(),
                reason: e.to_string(),
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener until `shutdown`
    /// is triggered, then drains in-flight connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's local address is unavailable.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> ServerResult<()> {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let server = Arc::clone(&server);
                            let token = tracker.acquire();
                            let shutdown = shutdown.clone();

                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, remote_addr, shutdown).await {
                                    tracing::debug!(remote = %remote_addr, error = %e, "connection error");
                                }
                                drop(token);
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "failed to accept connection");
                        }
                    }
                }

                () = shutdown.recv() => {
                    tracing::info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        drop(listener);
        server.drain(&tracker).await;
        Ok(())
    }

    async fn drain(&self, tracker: &ConnectionTracker) {
        let timeout = self.config.shutdown_timeout();
        tracing::info!(
            active = tracker.active_connections(),
            timeout = ?timeout,
            "waiting for connections to close"
        );

        tokio::select! {
            () = tracker.wait_for_idle() => {
                tracing::info!("all connections closed");
            }
            () = tokio::time::sleep(timeout) => {
                tracing::warn!(
                    active = tracker.active_connections(),
                    "shutdown timeout reached, abandoning connections"
                );
            }
        }

        tracing::info!("server stopped");
    }

    async fn handle_connection(
        self: Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(&self);

        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle_request(req, remote_addr).await) }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                tracing::debug!(remote = %remote_addr, "finishing connection for shutdown");
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    async fn handle_request(&self, req: Request<Incoming>, remote_addr: SocketAddr) -> HttpResponse {
        let (parts, body) = req.into_parts();

        let body = match Limited::new(body, self.config.max_body_bytes()).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                tracing::warn!(
                    limit = self.config.max_body_bytes(),
                    uri = %parts.uri,
                    "request body too large"
                );
                return error_response(&HttpError::PayloadTooLarge(
                    "Request body too large".to_string(),
                ));
            }
            Err(e) => {
                tracing::warn!(error = %e, uri = %parts.uri, "failed to read request body");
                return error_response(&HttpError::BadRequest(
                    "Cannot read request body".to_string(),
                ));
            }
        };

        let request = Request::from_parts(parts, body);
        let handler = self.handler.clone();

        // Hyper drops this future when the client goes away; dropping the
        // notifier with it is what handlers observe through close-notify.
        let (_notifier, close) = CloseNotify::channel();

        let pipeline = tokio::task::spawn_blocking(move || {
            let mut host = BufferedHostWriter::with_close_notify(close);
            handler.serve_http(&mut host, request, Some(remote_addr));
            host.into_response()
        });

        match pipeline.await {
            Ok(response) => response.map(Full::new),
            Err(e) => {
                tracing::error!(error = %e, "request pipeline aborted");
                error_response(&HttpError::internal())
            }
        }
    }
}

/// Builds the JSON error response the pipeline would have written.
fn error_response(error: &HttpError) -> HttpResponse {
    let body = serde_json::to_vec(&error.to_envelope()).unwrap_or_default();
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = error.status_code();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Builder for configuring and creating a [`Server`].
///
/// # Example
///
/// ```rust
/// use jsonrest_middleware::Api;
/// use jsonrest_server::Server;
/// use std::time::Duration;
///
/// let server = Server::builder()
///     .http_addr("127.0.0.1:9090")
///     .shutdown_timeout(Duration::from_secs(5))
///     .max_body_bytes(64 * 1024)
///     .build(Api::new().make_handler());
///
/// assert_eq!(server.config().max_body_bytes(), 64 * 1024);
/// ```
#[derive(Debug, Default)]
pub struct ServerBuilder {
    config_builder: ServerConfigBuilder,
}

impl ServerBuilder {
    /// Creates a new server builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    #[must_use]
    pub fn config(mut self, config: &ServerConfig) -> Self {
        self.config_builder = ServerConfigBuilder::new()
            .http_addr(config.http_addr())
            .shutdown_timeout(config.shutdown_timeout())
            .max_body_bytes(config.max_body_bytes());
        self
    }

    /// Sets the HTTP bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.http_addr(addr);
        self
    }

    /// Sets the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config_builder = self.config_builder.shutdown_timeout(timeout);
        self
    }

    /// Sets the request body limit in bytes.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.config_builder = self.config_builder.max_body_bytes(limit);
        self
    }

    /// Builds the server around `handler`.
    #[must_use]
    pub fn build(self, handler: ApiHandler) -> Server {
        Server::new(self.config_builder.build(), handler)
    }
}
