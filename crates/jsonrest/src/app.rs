//! Assembling and serving an API from a loaded configuration.

use jsonrest_config::{ApiConfig, JsonRestConfig, StackKind};
use jsonrest_core::{ConfigError, WriterOptions};
use jsonrest_middleware::{stack, Api, BoxedMiddleware};
use jsonrest_router::{Route, Router};
use jsonrest_server::{Server, ServerConfig, ShutdownSignal};
use jsonrest_telemetry::init_logging;
use thiserror::Error;

/// Errors raised while starting a service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] jsonrest_config::ConfigError),

    /// The routes or a middleware were misconfigured.
    #[error(transparent)]
    Routes(#[from] ConfigError),

    /// Logging could not be installed.
    #[error(transparent)]
    Telemetry(#[from] jsonrest_telemetry::TelemetryError),

    /// The server failed to start.
    #[error(transparent)]
    Server(#[from] jsonrest_server::ServerError),
}

/// The stock middlewares selected by `kind`.
#[must_use]
pub fn stack_for(kind: StackKind) -> Vec<BoxedMiddleware> {
    match kind {
        StackKind::Dev => stack::default_dev_stack(),
        StackKind::Prod => stack::default_prod_stack(),
        StackKind::Common => stack::default_common_stack(),
        StackKind::None => Vec::new(),
    }
}

/// Builds an [`Api`] serving `routes` behind the configured stack.
///
/// Extra middlewares can still be appended to the returned API; they run
/// inside the stock ones.
///
/// # Errors
///
/// Returns the router's error for an invalid or conflicting route.
///
/// # Example
///
/// ```
/// use jsonrest::config::{ApiConfig, StackKind};
/// use jsonrest::prelude::*;
///
/// let config = ApiConfig { stack: StackKind::Common, ..Default::default() };
/// let api = jsonrest::build_api(&config, [Route::get("/ping", |w, _r| {
///     let _ = w.write_json(&serde_json::json!({ "Body": "pong" }));
/// })])
/// .unwrap();
/// assert_eq!(api.middleware_names(), vec!["timer", "recorder", "powered-by", "recover"]);
/// ```
pub fn build_api(
    config: &ApiConfig,
    routes: impl IntoIterator<Item = Route>,
) -> Result<Api, ConfigError> {
    let router = Router::with_compression(routes, !config.disable_trie_compression)?;

    let mut api = Api::new();
    api.use_middlewares(stack_for(config.stack))
        .set_writer_options(WriterOptions {
            indent: config.indent_json,
            powered_by: config.powered_by.clone(),
        })
        .set_app(router);
    Ok(api)
}

/// Installs logging, then serves `api` until `shutdown` fires.
///
/// # Errors
///
/// Fails if logging cannot be installed or the server cannot bind.
pub async fn serve(
    config: &JsonRestConfig,
    api: &Api,
    shutdown: ShutdownSignal,
) -> Result<(), AppError> {
    init_logging(&config.log_config())?;
    tracing::info!(
        stack = ?config.api.stack,
        middlewares = ?api.middleware_names(),
        "starting jsonrest service"
    );

    Server::builder()
        .config(&ServerConfig::from(&config.server))
        .build(api.make_handler())
        .run_with_shutdown(shutdown)
        .await?;
    Ok(())
}
