pub mod auth;
pub mod error;
pub mod handlers;

use std::any::Any;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::retrieval::TaskRetriever;
use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub retriever: Arc<TaskRetriever>,
    pub auth_token: Arc<str>,
}

impl AppState {
    pub fn new(retriever: TaskRetriever, auth_token: &str) -> Self {
        Self {
            retriever: Arc::new(retriever),
            auth_token: Arc::from(auth_token),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let tools = Router::new()
        .route("/tools", get(handlers::list_tools))
        .route("/tools/list_tasks", get(handlers::list_tasks))
        .route("/tools/get_task/{task_id}", get(handlers::get_task))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(tools)
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());
    ApiError::Internal(details).into_response()
}

pub async fn run(config: &ServerConfig, state: AppState) -> Result<()> {
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Gateway listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
