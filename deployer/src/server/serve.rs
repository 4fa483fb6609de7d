//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::DeployError;
use crate::server::handlers::{
    cancel_deployment_handler, create_deployment_handler, delete_local_site_handler,
    get_deployment_handler, get_logs_handler, health_handler, local_sites_handler,
    metrics_handler, providers_handler, version_handler,
};
use crate::server::state::ServerState;

/// Build the API router, including the static hosting mount
pub fn router(state: Arc<ServerState>) -> Router {
    let static_dir = state.local_provider.static_dir().to_path_buf();

    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/health/metrics", get(metrics_handler))
        .route("/version", get(version_handler))
        // Deployments
        .route("/deployments", post(create_deployment_handler))
        .route("/deployments/{id}", get(get_deployment_handler))
        .route("/deployments/{id}/logs", get(get_logs_handler))
        .route("/deployments/{id}/cancel", post(cancel_deployment_handler))
        // Providers
        .route("/providers", get(providers_handler))
        .route("/providers/local/sites", get(local_sites_handler))
        .route("/providers/local/sites/{site_id}", delete(delete_local_site_handler))
        // Locally hosted sites
        .nest_service("/static", ServeDir::new(static_dir))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), DeployError>>, DeployError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| DeployError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| DeployError::ServerError(e.to_string()))
    });

    Ok(handle)
}
