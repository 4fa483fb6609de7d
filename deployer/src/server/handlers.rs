//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use openapi_server::models::{
    CreateDeploymentRequest, DeploymentCreatedResponse, DeploymentStatusResponse, ErrorResponse,
    HealthResponse, LogEntryResponse, LogsResponse, MetricsResponse, ProviderInfo,
    ProvidersResponse, VersionResponse,
};
use serde::Serialize;
use tracing::error;

use crate::errors::DeployError;
use crate::models::deployment::{Budget, DeploymentRecord, DeploymentRequest, Environment};
use crate::server::state::ServerState;
use crate::telemetry::collect_metrics;
use crate::utils::version_info;

/// Error returned by handlers, rendered as [`ErrorResponse`]
#[derive(Debug)]
pub struct ApiError(DeployError);

impl From<DeployError> for ApiError {
    fn from(err: DeployError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            DeployError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            DeployError::ValidationError(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            DeployError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
            DeployError::ServerError(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        let body = ErrorResponse {
            error: kind.to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "deployify".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
        target: version.target,
    })
}

/// Metrics handler
pub async fn metrics_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let metrics = collect_metrics(state.started_at, state.local_provider.static_dir());

    Json(MetricsResponse {
        uptime_secs: metrics.uptime_secs,
        system_uptime_secs: metrics.system_uptime_secs,
        memory_used: metrics.memory_used,
        memory_total: metrics.memory_total,
        memory_percent: metrics.memory_percent,
        disk_used: metrics.disk_used,
        disk_total: metrics.disk_total,
        disk_percent: metrics.disk_percent,
        hostname: metrics.hostname,
        timestamp: Utc::now(),
    })
}

/// Queue a deployment
pub async fn create_deployment_handler(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<CreateDeploymentRequest>,
) -> ApiResult<impl IntoResponse> {
    let environment: Environment = body.environment.parse().map_err(DeployError::ValidationError)?;
    let budget: Budget = body.budget.parse().map_err(DeployError::ValidationError)?;

    let mut request = DeploymentRequest::new(body.repo_url, environment, budget);
    if let Some(branch) = body.branch {
        request.branch = branch;
    }
    request.prefer_providers = body.prefer_providers.unwrap_or_default();

    let deployment_id = state.queue.submit(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(DeploymentCreatedResponse { deployment_id }),
    ))
}

/// Current status of a deployment
pub async fn get_deployment_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeploymentStatusResponse>> {
    let record = state.store.get(&id).await?;
    Ok(Json(status_response(&record)))
}

/// Log entries of a deployment, oldest first
pub async fn get_logs_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<LogsResponse>> {
    let record = state.store.get(&id).await?;
    Ok(Json(LogsResponse {
        deployment_id: record.id.clone(),
        status: record.status.to_string(),
        logs: record
            .logs
            .iter()
            .map(|entry| LogEntryResponse {
                level: entry.level.to_string(),
                message: entry.message.clone(),
                timestamp: entry.timestamp,
            })
            .collect(),
    }))
}

/// Cancel a deployment that has not finished
pub async fn cancel_deployment_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeploymentStatusResponse>> {
    let record = state.queue.cancel(&id).await?;
    Ok(Json(status_response(&record)))
}

/// Provider catalog
pub async fn providers_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let providers = state
        .registry
        .iter()
        .map(|p| ProviderInfo {
            id: p.id.clone(),
            name: p.name.clone(),
            architecture: to_wire(&p.architecture),
            cost_tier: p.cost_tier.to_string(),
            supported_environments: p
                .supports_environments
                .iter()
                .map(|e| e.to_string())
                .collect(),
            max_build_time: p.max_build_time,
            frameworks: p.frameworks.clone(),
            available: state.gateway.has_provider(&p.id),
        })
        .collect();

    Json(ProvidersResponse { providers })
}

#[derive(Debug, Serialize)]
pub struct LocalSitesResponse {
    pub sites: Vec<String>,
}

/// Sites published by the local provider
pub async fn local_sites_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(LocalSitesResponse {
        sites: state.local_provider.list_deployments().await,
    })
}

/// Remove a locally hosted site
pub async fn delete_local_site_handler(
    State(state): State<Arc<ServerState>>,
    Path(site_id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.local_provider.delete_deployment(&site_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(DeployError::ValidationError(format!("Could not delete site '{}'", site_id)).into())
    }
}

pub fn status_response(record: &DeploymentRecord) -> DeploymentStatusResponse {
    DeploymentStatusResponse {
        id: record.id.clone(),
        repo_url: record.repo_url.clone(),
        branch: record.branch.clone(),
        environment: record.environment.to_string(),
        budget: record.budget.to_string(),
        status: record.status.to_string(),
        provider: record.provider.clone(),
        url: record.deployment_url.clone(),
        detected: record
            .detected_stack
            .as_ref()
            .and_then(|stack| serde_json::to_value(stack).ok()),
        error: record.error_message.clone(),
        created_at: record.created_at,
        updated_at: record.updated_at,
        started_at: record.started_at,
        completed_at: record.completed_at,
        build_duration: record.build_duration,
    }
}

/// Lowercase wire string of a serde enum
fn to_wire<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}
