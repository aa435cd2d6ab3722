//! HTTP surface of the validation service.
//!
//! Routes:
//! - `POST /validate/v1` validates a document against the best match
//! - `POST /validate/v1/{name}/{version}` validates against a named resource
//! - `POST/GET /resource/v1/{resource_type}` registers / searches resources
//! - `GET/DELETE /resource/v1/{resource_type}/{id}` fetches / removes one
//! - `GET /resource/v1/{resource_type}/{name}/{version}` exact lookup
//! - `GET /health`, `GET /metrics`
//!
//! The document kind is detected from the `Content-Type` header
//! (`application/ld+json` means RDF) with a fallback on a top-level
//! `@context` key in the body.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::ValidatorError;
use crate::metrics::METRICS;
use crate::model::{DocumentKind, ResourceMetadata, SearchQuery, ValidationReport};
use crate::state::AppState;

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let bind_address = config.http_bind_address;
    let max_body_bytes = config.max_body_bytes;
    let state = Arc::new(AppState::new(config));

    let app = router(state).layer(DefaultBodyLimit::max(max_body_bytes));

    let listener = TcpListener::bind(bind_address).await?;
    info!(%bind_address, "validation service listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/validate/v1", post(validate))
        .route("/validate/v1/{name}/{version}", post(validate_named))
        .route(
            "/resource/v1/{resource_type}",
            post(add_resource).get(search_resources),
        )
        .route(
            "/resource/v1/{resource_type}/{id}",
            get(resource_by_id).delete(delete_resource),
        )
        .route(
            "/resource/v1/{resource_type}/{name}/{version}",
            get(resource_by_name_and_version),
        )
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}

/// `application/ld+json`, or a top-level `@context`, means RDF.
fn detect_kind(headers: &HeaderMap, body: &str) -> DocumentKind {
    if let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        if content_type.starts_with("application/ld+json") {
            return DocumentKind::Rdf;
        }
    }
    let has_context = serde_json::from_str::<Value>(body)
        .ok()
        .is_some_and(|v| v.get("@context").is_some());
    if has_context {
        DocumentKind::Rdf
    } else {
        DocumentKind::PlainJson
    }
}

/// The first path segment of `/resource/v1` routes.
fn parse_resource_type(resource_type: &str) -> Result<DocumentKind, ValidatorError> {
    match resource_type {
        "schema" => Ok(DocumentKind::PlainJson),
        "template" => Ok(DocumentKind::Rdf),
        other => Err(ValidatorError::invalid_input(format!(
            "unknown resource type {other}, expected schema or template"
        ))),
    }
}

async fn validate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<ValidationReport>, ValidatorError> {
    let kind = detect_kind(&headers, &body);
    let report = state.service().validate(kind, &body).await?;
    Ok(Json(report))
}

async fn validate_named(
    State(state): State<Arc<AppState>>,
    Path((name, version)): Path<(String, String)>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<ValidationReport>, ValidatorError> {
    let kind = detect_kind(&headers, &body);
    let report = state
        .service()
        .validate_named(kind, &body, &name, &version)
        .await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
struct AddResourceParams {
    name: String,
    version: String,
    description: Option<String>,
    context_uri: Option<String>,
}

async fn add_resource(
    State(state): State<Arc<AppState>>,
    Path(resource_type): Path<String>,
    Query(params): Query<AddResourceParams>,
    body: String,
) -> Result<impl IntoResponse, ValidatorError> {
    let kind = parse_resource_type(&resource_type)?;
    let mut meta = ResourceMetadata::new(params.name, params.version);
    meta.description = params.description;
    meta.context_uri = params.context_uri;
    let id = state.service().add_resource(kind, meta, &body).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    name: Option<String>,
    description: Option<String>,
    version: Option<String>,
    #[serde(default)]
    offset: usize,
    limit: Option<usize>,
}

async fn search_resources(
    State(state): State<Arc<AppState>>,
    Path(resource_type): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ValidatorError> {
    let kind = parse_resource_type(&resource_type)?;
    let query = SearchQuery {
        name: params.name,
        description: params.description,
        version: params.version,
        offset: params.offset,
        limit: params
            .limit
            .unwrap_or(state.config().default_search_limit),
    };
    let page = state.service().search(kind, &query).await?;
    Ok(Json(page))
}

async fn resource_by_id(
    State(state): State<Arc<AppState>>,
    Path((resource_type, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, ValidatorError> {
    let kind = parse_resource_type(&resource_type)?;
    let (meta, content) = state.service().resource_by_id(kind, id).await?;
    Ok(Json(json!({ "metadata": meta, "content": content })))
}

async fn resource_by_name_and_version(
    State(state): State<Arc<AppState>>,
    Path((resource_type, name, version)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, ValidatorError> {
    let kind = parse_resource_type(&resource_type)?;
    let content = state
        .service()
        .resource_by_name_and_version(kind, &name, &version)
        .await?;
    Ok(content)
}

async fn delete_resource(
    State(state): State<Arc<AppState>>,
    Path((resource_type, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, ValidatorError> {
    let kind = parse_resource_type(&resource_type)?;
    state.service().delete_resource(kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "UP" }))
}

async fn metrics() -> impl IntoResponse {
    METRICS.encode()
}
