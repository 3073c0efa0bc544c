//! HTTP API over viewer-core.
//!
//! viewer-core is synchronous, so every handler hops onto the blocking pool.

use crate::events;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use viewer_core::{
    PathCache, ProjectSummary, SearchConfig, SessionMapping, SessionSearchResult, SessionSummary,
    StorageConfig, ViewerConfig, ViewerError,
};

pub struct AppState {
    pub storage: StorageConfig,
    /// Decoded project names, shared by every request.
    pub cache: Arc<PathCache>,
    pub search: SearchConfig,
    pub poll_interval: Duration,
}

impl AppState {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            storage: StorageConfig::from_claude_dir(config.storage.claude_dir.clone()),
            cache: Arc::new(PathCache::new()),
            search: config.search.clone(),
            poll_interval: Duration::from_millis(config.server.poll_interval_ms.max(1)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} query required")]
    MissingQuery(&'static str),

    #[error(transparent)]
    Viewer(#[from] ViewerError),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::Viewer(ViewerError::QueryTooShort { .. })
            | ApiError::Viewer(ViewerError::InvalidSessionPath { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Viewer(ViewerError::SessionNotFound(_))
            | ApiError::Viewer(ViewerError::ProjectNotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub(crate) fn required(value: Option<String>, name: &'static str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ApiError::MissingQuery(name))
}

async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> viewer_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await??)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Router
// ═══════════════════════════════════════════════════════════════════════════════

pub fn router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/api/projects", get(list_projects))
        .route("/api/sessions", get(list_sessions))
        .route("/api/session", get(get_session).delete(delete_session))
        .route("/api/session-mapping", get(session_mapping))
        .route("/api/projects/{project_id}/search", get(search_project))
        .route("/api/events", get(events::session_events))
        .with_state(state);

    let app = match static_dir {
        Some(dir) => {
            api.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true))
        }
        None => api,
    };

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Handlers
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub(crate) struct FileQuery {
    pub file: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectQuery {
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchQuery {
    q: Option<String>,
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn list_projects(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProjectSummary>>, ApiError> {
    let projects = blocking(move || {
        Ok(viewer_core::list_projects(&state.storage, &state.cache))
    })
    .await?;
    Ok(Json(projects))
}

async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    let project = required(query.project, "project")?;
    let sessions =
        blocking(move || Ok(viewer_core::list_sessions(&state.storage, &project))).await?;
    Ok(Json(sessions))
}

async fn get_session(Query(query): Query<FileQuery>) -> Result<Json<Vec<Value>>, ApiError> {
    let file = PathBuf::from(required(query.file, "file")?);
    let records = blocking(move || Ok(viewer_core::read_session_file(&file))).await?;
    Ok(Json(records))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileQuery>,
) -> Result<Json<Value>, ApiError> {
    let file = PathBuf::from(required(query.file, "file")?);
    blocking(move || viewer_core::delete_session(&state.storage, &file)).await?;
    Ok(Json(json!({ "success": true })))
}

async fn session_mapping(Query(query): Query<FileQuery>) -> Result<Json<SessionMapping>, ApiError> {
    let file = PathBuf::from(required(query.file, "file")?);
    let mapping = blocking(move || Ok(viewer_core::session_mapping(&file))).await?;
    Ok(Json(mapping))
}

async fn search_project(
    State(state): State<Arc<AppState>>,
    UrlPath(project_id): UrlPath<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SessionSearchResult>>, ApiError> {
    let q = query.q.unwrap_or_default();
    let results = blocking(move || {
        viewer_core::search_in_project(&state.storage, &project_id, &q, &state.search)
    })
    .await?;
    Ok(Json(results))
}
