//! HTTP API for the chat frontend.
//!
//! JSON endpoints live under `/api`; every other path is served from the
//! frontend directory with `index.html` as the fallback page.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ragchat_core::{AppError, PreferenceStore, Theme};
use ragchat_knowledge::{CourseAnalytics, QueryAnswer, RagSystem};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Shared state for all handlers.
pub struct AppState {
    pub rag: Arc<RagSystem>,
    pub preferences: Mutex<PreferenceStore>,
}

impl AppState {
    pub fn new(rag: Arc<RagSystem>, preferences: PreferenceStore) -> Self {
        Self {
            rag,
            preferences: Mutex::new(preferences),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        if err.is_unavailable() {
            ApiError::Unavailable(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {}", self);
        }

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ThemeResponse {
    pub theme: Theme,
    /// Whether the value came from the store rather than the system setting.
    pub stored: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SystemThemeParams {
    #[serde(default)]
    pub system_dark: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetThemeRequest {
    pub theme: Theme,
}

/// Build the application router.
pub fn router(state: Arc<AppState>, frontend_dir: &Path) -> Router {
    let frontend = ServeDir::new(frontend_dir)
        .append_index_html_on_directories(true)
        .fallback(ServeFile::new(frontend_dir.join("index.html")));

    Router::new()
        .route("/api/query", post(query))
        .route("/api/courses", get(courses))
        .route("/api/health", get(health))
        .route("/api/theme", get(get_theme).put(set_theme))
        .route("/api/theme/toggle", post(toggle_theme))
        .fallback_service(frontend)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryAnswer>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("Query must not be empty".to_string()));
    }

    let answer = state
        .rag
        .query(&request.query, request.session_id.as_deref())
        .await?;
    Ok(Json(answer))
}

async fn courses(State(state): State<Arc<AppState>>) -> Result<Json<CourseAnalytics>, ApiError> {
    Ok(Json(state.rag.course_analytics().await?))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "message": "RAG System API", "status": "running" }))
}

async fn get_theme(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SystemThemeParams>,
) -> Result<Json<ThemeResponse>, ApiError> {
    let preferences = lock_preferences(&state)?;
    Ok(Json(ThemeResponse {
        theme: preferences.load_theme(params.system_dark),
        stored: preferences.stored_theme().is_some(),
    }))
}

async fn set_theme(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetThemeRequest>,
) -> Result<Json<ThemeResponse>, ApiError> {
    let mut preferences = lock_preferences(&state)?;
    preferences.set_theme(request.theme)?;
    Ok(Json(ThemeResponse {
        theme: request.theme,
        stored: true,
    }))
}

async fn toggle_theme(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SystemThemeParams>,
) -> Result<Json<ThemeResponse>, ApiError> {
    let mut preferences = lock_preferences(&state)?;
    let theme = preferences.toggle_theme(params.system_dark)?;
    Ok(Json(ThemeResponse {
        theme,
        stored: true,
    }))
}

fn lock_preferences(state: &AppState) -> Result<std::sync::MutexGuard<'_, PreferenceStore>, ApiError> {
    state
        .preferences
        .lock()
        .map_err(|_| ApiError::Internal("Preference store is unavailable".to_string()))
}
