//! HTTP server exposing the tutoring API.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

use crate::{
    orchestrator::{ChatRequest, ToolRequest, Tutor},
    settings::Settings,
    storage::{LocalStorage, NotebookSection, NotebookWriter, Storage},
};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub tutor: Arc<Tutor>,
    pub storage: Arc<dyn Storage>,
    pub notebooks: Arc<NotebookWriter>,
    pub settings: Settings,
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    specialist_count: usize,
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "success": false, "message": self.message }));
        (self.status, body).into_response()
    }
}

/// Create the HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let cors_layer = create_cors_layer(&state.settings);
    let body_limit = RequestBodyLimitLayer::new(state.settings.server.max_request_size_kb * 1024);

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/specialists", get(list_specialists))
        .route("/api/chat", post(chat))
        .route("/api/tool", post(run_tool))
        .route("/api/progress/:user_id", get(get_progress))
        .route("/api/memory/:user_id", get(get_memory))
        .route("/api/profile/:user_id", get(get_profile))
        .route(
            "/api/notebooks/:user_id/:notebook_id/sections",
            post(persist_sections),
        )
        .route(
            "/api/notebooks/:user_id/:notebook_id/files",
            get(list_files),
        )
        .route(
            "/api/notebooks/:user_id/:notebook_id/files/*path",
            get(download_file),
        )
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(body_limit),
        );

    if let Some(cors) = cors_layer {
        app = app.layer(cors);
    }

    app
}

fn create_cors_layer(settings: &Settings) -> Option<CorsLayer> {
    if !settings.server.enable_cors {
        return None;
    }

    let layer = if settings.server.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = settings
            .server
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        CorsLayer::new().allow_origin(origins)
    };

    Some(layer)
}

/// Health check endpoint
#[instrument(skip(state))]
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let specialist_count = state.tutor.list_specialists().await.len();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        specialist_count,
    })
}

/// List registered specialists
#[instrument(skip(state))]
async fn list_specialists(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.tutor.list_specialists().await)
}

/// Converse with the tutor
#[instrument(skip(state, request), fields(user_id = %request.user_id))]
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let reply = state
        .tutor
        .handle_message(request)
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(Json(json!(reply)))
}

/// Execute one typed tool operation
#[instrument(skip(state, request))]
async fn run_tool(
    State(state): State<AppState>,
    Json(request): Json<ToolRequest>,
) -> Json<serde_json::Value> {
    let outcome = state.tutor.execute_tool(request);
    Json(json!(outcome))
}

#[instrument(skip(state))]
async fn get_progress(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<serde_json::Value> {
    Json(json!(state.tutor.progress().snapshot(&user_id)))
}

#[instrument(skip(state))]
async fn get_memory(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<serde_json::Value> {
    Json(json!(state.tutor.memory().snapshot(&user_id)))
}

#[instrument(skip(state))]
async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match state.tutor.profiles().get(&user_id) {
        Some(profile) => Ok(Json(json!({ "success": true, "profile": profile }))),
        None => Err(ApiError::not_found(format!(
            "No profile stored for user {user_id}"
        ))),
    }
}

#[derive(Deserialize)]
struct PersistSectionsRequest {
    sections: Vec<NotebookSection>,
}

/// Persist generated notebook sections, reporting partial success
#[instrument(skip(state, request))]
async fn persist_sections(
    State(state): State<AppState>,
    Path((user_id, notebook_id)): Path<(String, String)>,
    Json(request): Json<PersistSectionsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.sections.is_empty() {
        return Err(ApiError::bad_request("sections must not be empty"));
    }

    let report = state
        .notebooks
        .persist_sections(&user_id, &notebook_id, &request.sections)
        .await;
    Ok(Json(json!({
        "success": report.is_complete(),
        "report": report,
    })))
}

#[derive(Debug, Deserialize)]
struct ListFilesQuery {
    #[serde(default)]
    prefix: String,
}

#[instrument(skip(state))]
async fn list_files(
    State(state): State<AppState>,
    Path((user_id, notebook_id)): Path<(String, String)>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let entries = state
        .storage
        .list(&user_id, &notebook_id, &query.prefix)
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(Json(json!({ "success": true, "entries": entries })))
}

#[instrument(skip(state))]
async fn download_file(
    State(state): State<AppState>,
    Path((user_id, notebook_id, path)): Path<(String, String, String)>,
) -> Result<String, ApiError> {
    state
        .storage
        .download(&user_id, &notebook_id, &path)
        .await
        .map_err(|e| ApiError::not_found(e.to_string()))
}

/// Start the HTTP server and wait for shutdown signal
pub async fn serve(settings: &Settings) -> Result<()> {
    let tutor = Arc::new(Tutor::new(
        settings.policy.clone(),
        settings.memory.pattern_capacity,
        std::time::Duration::from_secs(settings.orchestrator.specialist_timeout_seconds),
    ));
    tutor.register_default_roster().await;

    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(settings.storage.root.clone()));
    let notebooks = Arc::new(NotebookWriter::new(storage.clone()));

    let state = AppState {
        tutor,
        storage,
        notebooks,
        settings: settings.clone(),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await
    {
        error!("HTTP server error: {}", e);
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Tutor;
    use crate::policy::PolicyConfig;
    use std::time::Duration;
    use tempfile::tempdir;

    fn test_state(storage_root: &std::path::Path) -> AppState {
        let settings = Settings::default();
        let tutor = Arc::new(Tutor::new(
            settings.policy.clone(),
            settings.memory.pattern_capacity,
            Duration::from_secs(5),
        ));
        let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(storage_root));
        let notebooks = Arc::new(NotebookWriter::new(storage.clone()));
        AppState {
            tutor,
            storage,
            notebooks,
            settings,
        }
    }

    #[tokio::test]
    async fn router_builds_from_default_settings() {
        let dir = tempdir().unwrap();
        let _router = create_router(test_state(dir.path()));
    }

    #[test]
    fn list_files_query_is_traceable() {
        // The instrument span on list_files records this argument.
        let query = ListFilesQuery {
            prefix: "week1".to_string(),
        };
        assert!(format!("{query:?}").contains("week1"));
    }

    #[test]
    fn cors_layer_respects_settings() {
        let mut settings = Settings::default();
        assert!(create_cors_layer(&settings).is_some());

        settings.server.enable_cors = false;
        assert!(create_cors_layer(&settings).is_none());
    }
}

/// Wait for shutdown signal (Ctrl+C)
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to install SIGINT handler: {}", e);
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT (Ctrl+C), shutting down gracefully");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    }
}
