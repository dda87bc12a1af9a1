//! HTTP API module - avatar endpoint, health and static placeholders

mod avatars;

use std::path::Path;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::avatars::AvatarService;
use crate::db::Database;

pub use avatars::{ErrorBody, ErrorResponse};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub avatars: Arc<AvatarService>,
}

/// Build the API router
pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
        .merge(avatars::router());

    if let Some(dir) = static_dir {
        router = router.nest_service("/images", ServeDir::new(dir));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Root endpoint
async fn root() -> impl IntoResponse {
    Json(RootResponse {
        name: "avatard",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct RootResponse {
    name: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                database: "ok",
            }),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unhealthy",
                database: "error",
            }),
        ),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
}
