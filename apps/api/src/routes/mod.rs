pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::review::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/resumes",
            post(handlers::handle_submit).get(handlers::handle_list),
        )
        .route("/api/v1/resumes/:id", get(handlers::handle_get))
        .route(
            "/api/v1/resumes/:id/document",
            get(handlers::handle_document),
        )
        .route("/api/v1/resumes/:id/preview", get(handlers::handle_preview))
        .route(
            "/api/v1/resumes/:id/analyze",
            post(handlers::handle_reanalyze),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
