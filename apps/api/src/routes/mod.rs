pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::evaluation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/job-roles", get(handlers::handle_job_roles))
        // Single-candidate evaluation
        .route("/api/v1/evaluations", post(handlers::handle_evaluate))
        // Session results and batches
        .route(
            "/api/v1/sessions/:session_id",
            delete(handlers::handle_clear_session),
        )
        .route(
            "/api/v1/sessions/:session_id/batches",
            post(handlers::handle_batch),
        )
        .route(
            "/api/v1/sessions/:session_id/batches/cancel",
            post(handlers::handle_cancel_batch),
        )
        .route(
            "/api/v1/sessions/:session_id/results",
            get(handlers::handle_list_results),
        )
        .route(
            "/api/v1/sessions/:session_id/results/:candidate_id",
            get(handlers::handle_get_result),
        )
        .route(
            "/api/v1/sessions/:session_id/analytics",
            get(handlers::handle_analytics),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
