pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::interview::handlers;
use crate::resume::handlers::handle_extract;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Resume intake
        .route("/api/v1/resumes/extract", post(handle_extract))
        // Interview API
        .route(
            "/api/v1/interviews",
            post(handlers::handle_start_interview).get(handlers::handle_list_interviews),
        )
        .route(
            "/api/v1/interviews/:id",
            get(handlers::handle_get_interview).delete(handlers::handle_delete_interview),
        )
        .route(
            "/api/v1/interviews/:id/events",
            get(handlers::handle_interview_events),
        )
        .route(
            "/api/v1/interviews/:id/answer",
            post(handlers::handle_submit_answer),
        )
        .route(
            "/api/v1/interviews/:id/cancel",
            post(handlers::handle_cancel_interview),
        )
        .route(
            "/api/v1/interviews/:id/summary",
            get(handlers::handle_get_summary),
        )
        .with_state(state)
}
