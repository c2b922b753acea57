pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::form::handlers as form;
use crate::generation::handlers as generation;
use crate::session::handlers as calls;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Question generation + vendor webhook
        .route(
            "/api/vapi/generate",
            post(generation::handle_generate).get(generation::handle_generate_ack),
        )
        .route("/api/vapi/webhook", post(calls::handle_webhook))
        // Interview form
        .route("/api/interview-form", post(form::handle_submit_form))
        // Call sessions
        .route("/api/calls", post(calls::handle_start_call))
        .route(
            "/api/calls/:id",
            get(calls::handle_get_call).delete(calls::handle_detach_call),
        )
        .route(
            "/api/calls/:id/disconnect",
            post(calls::handle_disconnect_call),
        )
        .with_state(state)
}
