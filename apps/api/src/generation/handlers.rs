//! Axum route handlers for the question generation endpoint.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::generation::{generate_interview, GenerateRequest};
use crate::state::AppState;

/// POST /api/vapi/generate
///
/// Generates and stores an interview. Failures surface as a 500 with a fixed
/// error code; model output and internal detail stay in the server log.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<Value>, AppError> {
    generate_interview(state.model.as_ref(), state.store.as_ref(), &request).await?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/vapi/generate
pub async fn handle_generate_ack() -> Json<Value> {
    Json(json!({ "success": true, "data": "Thank you!" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use crate::store::Collection;
    use crate::testing::{sample_generate_request, test_state_with_model, ScriptedModel};

    #[tokio::test]
    async fn test_generate_success_envelope() {
        let harness = test_state_with_model(ScriptedModel::replying(
            r#"["A?", "B?", "C?", "D?", "E?"]"#,
        ));

        let Json(body) = handle_generate(
            State(harness.state.clone()),
            Json(sample_generate_request()),
        )
        .await
        .unwrap();

        assert_eq!(body, json!({ "success": true }));
        let records = harness.store.all(Collection::Interviews);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["questions"].as_array().unwrap().len(), 5);
        assert_eq!(records[0]["techstack"], json!(["rust", "tokio", "postgres"]));
    }

    #[tokio::test]
    async fn test_generate_malformed_output_is_500_without_detail() {
        let harness = test_state_with_model(ScriptedModel::replying("Sure! Here you go: Q1, Q2"));

        let err = handle_generate(
            State(harness.state.clone()),
            Json(sample_generate_request()),
        )
        .await
        .unwrap_err();

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "MALFORMED_MODEL_OUTPUT");
        assert!(!body.to_string().contains("Here you go"));
        assert!(harness.store.all(Collection::Interviews).is_empty());
    }

    #[tokio::test]
    async fn test_generate_model_failure_is_500() {
        let harness = test_state_with_model(ScriptedModel::failing());

        let response = handle_generate(
            State(harness.state.clone()),
            Json(sample_generate_request()),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_generate_ack() {
        let Json(body) = handle_generate_ack().await;
        assert_eq!(body, json!({ "success": true, "data": "Thank you!" }));
    }
}
