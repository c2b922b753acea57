//! Axum route handlers for call sessions and the voice-vendor webhook.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use subtle::ConstantTimeEq;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::interview::InterviewRecord;
use crate::session::runtime::SessionSnapshot;
use crate::session::vapi::{parse_server_message, ServerMessageEnvelope};
use crate::session::SessionKind;
use crate::state::AppState;
use crate::store::{get_typed, Collection};

const WEBHOOK_SECRET_HEADER: &str = "x-vapi-secret";

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCallRequest {
    #[serde(rename = "type")]
    pub session_type: String,
    #[serde(default)]
    pub user_name: String,
    pub user_id: String,
    pub interview_id: Option<String>,
    pub feedback_id: Option<String>,
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub resume_text: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/calls
///
/// `type: "generate"` runs the question-generation workflow; any other type
/// conducts the interview named by `interviewId` using its stored questions.
pub async fn handle_start_call(
    State(state): State<AppState>,
    Json(request): Json<StartCallRequest>,
) -> Result<(StatusCode, Json<SessionSnapshot>), AppError> {
    let kind = session_kind(&state, request).await?;
    let snapshot = state.sessions.start(kind).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn session_kind(state: &AppState, request: StartCallRequest) -> Result<SessionKind, AppError> {
    if request.session_type == "generate" {
        return Ok(SessionKind::Generate {
            user_name: request.user_name,
            user_id: request.user_id,
            job_description: request.job_description,
            resume_text: request.resume_text,
        });
    }

    let interview_id = request
        .interview_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::Validation("interviewId is required".to_string()))?;

    let interview: InterviewRecord =
        get_typed(state.store.as_ref(), Collection::Interviews, &interview_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Interview {interview_id} not found")))?;

    Ok(SessionKind::Interview {
        interview_id,
        user_id: request.user_id,
        feedback_id: request.feedback_id,
        questions: interview.questions,
    })
}

/// GET /api/calls/:id
pub async fn handle_get_call(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.sessions.snapshot(id)?))
}

/// POST /api/calls/:id/disconnect
pub async fn handle_disconnect_call(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.sessions.disconnect(id).await?))
}

/// DELETE /api/calls/:id
pub async fn handle_detach_call(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.detach(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Compares the presented webhook secret in constant time.
fn secret_matches(secret: &str, headers: &HeaderMap) -> bool {
    headers
        .get(WEBHOOK_SECRET_HEADER)
        .map(|presented| bool::from(presented.as_bytes().ct_eq(secret.as_bytes())))
        .unwrap_or(false)
}

/// POST /api/vapi/webhook
///
/// Relays vendor server messages to the sessions listening for them.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(envelope): Json<ServerMessageEnvelope>,
) -> Result<Json<Value>, AppError> {
    if let Some(secret) = &state.config.vapi_webhook_secret {
        if !secret_matches(secret, &headers) {
            return Err(AppError::Unauthorized);
        }
    }

    if let Some((session_id, events)) = parse_server_message(&envelope.message) {
        for event in events {
            let delivered = state.events.publish(session_id, event);
            if delivered == 0 {
                debug!(%session_id, "No listener for voice event");
            }
        }
    }

    Ok(Json(json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CallStatus;
    use crate::testing::{test_state, TestHarness};
    use crate::store::DocumentStore;

    fn start_request(session_type: &str, interview_id: Option<&str>) -> StartCallRequest {
        StartCallRequest {
            session_type: session_type.to_string(),
            user_name: "Ada".to_string(),
            user_id: "u-1".to_string(),
            interview_id: interview_id.map(String::from),
            feedback_id: None,
            job_description: "Compilers".to_string(),
            resume_text: "CV".to_string(),
        }
    }

    async fn seed_interview(harness: &TestHarness) -> String {
        harness
            .store
            .add_record(
                Collection::Interviews,
                json!({
                    "role": "Backend Engineer",
                    "type": "technical",
                    "level": "senior",
                    "techstack": ["rust"],
                    "questions": ["Explain lifetimes.", "What is Pin?"],
                    "userId": "u-1",
                    "finalized": true,
                    "coverImage": "/covers/reddit.png",
                    "createdAt": "2025-01-01T00:00:00Z"
                }),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_start_interview_call_loads_stored_questions() {
        let harness = test_state();
        let interview_id = seed_interview(&harness).await;

        let (status, Json(snapshot)) = handle_start_call(
            State(harness.state.clone()),
            Json(start_request("interview", Some(&interview_id))),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(snapshot.status, CallStatus::Connecting);
        assert_eq!(snapshot.session_type, "interview");
        let starts = harness.voice.starts();
        assert_eq!(starts[0].2["questions"], "- Explain lifetimes.\n- What is Pin?");
    }

    #[tokio::test]
    async fn test_start_interview_without_id_is_rejected() {
        let harness = test_state();
        let result = handle_start_call(
            State(harness.state.clone()),
            Json(start_request("interview", None)),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(harness.voice.starts().is_empty());
    }

    #[tokio::test]
    async fn test_start_unknown_interview_is_not_found() {
        let harness = test_state();
        let result = handle_start_call(
            State(harness.state.clone()),
            Json(start_request("interview", Some("missing"))),
        )
        .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_webhook_relays_events_to_session() {
        let harness = test_state();
        let (_, Json(snapshot)) = handle_start_call(
            State(harness.state.clone()),
            Json(start_request("generate", None)),
        )
        .await
        .unwrap();
        let id = snapshot.session_id;

        let envelope = ServerMessageEnvelope {
            message: json!({
                "type": "status-update",
                "status": "in-progress",
                "call": {"id": "call-1", "metadata": {"sessionId": id}}
            }),
        };
        handle_webhook(State(harness.state.clone()), HeaderMap::new(), Json(envelope))
            .await
            .unwrap();

        for _ in 0..200 {
            if harness.state.sessions.snapshot(id).unwrap().status == CallStatus::Active {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("webhook event never reached the session");
    }

    #[tokio::test]
    async fn test_webhook_rejects_wrong_secret() {
        let mut harness = test_state();
        harness.state.config.vapi_webhook_secret = Some("s3cret".to_string());

        let mut headers = HeaderMap::new();
        headers.insert(WEBHOOK_SECRET_HEADER, "nope".parse().unwrap());
        let envelope = ServerMessageEnvelope {
            message: json!({"type": "status-update"}),
        };

        let result = handle_webhook(State(harness.state.clone()), headers, Json(envelope)).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_webhook_accepts_matching_secret() {
        let mut harness = test_state();
        harness.state.config.vapi_webhook_secret = Some("s3cret".to_string());

        let mut headers = HeaderMap::new();
        headers.insert(WEBHOOK_SECRET_HEADER, "s3cret".parse().unwrap());
        let envelope = ServerMessageEnvelope {
            message: json!({"type": "status-update"}),
        };

        let result = handle_webhook(State(harness.state.clone()), headers, Json(envelope)).await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_secret_comparison_rejects_missing_and_prefix() {
        let mut headers = HeaderMap::new();
        assert!(!secret_matches("s3cret", &headers));

        headers.insert(WEBHOOK_SECRET_HEADER, "s3c".parse().unwrap());
        assert!(!secret_matches("s3cret", &headers));

        headers.insert(WEBHOOK_SECRET_HEADER, "s3cret".parse().unwrap());
        assert!(secret_matches("s3cret", &headers));
    }

    #[tokio::test]
    async fn test_detach_then_get_is_not_found() {
        let harness = test_state();
        let (_, Json(snapshot)) = handle_start_call(
            State(harness.state.clone()),
            Json(start_request("generate", None)),
        )
        .await
        .unwrap();
        let id = snapshot.session_id;

        let status = handle_detach_call(State(harness.state.clone()), Path(id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let result = handle_get_call(State(harness.state.clone()), Path(id)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
