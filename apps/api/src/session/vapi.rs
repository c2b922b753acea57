//! Vapi adapter: starts web calls over the REST API and translates webhook
//! server messages into `VoiceEvent`s.
//!
//! Every call is created with `metadata.sessionId` so webhook traffic can be
//! routed back to the owning session.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::session::agent::{CallHandle, SessionDescriptor, VariableValues, VoiceAgent, VoiceError};
use crate::session::events::{AgentMessage, EventHub, EventKind, Subscription, VoiceEvent};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateWebCallResponse {
    id: String,
    web_call_url: Option<String>,
    monitor: Option<Monitor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Monitor {
    control_url: Option<String>,
}

#[derive(Debug, Clone)]
struct ActiveCall {
    call_id: String,
    control_url: Option<String>,
}

pub struct VapiClient {
    client: Client,
    api_key: String,
    base_url: String,
    hub: EventHub,
    calls: Mutex<HashMap<Uuid, ActiveCall>>,
}

impl VapiClient {
    pub fn new(api_key: String, base_url: String, hub: EventHub) -> Result<Self, VoiceError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            hub,
            calls: Mutex::new(HashMap::new()),
        })
    }
}

/// Request body for `POST /call/web`.
fn web_call_body(
    session_id: Uuid,
    descriptor: &SessionDescriptor,
    variables: &VariableValues,
) -> Value {
    let mut body = match descriptor {
        SessionDescriptor::Workflow { workflow_id } => json!({
            "workflowId": workflow_id,
            "workflowOverrides": { "variableValues": variables },
        }),
        SessionDescriptor::Assistant(assistant) => json!({
            "assistant": assistant,
            "assistantOverrides": { "variableValues": variables },
        }),
    };
    body["metadata"] = json!({ "sessionId": session_id });
    body
}

#[async_trait]
impl VoiceAgent for VapiClient {
    async fn start(
        &self,
        session_id: Uuid,
        descriptor: &SessionDescriptor,
        variables: &VariableValues,
    ) -> Result<CallHandle, VoiceError> {
        let response = self
            .client
            .post(format!("{}/call/web", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&web_call_body(session_id, descriptor, variables))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VoiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let created: CreateWebCallResponse = response.json().await?;
        info!(%session_id, call_id = %created.id, "Voice call created");

        self.calls.lock().insert(
            session_id,
            ActiveCall {
                call_id: created.id.clone(),
                control_url: created.monitor.and_then(|m| m.control_url),
            },
        );

        Ok(CallHandle {
            call_id: created.id,
            web_call_url: created.web_call_url,
        })
    }

    async fn stop(&self, session_id: Uuid) -> Result<(), VoiceError> {
        let call = self.calls.lock().get(&session_id).cloned();
        let Some(call) = call else {
            debug!(%session_id, "No active call to stop");
            return Ok(());
        };
        let Some(control_url) = call.control_url else {
            warn!(%session_id, call_id = %call.call_id, "Call has no control URL; cannot end it remotely");
            return Ok(());
        };

        let response = self
            .client
            .post(control_url)
            .json(&json!({ "type": "end-call" }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VoiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        info!(%session_id, call_id = %call.call_id, "Voice call stopped");
        Ok(())
    }

    fn subscribe(&self, session_id: Uuid, kinds: &[EventKind]) -> Subscription {
        self.hub.subscribe(session_id, kinds)
    }

    fn release(&self, session_id: Uuid) {
        self.calls.lock().remove(&session_id);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Webhook translation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ServerMessageEnvelope {
    pub message: Value,
}

/// Translates one webhook server message into the events it implies for its session.
///
/// Messages without a `call.metadata.sessionId` belong to no session and yield nothing.
pub fn parse_server_message(message: &Value) -> Option<(Uuid, Vec<VoiceEvent>)> {
    let session_id = message
        .pointer("/call/metadata/sessionId")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())?;

    let kind = message.get("type").and_then(Value::as_str)?;
    let events = match kind {
        "status-update" => match message.get("status").and_then(Value::as_str) {
            Some("in-progress") => vec![VoiceEvent::CallStart],
            Some("ended") => {
                let reason = message
                    .get("endedReason")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if is_error_reason(reason) {
                    vec![VoiceEvent::Error(reason.to_string()), VoiceEvent::CallEnd]
                } else {
                    vec![VoiceEvent::CallEnd]
                }
            }
            _ => Vec::new(),
        },
        "transcript" => match serde_json::from_value::<AgentMessage>(message.clone()) {
            Ok(m @ AgentMessage::Transcript { .. }) => vec![VoiceEvent::Message(m)],
            Ok(AgentMessage::Other) => Vec::new(),
            Err(e) => {
                warn!(%session_id, "Malformed transcript message: {e}");
                Vec::new()
            }
        },
        "speech-update" if message.get("role").and_then(Value::as_str) == Some("assistant") => {
            match message.get("status").and_then(Value::as_str) {
                Some("started") => vec![VoiceEvent::SpeechStart],
                Some("stopped") => vec![VoiceEvent::SpeechEnd],
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    };

    Some((session_id, events))
}

fn is_error_reason(reason: &str) -> bool {
    reason.contains("error") || reason.contains("failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transcript::Role;
    use crate::session::assistant::interviewer_assistant;
    use crate::session::agent::{generate_variables, interview_variables};
    use crate::session::events::TranscriptType;

    fn with_session(session_id: Uuid, mut message: Value) -> Value {
        message["call"] = json!({ "id": "call-1", "metadata": { "sessionId": session_id } });
        message
    }

    #[test]
    fn test_workflow_body_carries_variables_and_session() {
        let session_id = Uuid::new_v4();
        let body = web_call_body(
            session_id,
            &SessionDescriptor::Workflow {
                workflow_id: "wf-1".to_string(),
            },
            &generate_variables("Ada", "u-1", "JD", "CV"),
        );

        assert_eq!(body["workflowId"], "wf-1");
        assert_eq!(body["workflowOverrides"]["variableValues"]["username"], "Ada");
        assert_eq!(body["metadata"]["sessionId"], session_id.to_string());
        assert!(body.get("assistant").is_none());
    }

    #[test]
    fn test_assistant_body_carries_questions() {
        let body = web_call_body(
            Uuid::new_v4(),
            &SessionDescriptor::Assistant(interviewer_assistant()),
            &interview_variables(&["Q1".to_string(), "Q2".to_string()]),
        );

        assert_eq!(body["assistant"]["name"], "Interviewer");
        assert_eq!(
            body["assistantOverrides"]["variableValues"]["questions"],
            "- Q1\n- Q2"
        );
    }

    #[test]
    fn test_status_updates_map_to_call_lifecycle() {
        let id = Uuid::new_v4();
        let started = with_session(id, json!({"type": "status-update", "status": "in-progress"}));
        let ended = with_session(
            id,
            json!({"type": "status-update", "status": "ended", "endedReason": "customer-ended-call"}),
        );

        assert_eq!(parse_server_message(&started), Some((id, vec![VoiceEvent::CallStart])));
        assert_eq!(parse_server_message(&ended), Some((id, vec![VoiceEvent::CallEnd])));
    }

    #[test]
    fn test_error_ending_emits_error_then_call_end() {
        let id = Uuid::new_v4();
        let ended = with_session(
            id,
            json!({"type": "status-update", "status": "ended", "endedReason": "pipeline-error-openai-llm-failed"}),
        );

        let (_, events) = parse_server_message(&ended).unwrap();
        assert!(matches!(events[0], VoiceEvent::Error(_)));
        assert_eq!(events[1], VoiceEvent::CallEnd);
    }

    #[test]
    fn test_transcript_message_is_relayed() {
        let id = Uuid::new_v4();
        let message = with_session(
            id,
            json!({"type": "transcript", "role": "user", "transcriptType": "final", "transcript": "I like Rust"}),
        );

        let (_, events) = parse_server_message(&message).unwrap();
        assert_eq!(
            events,
            vec![VoiceEvent::Message(AgentMessage::Transcript {
                role: Role::User,
                transcript_type: TranscriptType::Final,
                transcript: "I like Rust".to_string(),
            })]
        );
    }

    #[test]
    fn test_only_assistant_speech_toggles_speaking() {
        let id = Uuid::new_v4();
        let assistant = with_session(
            id,
            json!({"type": "speech-update", "status": "started", "role": "assistant"}),
        );
        let user = with_session(
            id,
            json!({"type": "speech-update", "status": "started", "role": "user"}),
        );

        assert_eq!(parse_server_message(&assistant).unwrap().1, vec![VoiceEvent::SpeechStart]);
        assert!(parse_server_message(&user).unwrap().1.is_empty());
    }

    #[test]
    fn test_message_without_session_is_dropped() {
        let message = json!({"type": "status-update", "status": "in-progress", "call": {"id": "c"}});
        assert_eq!(parse_server_message(&message), None);
    }
}
