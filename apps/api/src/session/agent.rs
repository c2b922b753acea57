//! The voice-agent port: start and stop vendor calls, subscribe to their events.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::session::events::{EventKind, Subscription};

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Which vendor-side agent runs the call.
#[derive(Debug, Clone)]
pub enum SessionDescriptor {
    /// A workflow configured in the vendor dashboard.
    Workflow { workflow_id: String },
    /// An inline assistant definition.
    Assistant(serde_json::Value),
}

/// Template variables substituted into the agent's prompts.
pub type VariableValues = BTreeMap<String, String>;

/// Vendor-side identity of a started call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallHandle {
    pub call_id: String,
    /// URL the client joins to stream audio, when the vendor provides one.
    pub web_call_url: Option<String>,
}

#[async_trait]
pub trait VoiceAgent: Send + Sync {
    async fn start(
        &self,
        session_id: Uuid,
        descriptor: &SessionDescriptor,
        variables: &VariableValues,
    ) -> Result<CallHandle, VoiceError>;

    async fn stop(&self, session_id: Uuid) -> Result<(), VoiceError>;

    /// Events for `session_id` of the given kinds, until the returned guard is dropped.
    fn subscribe(&self, session_id: Uuid, kinds: &[EventKind]) -> Subscription;

    /// Forget per-call bookkeeping once a session stops listening.
    fn release(&self, _session_id: Uuid) {}
}

/// Variables for a question-generation call run by the vendor workflow.
pub fn generate_variables(
    user_name: &str,
    user_id: &str,
    job_description: &str,
    resume_text: &str,
) -> VariableValues {
    BTreeMap::from([
        ("username".to_string(), user_name.to_string()),
        ("userid".to_string(), user_id.to_string()),
        ("jobDescription".to_string(), job_description.to_string()),
        ("resumeText".to_string(), resume_text.to_string()),
    ])
}

/// Variables for an interview call: the question list as `- question` lines.
pub fn interview_variables(questions: &[String]) -> VariableValues {
    BTreeMap::from([("questions".to_string(), format_questions(questions))])
}

pub fn format_questions(questions: &[String]) -> String {
    questions
        .iter()
        .map(|q| format!("- {q}"))
        .collect::<Vec<_>>()
        .join("\n")
}
