use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaker attribution of a transcript fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// One utterance in a call transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedMessage {
    pub role: Role,
    pub content: String,
}

impl SavedMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Durable copy of a finished call's transcript, stored in the `transcripts` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptRecord {
    pub interview_id: String,
    pub user_id: String,
    pub transcript: Vec<SavedMessage>,
    pub created_at: DateTime<Utc>,
}
