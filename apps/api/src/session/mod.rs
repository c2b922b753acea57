//! Call sessions: lifecycle of one voice interview attempt.
//!
//! `CallSession` is the pure state machine: INACTIVE → CONNECTING → ACTIVE → FINISHED,
//! plus the speaking indicator and the accumulated transcript. The async plumbing
//! (vendor subscription, driver task, finalization hand-off) lives in `runtime`.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::transcript::SavedMessage;
use crate::session::events::{AgentMessage, TranscriptType, VoiceEvent};

pub mod agent;
pub mod assistant;
pub mod events;
pub mod handlers;
pub mod runtime;
pub mod vapi;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Call session {0} not found")]
    NotFound(Uuid),

    #[error("A call is already in progress")]
    AlreadyInProgress,

    #[error("Maximum of {0} call sessions reached")]
    CapacityReached(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallStatus {
    Inactive,
    Connecting,
    Active,
    Finished,
}

/// Effect of applying an event to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Primary status unchanged.
    None,
    /// Moved to the given status.
    To(CallStatus),
}

impl Transition {
    pub fn finished(&self) -> bool {
        matches!(self, Transition::To(CallStatus::Finished))
    }
}

/// What a session is for. Decides the start variables and whether feedback is produced.
#[derive(Debug, Clone)]
pub enum SessionKind {
    /// A call whose purpose is to create an interview through the vendor workflow.
    Generate {
        user_name: String,
        user_id: String,
        job_description: String,
        resume_text: String,
    },
    /// A call conducting a previously generated interview.
    Interview {
        interview_id: String,
        user_id: String,
        /// Existing feedback to overwrite, if the interview was taken before.
        feedback_id: Option<String>,
        questions: Vec<String>,
    },
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Generate { .. } => "generate",
            SessionKind::Interview { .. } => "interview",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CallSession {
    status: CallStatus,
    speaking: bool,
    messages: Vec<SavedMessage>,
}

impl Default for CallSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CallSession {
    pub fn new() -> Self {
        Self {
            status: CallStatus::Inactive,
            speaking: false,
            messages: Vec::new(),
        }
    }

    pub fn status(&self) -> CallStatus {
        self.status
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Finalized transcript fragments in receipt order.
    pub fn messages(&self) -> &[SavedMessage] {
        &self.messages
    }

    /// User-initiated call start. A finished session may start again; its
    /// transcript and speaking flag are reset.
    pub fn begin(&mut self) -> Result<Transition, SessionError> {
        match self.status {
            CallStatus::Inactive | CallStatus::Finished => {
                self.status = CallStatus::Connecting;
                self.speaking = false;
                self.messages.clear();
                Ok(Transition::To(CallStatus::Connecting))
            }
            CallStatus::Connecting | CallStatus::Active => Err(SessionError::AlreadyInProgress),
        }
    }

    /// User-initiated hang-up. The caller is responsible for stopping the vendor call.
    pub fn disconnect(&mut self) -> Transition {
        self.finish()
    }

    /// Applies one collaborator notification.
    pub fn apply(&mut self, event: &VoiceEvent) -> Transition {
        match event {
            VoiceEvent::CallStart => {
                if self.status == CallStatus::Connecting {
                    self.status = CallStatus::Active;
                    return Transition::To(CallStatus::Active);
                }
                debug!("Ignoring call-start in {:?}", self.status);
                Transition::None
            }
            VoiceEvent::CallEnd => self.finish(),
            VoiceEvent::SpeechStart => {
                self.speaking = true;
                Transition::None
            }
            VoiceEvent::SpeechEnd => {
                self.speaking = false;
                Transition::None
            }
            VoiceEvent::Message(AgentMessage::Transcript {
                role,
                transcript_type: TranscriptType::Final,
                transcript,
            }) => {
                self.messages.push(SavedMessage::new(*role, transcript.clone()));
                Transition::None
            }
            VoiceEvent::Message(_) => Transition::None,
            VoiceEvent::Error(detail) => {
                warn!("Voice agent reported an error: {detail}");
                Transition::None
            }
        }
    }

    fn finish(&mut self) -> Transition {
        match self.status {
            CallStatus::Connecting | CallStatus::Active => {
                self.status = CallStatus::Finished;
                Transition::To(CallStatus::Finished)
            }
            CallStatus::Inactive | CallStatus::Finished => Transition::None,
        }
    }
}
