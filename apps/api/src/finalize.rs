//! Finalization: decides what happens after a call reaches FINISHED.
//!
//! Generate sessions go straight back to the entry point. Interview sessions
//! submit the transcript for feedback and storage, and only a fully
//! successful pair of writes leads to the feedback review page.

use serde::Serialize;
use tracing::{info, warn};

use crate::feedback::{create_feedback, save_transcript, CreateFeedbackParams};
use crate::llm_client::LanguageModel;
use crate::models::transcript::SavedMessage;
use crate::session::SessionKind;
use crate::store::DocumentStore;

/// Where the client should go once a session is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Navigation {
    EntryPoint,
    FeedbackReview { interview_id: String },
}

impl Navigation {
    pub fn path(&self) -> String {
        match self {
            Navigation::EntryPoint => "/".to_string(),
            Navigation::FeedbackReview { interview_id } => {
                format!("/interview/{interview_id}/feedback")
            }
        }
    }
}

pub async fn finalize(
    kind: &SessionKind,
    transcript: &[SavedMessage],
    model: &dyn LanguageModel,
    store: &dyn DocumentStore,
) -> Navigation {
    let (interview_id, user_id, feedback_id) = match kind {
        SessionKind::Generate { .. } => return Navigation::EntryPoint,
        SessionKind::Interview {
            interview_id,
            user_id,
            feedback_id,
            ..
        } => (interview_id, user_id, feedback_id),
    };

    info!(
        "Finalizing interview {interview_id} with {} transcript messages",
        transcript.len()
    );

    let (feedback, saved) = tokio::join!(
        create_feedback(
            model,
            store,
            CreateFeedbackParams {
                interview_id,
                user_id,
                transcript,
                feedback_id: feedback_id.as_deref(),
            },
        ),
        save_transcript(store, interview_id, user_id, transcript),
    );

    match feedback.feedback_id {
        Some(_) if feedback.success && saved.success => Navigation::FeedbackReview {
            interview_id: interview_id.clone(),
        },
        _ => {
            warn!(
                "Finalization failed for interview {interview_id} (feedback: {}, transcript: {})",
                feedback.success, saved.success
            );
            Navigation::EntryPoint
        }
    }
}
