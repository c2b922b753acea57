//! Feedback creation and transcript persistence: the two writes made when an
//! interview call finishes.
//!
//! Both operations report success as a flag rather than an error: failures are
//! logged here and the caller only decides where to send the user.

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::feedback::prompts::{FEEDBACK_CATEGORIES, FEEDBACK_PROMPT_TEMPLATE, FEEDBACK_SYSTEM};
use crate::llm_client::{generate_json, LanguageModel};
use crate::models::feedback::{Feedback, FeedbackAssessment};
use crate::models::transcript::{SavedMessage, TranscriptRecord};
use crate::store::{Collection, DocumentStore};
use crate::transcript::format_for_review;

pub mod prompts;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResult {
    pub success: bool,
    pub feedback_id: Option<String>,
}

impl FeedbackResult {
    fn failed() -> Self {
        Self {
            success: false,
            feedback_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TranscriptResult {
    pub success: bool,
}

pub struct CreateFeedbackParams<'a> {
    pub interview_id: &'a str,
    pub user_id: &'a str,
    pub transcript: &'a [SavedMessage],
    /// Overwrite this feedback record instead of adding a new one.
    pub feedback_id: Option<&'a str>,
}

/// Scores a transcript with the model and stores the resulting feedback.
pub async fn create_feedback(
    model: &dyn LanguageModel,
    store: &dyn DocumentStore,
    params: CreateFeedbackParams<'_>,
) -> FeedbackResult {
    let interview_id = params.interview_id;
    match try_create_feedback(model, store, params).await {
        Ok(feedback_id) => {
            info!("Stored feedback {feedback_id} for interview {interview_id}");
            FeedbackResult {
                success: true,
                feedback_id: Some(feedback_id),
            }
        }
        Err(e) => {
            error!("Error saving feedback for interview {interview_id}: {e}");
            FeedbackResult::failed()
        }
    }
}

async fn try_create_feedback(
    model: &dyn LanguageModel,
    store: &dyn DocumentStore,
    params: CreateFeedbackParams<'_>,
) -> Result<String, AppError> {
    let prompt = FEEDBACK_PROMPT_TEMPLATE.replace("{transcript}", &format_for_review(params.transcript));
    let assessment: FeedbackAssessment = generate_json(model, &prompt, FEEDBACK_SYSTEM).await?;
    check_categories(&assessment);

    let feedback = Feedback {
        interview_id: params.interview_id.to_string(),
        user_id: params.user_id.to_string(),
        assessment,
        created_at: Utc::now(),
    };
    let record = serde_json::to_value(&feedback)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize feedback: {e}")))?;

    let feedback_id = match params.feedback_id {
        Some(id) => {
            store.set_record(Collection::Feedback, id, record).await?;
            id.to_string()
        }
        None => store.add_record(Collection::Feedback, record).await?,
    };

    Ok(feedback_id)
}

fn check_categories(assessment: &FeedbackAssessment) {
    let names: Vec<&str> = assessment
        .category_scores
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    if names != FEEDBACK_CATEGORIES {
        warn!("Feedback categories differ from the requested set: {names:?}");
    }
}

/// Stores the raw transcript of a finished interview.
pub async fn save_transcript(
    store: &dyn DocumentStore,
    interview_id: &str,
    user_id: &str,
    transcript: &[SavedMessage],
) -> TranscriptResult {
    let record = TranscriptRecord {
        interview_id: interview_id.to_string(),
        user_id: user_id.to_string(),
        transcript: transcript.to_vec(),
        created_at: Utc::now(),
    };

    let result = match serde_json::to_value(&record) {
        Ok(value) => store
            .add_record(Collection::Transcripts, value)
            .await
            .map_err(AppError::from),
        Err(e) => Err(AppError::Internal(anyhow::anyhow!(
            "Failed to serialize transcript: {e}"
        ))),
    };

    match result {
        Ok(id) => {
            info!("Stored transcript {id} for interview {interview_id}");
            TranscriptResult { success: true }
        }
        Err(e) => {
            error!("Error saving transcript for interview {interview_id}: {e}");
            TranscriptResult { success: false }
        }
    }
}
