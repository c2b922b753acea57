//! Question generation: turns interview parameters into a stored interview.
//!
//! Flow: build prompt → model returns a bare JSON array → shape `InterviewRecord`
//! → persist to the `interviews` collection.

use chrono::Utc;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::generation::prompts::{QUESTIONS_PROMPT_TEMPLATE, QUESTIONS_SYSTEM};
use crate::llm_client::prompts::SPEAKABLE_INSTRUCTION;
use crate::llm_client::{generate_json, LanguageModel};
use crate::models::interview::InterviewRecord;
use crate::store::{Collection, DocumentStore};

pub mod handlers;
pub mod prompts;

/// Cover images under `/covers`, one picked at random per interview.
const INTERVIEW_COVERS: [&str; 12] = [
    "adobe.png",
    "amazon.png",
    "facebook.png",
    "hostinger.png",
    "pinterest.png",
    "quora.png",
    "reddit.png",
    "skype.png",
    "spotify.png",
    "telegram.png",
    "tiktok.png",
    "yahoo.png",
];

/// Body of `POST /api/vapi/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(rename = "type")]
    pub interview_type: String,
    pub role: String,
    pub level: String,
    /// Comma-delimited list, e.g. "rust, tokio, postgres".
    pub techstack: String,
    pub amount: u32,
    #[serde(rename = "userid")]
    pub user_id: String,
    pub job_description: String,
    pub resume_text: String,
}

/// Generates questions for `request` and stores the resulting interview.
/// Returns the new record's id alongside the record.
pub async fn generate_interview(
    model: &dyn LanguageModel,
    store: &dyn DocumentStore,
    request: &GenerateRequest,
) -> Result<(String, InterviewRecord), AppError> {
    let prompt = build_questions_prompt(request);
    let questions: Vec<String> = generate_json(model, &prompt, QUESTIONS_SYSTEM).await?;

    if questions.len() != request.amount as usize {
        warn!(
            "Requested {} questions, model returned {}",
            request.amount,
            questions.len()
        );
    }

    let record = InterviewRecord {
        role: request.role.clone(),
        interview_type: request.interview_type.clone(),
        level: request.level.clone(),
        techstack: split_techstack(&request.techstack),
        questions,
        user_id: request.user_id.clone(),
        finalized: true,
        cover_image: random_cover(),
        created_at: Utc::now(),
    };

    let value = serde_json::to_value(&record)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize interview: {e}")))?;
    let id = store.add_record(Collection::Interviews, value).await?;

    info!(
        "Generated interview {} with {} questions for user {}",
        id,
        record.questions.len(),
        record.user_id
    );

    Ok((id, record))
}

fn build_questions_prompt(request: &GenerateRequest) -> String {
    QUESTIONS_PROMPT_TEMPLATE
        .replace("{role}", &request.role)
        .replace("{level}", &request.level)
        .replace("{techstack}", &request.techstack)
        .replace("{interview_type}", &request.interview_type)
        .replace("{job_description}", &request.job_description)
        .replace("{resume_text}", &request.resume_text)
        .replace("{amount}", &request.amount.to_string())
        .replace("{speakable_instruction}", SPEAKABLE_INSTRUCTION)
}

/// Splits a comma-delimited tech stack, trimming entries and dropping empty ones.
pub fn split_techstack(techstack: &str) -> Vec<String> {
    techstack
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

pub fn random_cover() -> String {
    let name = INTERVIEW_COVERS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(INTERVIEW_COVERS[0]);
    format!("/covers/{name}")
}
