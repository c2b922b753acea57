use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Score for a single evaluation category, 0 – 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub name: String,
    pub score: u32,
    pub comment: String,
}

/// Structured assessment returned by the model for one transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackAssessment {
    pub total_score: u32,
    pub category_scores: Vec<CategoryScore>,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub final_assessment: String,
}

/// Feedback record stored in the `feedback` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub interview_id: String,
    pub user_id: String,
    #[serde(flatten)]
    pub assessment: FeedbackAssessment,
    pub created_at: DateTime<Utc>,
}
