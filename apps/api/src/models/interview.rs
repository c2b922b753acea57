use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewType {
    Technical,
    Behavioral,
    Mixed,
}

impl InterviewType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "technical" => Some(InterviewType::Technical),
            "behavioral" => Some(InterviewType::Behavioral),
            "mixed" => Some(InterviewType::Mixed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewType::Technical => "technical",
            InterviewType::Behavioral => "behavioral",
            InterviewType::Mixed => "mixed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Junior,
    Mid,
    Senior,
}

impl ExperienceLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "junior" => Some(ExperienceLevel::Junior),
            "mid" => Some(ExperienceLevel::Mid),
            "senior" => Some(ExperienceLevel::Senior),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Junior => "junior",
            ExperienceLevel::Mid => "mid",
            ExperienceLevel::Senior => "senior",
        }
    }
}

/// A generated interview, stored in the `interviews` collection.
///
/// `interview_type` and `level` stay as free strings: the generation endpoint
/// accepts whatever the caller sends and stores it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewRecord {
    pub role: String,
    #[serde(rename = "type")]
    pub interview_type: String,
    pub level: String,
    pub techstack: Vec<String>,
    pub questions: Vec<String>,
    pub user_id: String,
    pub finalized: bool,
    pub cover_image: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interview_type_parse_is_case_insensitive() {
        assert_eq!(InterviewType::parse("Technical"), Some(InterviewType::Technical));
        assert_eq!(InterviewType::parse(" mixed "), Some(InterviewType::Mixed));
        assert_eq!(InterviewType::parse("panel"), None);
    }

    #[test]
    fn test_experience_level_parse() {
        assert_eq!(ExperienceLevel::parse("senior"), Some(ExperienceLevel::Senior));
        assert_eq!(ExperienceLevel::parse("staff"), None);
    }

    #[test]
    fn test_interview_record_uses_document_field_names() {
        let record = InterviewRecord {
            role: "Backend Engineer".to_string(),
            interview_type: "technical".to_string(),
            level: "mid".to_string(),
            techstack: vec!["rust".to_string(), "postgres".to_string()],
            questions: vec!["What is ownership?".to_string()],
            user_id: "user-1".to_string(),
            finalized: true,
            cover_image: "/covers/spotify.png".to_string(),
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "technical");
        assert_eq!(value["userId"], "user-1");
        assert_eq!(value["coverImage"], "/covers/spotify.png");
        assert!(value.get("createdAt").is_some());
    }
}
