//! Interview form: validates the multipart submission, extracts résumé text
//! and forwards the result to the generation endpoint.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::info;
use validator::{Validate, ValidationErrors};

use crate::errors::{AppError, FieldErrors};
use crate::form::extract::ResumeExtractor;
use crate::generation::GenerateRequest;
use crate::models::interview::{ExperienceLevel, InterviewType};

pub mod extract;
pub mod handlers;

/// Raw form values as submitted. Every field may be missing.
#[derive(Debug, Default, Clone)]
pub struct FormFields {
    pub role: Option<String>,
    pub interview_type: Option<String>,
    pub level: Option<String>,
    pub techstack: Option<String>,
    pub amount: Option<String>,
    pub job_description: Option<String>,
    pub user_id: Option<String>,
    pub resume: Option<Bytes>,
}

#[derive(Debug, Validate)]
struct InterviewForm {
    #[validate(length(min = 1, message = "Job description is required"))]
    job_description: String,
    #[validate(length(min = 1, message = "Role is required"))]
    role: String,
    #[validate(required(message = "Select an interview type"))]
    interview_type: Option<InterviewType>,
    #[validate(length(min = 1, message = "Tech stack is required"))]
    techstack: String,
    #[validate(required(message = "Select a job experience level"))]
    level: Option<ExperienceLevel>,
    #[validate(
        required(message = "Number of questions is required"),
        range(min = 1, max = 15, message = "Choose between 1 and 15 questions")
    )]
    amount: Option<i64>,
}

/// A submission that passed validation.
#[derive(Debug, Clone)]
pub struct ValidForm {
    pub role: String,
    pub interview_type: InterviewType,
    pub level: ExperienceLevel,
    pub techstack: String,
    pub amount: u32,
    pub job_description: String,
    pub user_id: String,
    pub resume: Bytes,
}

/// Validates a submission, reporting one message per failing field.
pub fn validate_form(fields: FormFields) -> Result<ValidForm, FieldErrors> {
    let mut errors = FieldErrors::new();

    let amount = match fields.amount.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.parse::<i64>() {
            Ok(n) => Some(n),
            Err(_) => {
                errors.insert("amount".to_string(), "Must be a number".to_string());
                None
            }
        },
    };

    let resume = fields.resume.filter(|b| !b.is_empty());
    if resume.is_none() {
        errors.insert("resume".to_string(), "Resume is required".to_string());
    }

    let form = InterviewForm {
        job_description: trimmed(fields.job_description),
        role: trimmed(fields.role),
        interview_type: fields.interview_type.as_deref().and_then(InterviewType::parse),
        techstack: trimmed(fields.techstack),
        level: fields.level.as_deref().and_then(ExperienceLevel::parse),
        amount,
    };

    if let Err(validation) = form.validate() {
        for (field, message) in field_messages(&validation) {
            errors.entry(field).or_insert(message);
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    match (resume, form.interview_type, form.level, form.amount) {
        (Some(resume), Some(interview_type), Some(level), Some(amount)) => Ok(ValidForm {
            role: form.role,
            interview_type,
            level,
            techstack: form.techstack,
            amount: amount as u32,
            job_description: form.job_description,
            user_id: trimmed(fields.user_id),
            resume,
        }),
        _ => Err(errors),
    }
}

fn trimmed(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

/// First message per field, keyed by the name the client submitted.
fn field_messages(errors: &ValidationErrors) -> Vec<(String, String)> {
    errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errs)| {
            let message = errs.first()?.message.as_ref()?.to_string();
            Some((client_field_name(field).to_string(), message))
        })
        .collect()
}

fn client_field_name(field: &str) -> &str {
    match field {
        "job_description" => "jobDescription",
        "interview_type" => "type",
        "user_id" => "userId",
        other => other,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Submission
// ────────────────────────────────────────────────────────────────────────────

/// Delivers a generation request to the question generation endpoint.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    async fn submit(&self, request: &GenerateRequest) -> Result<(), AppError>;
}

/// Posts to the generation endpoint at its absolute URL.
pub struct HttpGenerationGateway {
    client: Client,
    url: String,
}

impl HttpGenerationGateway {
    pub fn new(url: String) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(180))
                .build()?,
            url,
        })
    }
}

#[async_trait]
impl GenerationGateway for HttpGenerationGateway {
    async fn submit(&self, request: &GenerateRequest) -> Result<(), AppError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("generation request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "generation endpoint returned {status}: {body}"
            )));
        }
        Ok(())
    }
}

/// Extracts the résumé and forwards the completed request for generation.
pub async fn submit_form(
    form: ValidForm,
    extractor: &dyn ResumeExtractor,
    gateway: &dyn GenerationGateway,
) -> Result<GenerateRequest, AppError> {
    let resume_text = extractor.extract_text(&form.resume).await?;

    let request = GenerateRequest {
        interview_type: form.interview_type.as_str().to_string(),
        role: form.role,
        level: form.level.as_str().to_string(),
        techstack: form.techstack,
        amount: form.amount,
        user_id: form.user_id,
        job_description: form.job_description,
        resume_text,
    };

    gateway.submit(&request).await?;
    info!(
        "Submitted interview form for user {} ({} questions)",
        request.user_id, request.amount
    );
    Ok(request)
}
