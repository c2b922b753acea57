use axum::{
    extract::{multipart::Field, Multipart, State},
    Json,
};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::form::{submit_form, validate_form, FormFields};
use crate::state::AppState;

/// POST /api/interview-form
///
/// Multipart fields: role, type, level, techstack, amount, jobDescription,
/// userId and a `resume` file part.
pub async fn handle_submit_form(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let fields = read_fields(multipart).await?;
    let form = validate_form(fields).map_err(AppError::InvalidForm)?;

    submit_form(
        form,
        state.resume_extractor.as_ref(),
        state.generation_gateway.as_ref(),
    )
    .await?;

    Ok(Json(json!({ "success": true, "redirect": "/" })))
}

async fn read_fields(mut multipart: Multipart) -> Result<FormFields, AppError> {
    let mut fields = FormFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read form data: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "resume" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read resume: {e}")))?;
                fields.resume = Some(data);
            }
            "role" => fields.role = Some(text(field).await?),
            "type" => fields.interview_type = Some(text(field).await?),
            "level" => fields.level = Some(text(field).await?),
            "techstack" => fields.techstack = Some(text(field).await?),
            "amount" => fields.amount = Some(text(field).await?),
            "jobDescription" => fields.job_description = Some(text(field).await?),
            "userId" | "userid" => fields.user_id = Some(text(field).await?),
            _ => {}
        }
    }

    Ok(fields)
}

async fn text(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read form field: {e}")))
}
