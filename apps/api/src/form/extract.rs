//! Résumé text extraction.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("Resume contains no extractable text")]
    Empty,

    #[error("Extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait ResumeExtractor: Send + Sync {
    async fn extract_text(&self, file: &Bytes) -> Result<String, ExtractError>;
}

/// Extracts text from an uploaded PDF on the blocking pool.
pub struct PdfResumeExtractor;

#[async_trait]
impl ResumeExtractor for PdfResumeExtractor {
    async fn extract_text(&self, file: &Bytes) -> Result<String, ExtractError> {
        let bytes = file.clone();
        let raw = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await?
            .map_err(|e| ExtractError::Pdf(e.to_string()))?;

        let text = normalize_whitespace(&raw);
        if text.is_empty() {
            return Err(ExtractError::Empty);
        }

        debug!("Extracted {} characters of resume text", text.len());
        Ok(text)
    }
}

/// Collapses runs of whitespace (PDF layout breaks) into single spaces.
fn normalize_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
