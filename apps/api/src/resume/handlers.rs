//! Axum route handlers for resume upload.

use axum::extract::Multipart;
use axum::Json;
use serde::Serialize;

use crate::errors::AppError;
use crate::resume::extract::extract_pdf_text;

/// Multipart field carrying the PDF.
const RESUME_FIELD: &str = "pdf";

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub text: String,
}

/// POST /api/v1/resumes/extract
///
/// Accepts a multipart upload with a `pdf` field and returns its plain text, ready
/// to be passed as `resume_text` when starting an interview. Nothing is stored.
pub async fn handle_extract(mut multipart: Multipart) -> Result<Json<ExtractResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }
        let pdf = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;
        let text = extract_pdf_text(pdf).await?;
        return Ok(Json(ExtractResponse { text }));
    }

    Err(AppError::Validation(format!(
        "No file uploaded (expected multipart field '{RESUME_FIELD}')"
    )))
}
