use anyhow::anyhow;
use bytes::Bytes;
use tracing::info;

use crate::errors::AppError;

/// Extracts and tidies the text layer of a PDF. Runs on the blocking pool.
pub async fn extract_pdf_text(pdf: Bytes) -> Result<String, AppError> {
    let size = pdf.len();
    let raw = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf))
        .await
        .map_err(|e| AppError::Internal(anyhow!("PDF extraction task failed: {e}")))?
        .map_err(|e| AppError::UnprocessableEntity(format!("Could not read PDF: {e}")))?;

    let text = normalize_resume_text(&raw);
    info!("Extracted {} chars of resume text from {} byte PDF", text.len(), size);

    if text.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "PDF has no extractable text layer".to_string(),
        ));
    }
    Ok(text)
}

/// Collapses runs of spaces inside lines and keeps at most one blank line between blocks.
pub fn normalize_resume_text(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in raw.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}
