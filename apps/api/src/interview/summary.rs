//! Final-Summary Aggregator — one model call over the whole transcript.
//!
//! The public contract always yields three strings. Gateway and parse failures fall
//! back to a fixed generic summary; only an empty transcript is an error.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::interview::prompts::SUMMARY_PROMPT_TEMPLATE;
use crate::interview::session::{QaEntry, NO_ANSWER_SENTINEL};
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{strip_json_fences, LanguageModel, LlmError};

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("cannot summarize an empty transcript")]
    EmptyTranscript,

    /// Absorbed by `summarize`, which returns the fallback instead.
    #[error("summary generation failed: {0}")]
    GatewayFailure(#[from] LlmError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalSummary {
    pub strengths: String,
    pub weaknesses: String,
    pub suggestions: String,
}

impl FinalSummary {
    pub fn fallback() -> Self {
        Self {
            strengths: "1. Candidate attempted to answer questions".to_string(),
            weaknesses: "1. Technical depth needs improvement".to_string(),
            suggestions: "1. Review core concepts\n2. Practice explaining technical topics"
                .to_string(),
        }
    }
}

#[derive(Clone)]
pub struct SummaryAggregator {
    llm: Arc<dyn LanguageModel>,
}

impl SummaryAggregator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    pub async fn summarize(&self, transcript: &[QaEntry]) -> Result<FinalSummary, SummaryError> {
        if transcript.is_empty() {
            return Err(SummaryError::EmptyTranscript);
        }

        let prompt = SUMMARY_PROMPT_TEMPLATE.replace("{transcript}", &render_transcript(transcript));

        match self.request(&prompt).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                warn!("Final summary degraded to fallback: {e}");
                Ok(FinalSummary::fallback())
            }
        }
    }

    async fn request(&self, prompt: &str) -> Result<FinalSummary, SummaryError> {
        let raw = self.llm.send(prompt, JSON_ONLY_SYSTEM).await?;
        match normalize_summary(&raw) {
            Some(summary) => Ok(summary),
            None => {
                warn!(
                    "Summary response was not a usable JSON object: {:?}",
                    raw.chars().take(120).collect::<String>()
                );
                Ok(FinalSummary::fallback())
            }
        }
    }
}

fn render_transcript(transcript: &[QaEntry]) -> String {
    transcript
        .iter()
        .map(|entry| {
            format!(
                "Q: {}\nA: {}",
                entry.question,
                entry.answer.as_deref().unwrap_or(NO_ANSWER_SENTINEL)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Parses the model output and coerces every field to a string. Returns `None` when
/// the output is not a JSON object or carries none of the three fields. A missing or
/// blank field takes the matching fallback text.
fn normalize_summary(raw: &str) -> Option<FinalSummary> {
    let value: Value = serde_json::from_str(strip_json_fences(raw)).ok()?;
    let object = value.as_object()?;

    if !["strengths", "weaknesses", "suggestions"]
        .iter()
        .any(|key| object.contains_key(*key))
    {
        return None;
    }

    let fallback = FinalSummary::fallback();
    let field = |key: &str, default: String| {
        object
            .get(key)
            .map(stringify_field)
            .filter(|text| !text.trim().is_empty())
            .unwrap_or(default)
    };

    Some(FinalSummary {
        strengths: field("strengths", fallback.strengths),
        weaknesses: field("weaknesses", fallback.weaknesses),
        suggestions: field("suggestions", fallback.suggestions),
    })
}

fn stringify_field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
