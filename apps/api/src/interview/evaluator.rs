//! Answer Evaluator — asks the model to judge one answer and extracts a feedback
//! sentence plus a relative difficulty signal.
//!
//! The model is asked for JSON but free text is tolerated. A response that cannot be
//! read either way degrades to `(raw text, Same)`; only a gateway failure is an error.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::interview::difficulty::DeltaSignal;
use crate::interview::prompts::EVALUATION_PROMPT_TEMPLATE;
use crate::llm_client::prompts::INTERVIEWER_SYSTEM;
use crate::llm_client::{strip_json_fences, LanguageModel, LlmError};

/// Used when the model gives nothing usable back.
pub const FALLBACK_FEEDBACK: &str = "Could not generate feedback.";

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("answer evaluation failed: {0}")]
    GatewayFailure(#[from] LlmError),

    /// Never fatal. Carries the raw text the degraded evaluation is built from.
    #[error("evaluation response could not be parsed")]
    ParseDegraded(String),
}

/// Which parser branch produced the evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Structured,
    Unstructured,
    Degraded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub feedback: String,
    pub signal: DeltaSignal,
    pub shape: ResponseShape,
}

impl Evaluation {
    /// What the orchestrator records when the evaluator could not be reached.
    pub fn fallback() -> Self {
        Self {
            feedback: FALLBACK_FEEDBACK.to_string(),
            signal: DeltaSignal::Same,
            shape: ResponseShape::Degraded,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StructuredEvaluation {
    feedback: Option<Value>,
    #[serde(rename = "nextDifficulty", alias = "next_difficulty", alias = "decision", alias = "next")]
    next_difficulty: Option<Value>,
}

#[derive(Clone)]
pub struct AnswerEvaluator {
    llm: Arc<dyn LanguageModel>,
}

impl AnswerEvaluator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    pub async fn evaluate(&self, question: &str, answer: &str) -> Result<Evaluation, EvalError> {
        let prompt = EVALUATION_PROMPT_TEMPLATE
            .replace("{question}", question)
            .replace("{answer}", answer)
            .replace("{signals}", &signal_tokens());

        let raw = self.llm.send(&prompt, INTERVIEWER_SYSTEM).await?;
        let evaluation = parse_evaluation(&raw);
        debug!(
            "Evaluation parsed as {:?}: signal={:?}",
            evaluation.shape, evaluation.signal
        );
        Ok(evaluation)
    }
}

fn signal_tokens() -> String {
    DeltaSignal::ALL
        .iter()
        .map(DeltaSignal::token)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Two-branch parser: JSON object first, free text otherwise.
pub fn parse_evaluation(raw: &str) -> Evaluation {
    let text = strip_json_fences(raw);

    if text.starts_with('{') || text.starts_with('[') {
        return match parse_structured(text) {
            Ok(evaluation) => evaluation,
            Err(EvalError::ParseDegraded(raw_text)) => {
                warn!("Evaluation JSON was unusable, degrading to raw text");
                degraded(&raw_text)
            }
            Err(e) => {
                warn!("Unexpected evaluation parse error: {e}");
                degraded(text)
            }
        };
    }

    if text.is_empty() {
        return degraded(text);
    }

    Evaluation {
        feedback: text.to_string(),
        signal: DeltaSignal::from_text(text),
        shape: ResponseShape::Unstructured,
    }
}

fn parse_structured(text: &str) -> Result<Evaluation, EvalError> {
    let degraded_err = || EvalError::ParseDegraded(text.to_string());

    let value: Value = serde_json::from_str(text).map_err(|_| degraded_err())?;
    if !value.is_object() {
        return Err(degraded_err());
    }
    let parsed: StructuredEvaluation = serde_json::from_value(value).map_err(|_| degraded_err())?;

    let feedback = match parsed.feedback {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Null) | Some(Value::String(_)) | None => return Err(degraded_err()),
        Some(other) => other.to_string(),
    };

    let signal = match parsed.next_difficulty {
        Some(Value::String(decision)) => DeltaSignal::from_text(&decision),
        _ => DeltaSignal::from_text(&feedback),
    };

    Ok(Evaluation {
        feedback,
        signal,
        shape: ResponseShape::Structured,
    })
}

fn degraded(raw_text: &str) -> Evaluation {
    let feedback = if raw_text.trim().is_empty() {
        FALLBACK_FEEDBACK.to_string()
    } else {
        raw_text.trim().to_string()
    };
    Evaluation {
        feedback,
        signal: DeltaSignal::Same,
        shape: ResponseShape::Degraded,
    }
}
