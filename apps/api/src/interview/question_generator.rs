//! Question Generator — builds the generation prompt from resume + difficulty + history,
//! calls the model, and rejects anything already asked in this session.
//!
//! The generator never mutates `AskedQuestions`; accepting a question is the
//! orchestrator's job.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::interview::difficulty::DifficultyLevel;
use crate::interview::prompts::{ALREADY_ASKED_INSTRUCTION, QUESTION_PROMPT_TEMPLATE};
use crate::interview::session::AskedQuestions;
use crate::llm_client::prompts::INTERVIEWER_SYSTEM;
use crate::llm_client::{strip_json_fences, LanguageModel, LlmError};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("model returned an empty question")]
    Empty,

    #[error("no unique question after {attempts} attempts")]
    NoUniqueQuestion { attempts: u32 },

    #[error("question generation failed: {0}")]
    GatewayFailure(#[from] LlmError),
}

#[derive(Clone)]
pub struct QuestionGenerator {
    llm: Arc<dyn LanguageModel>,
    max_attempts: u32,
}

impl QuestionGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>, max_attempts: u32) -> Self {
        Self {
            llm,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Asks the model for one new question at `difficulty`.
    ///
    /// Duplicates are retried with an "already asked" instruction until the attempt
    /// bound is reached. Gateway failures and empty output are returned immediately.
    pub async fn generate(
        &self,
        resume_text: &str,
        difficulty: DifficultyLevel,
        asked: &AskedQuestions,
    ) -> Result<String, GenerationError> {
        let base_prompt = build_question_prompt(resume_text, difficulty, asked);
        let mut prompt = base_prompt.clone();

        for attempt in 1..=self.max_attempts {
            let raw = self.llm.send(&prompt, INTERVIEWER_SYSTEM).await?;
            let candidate = clean_question(&raw);

            if candidate.is_empty() {
                return Err(GenerationError::Empty);
            }

            if !asked.contains(&candidate) {
                debug!("Generated {} question on attempt {}", difficulty, attempt);
                return Ok(candidate);
            }

            warn!(
                "Generation attempt {}/{} repeated an asked question: {:?}",
                attempt,
                self.max_attempts,
                candidate.chars().take(60).collect::<String>()
            );
            prompt = format!(
                "{base_prompt}{}",
                ALREADY_ASKED_INSTRUCTION.replace("{question}", &candidate)
            );
        }

        Err(GenerationError::NoUniqueQuestion {
            attempts: self.max_attempts,
        })
    }
}

fn build_question_prompt(
    resume_text: &str,
    difficulty: DifficultyLevel,
    asked: &AskedQuestions,
) -> String {
    let asked_list = if asked.is_empty() {
        "None".to_string()
    } else {
        asked
            .iter()
            .map(|q| format!(" - {q}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    QUESTION_PROMPT_TEMPLATE
        .replace("{difficulty}", difficulty.label())
        .replace("{resume_text}", resume_text)
        .replace("{asked_questions}", &asked_list)
}

/// Strips code fences, surrounding quotes, bold markers and whitespace.
fn clean_question(raw: &str) -> String {
    let text = strip_json_fences(raw);
    text.trim_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '*' | '`'))
        .to_string()
}
