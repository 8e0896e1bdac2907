//! The per-interview state owned and mutated by the orchestrator.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interview::difficulty::DifficultyLevel;

pub const DEFAULT_QUESTION_BUDGET: u32 = 5;
pub const DEFAULT_MAX_GENERATION_RETRIES: u32 = 5;
pub const DEFAULT_ANSWER_TIMEOUT: Duration = Duration::from_secs(120);
/// Upper bound on the questions a single interview may ask.
pub const MAX_QUESTION_BUDGET: u32 = 20;

/// Recorded in place of an answer when the candidate says nothing before the timeout.
pub const NO_ANSWER_SENTINEL: &str = "No answer provided";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// Preconditions that stop a session before its first round.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionFault {
    #[error("resume text is missing or empty")]
    MissingResumeText,
}

/// Per-session knobs. Defaults come from the service config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub question_budget: u32,
    pub initial_difficulty: DifficultyLevel,
    /// Total generation attempts per round before giving up on a unique question.
    pub max_generation_retries: u32,
    pub answer_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            question_budget: DEFAULT_QUESTION_BUDGET,
            initial_difficulty: DifficultyLevel::Medium,
            max_generation_retries: DEFAULT_MAX_GENERATION_RETRIES,
            answer_timeout: DEFAULT_ANSWER_TIMEOUT,
        }
    }
}

/// One completed round. Only appended once fully populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaEntry {
    pub question: String,
    pub difficulty: DifficultyLevel,
    pub answer: Option<String>,
    pub feedback: Option<String>,
    pub next_difficulty: Option<DifficultyLevel>,
}

/// Normalized form used for duplicate detection: lowercase, single spaces,
/// no trailing punctuation.
pub fn normalize_question(question: &str) -> String {
    question
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .to_lowercase()
}

/// Questions accepted so far, in the order they were asked.
#[derive(Debug, Clone, Default)]
pub struct AskedQuestions {
    ordered: Vec<String>,
    normalized: HashSet<String>,
}

impl AskedQuestions {
    pub fn contains(&self, question: &str) -> bool {
        self.normalized.contains(&normalize_question(question))
    }

    /// Returns false when an equivalent question is already present.
    pub fn insert(&mut self, question: &str) -> bool {
        if !self.normalized.insert(normalize_question(question)) {
            return false;
        }
        self.ordered.push(question.to_string());
        true
    }

    pub fn remove(&mut self, question: &str) {
        let key = normalize_question(question);
        if self.normalized.remove(&key) {
            self.ordered.retain(|q| normalize_question(q) != key);
        }
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub resume_text: String,
    pub transcript: Vec<QaEntry>,
    pub current_difficulty: DifficultyLevel,
    pub asked_questions: AskedQuestions,
    pub status: SessionStatus,
    pub fault: Option<SessionFault>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(resume_text: impl Into<String>, initial_difficulty: DifficultyLevel) -> Self {
        Self {
            resume_text: resume_text.into(),
            transcript: Vec::new(),
            current_difficulty: initial_difficulty,
            asked_questions: AskedQuestions::default(),
            status: SessionStatus::Idle,
            fault: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Moves the session into a terminal status and stamps the end time once.
    pub fn finish(&mut self, status: SessionStatus) {
        debug_assert!(status.is_terminal());
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        self.ended_at = Some(Utc::now());
    }
}
