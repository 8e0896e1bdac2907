//! Per-round progress events for streaming hosts.
//!
//! Events are derived from consecutive session snapshots plus the pending question,
//! so the orchestrator itself stays unaware of who is listening.

use serde::Serialize;

use crate::interview::difficulty::DifficultyLevel;
use crate::interview::orchestrator::SessionSnapshot;
use crate::interview::session::{QaEntry, SessionStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InterviewEvent {
    /// A question is waiting for the candidate.
    Question {
        round: u32,
        question_budget: u32,
        difficulty: DifficultyLevel,
        question: String,
    },
    /// A round finished with an answer and feedback.
    Round {
        round: u32,
        question_budget: u32,
        entry: QaEntry,
    },
    /// A round ended without a usable question.
    Skipped { round: u32, question_budget: u32 },
    Ended {
        status: SessionStatus,
        rounds_used: u32,
        answered: usize,
    },
}

impl InterviewEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Question { .. } => "question",
            Self::Round { .. } => "round",
            Self::Skipped { .. } => "skipped",
            Self::Ended { .. } => "ended",
        }
    }

    pub fn question(snapshot: &SessionSnapshot, question: String) -> Self {
        Self::Question {
            round: snapshot.rounds_used + 1,
            question_budget: snapshot.question_budget,
            difficulty: snapshot.current_difficulty,
            question,
        }
    }

    pub fn ended(snapshot: &SessionSnapshot) -> Self {
        Self::Ended {
            status: snapshot.status,
            rounds_used: snapshot.rounds_used,
            answered: snapshot.transcript.len(),
        }
    }
}

/// Events implied by moving from `prev` to `next`. A terminal `next` always ends
/// with `Ended`.
pub fn events_between(prev: &SessionSnapshot, next: &SessionSnapshot) -> Vec<InterviewEvent> {
    let mut events = Vec::new();

    let new_entries = next.transcript.get(prev.transcript.len()..).unwrap_or_default();
    let mut round = prev.rounds_used;
    for entry in new_entries {
        round += 1;
        events.push(InterviewEvent::Round {
            round,
            question_budget: next.question_budget,
            entry: entry.clone(),
        });
    }
    while round < next.rounds_used {
        round += 1;
        events.push(InterviewEvent::Skipped {
            round,
            question_budget: next.question_budget,
        });
    }

    if next.status.is_terminal() {
        events.push(InterviewEvent::ended(next));
    }
    events
}
