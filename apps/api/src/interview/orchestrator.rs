//! Session Orchestrator — drives one interview round at a time.
//!
//! Round: generate → accept → speak → await answer → evaluate → append → adapt.
//!
//! Every await inside a round races the session's cancellation token. A cancelled
//! round leaves no trace: nothing is appended and its question is withdrawn from
//! the asked set. Each round attempt, answered or skipped, consumes one budget slot,
//! so a session always terminates.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::interview::answer_source::AnswerSource;
use crate::interview::difficulty::{next_level, DifficultyLevel};
use crate::interview::evaluator::{AnswerEvaluator, Evaluation};
use crate::interview::question_generator::QuestionGenerator;
use crate::interview::session::{
    QaEntry, Session, SessionConfig, SessionFault, SessionStatus, NO_ANSWER_SENTINEL,
};
use crate::interview::speech::SpeechOutput;
use crate::interview::summary::{FinalSummary, SummaryAggregator, SummaryError};
use crate::llm_client::LanguageModel;

/// Extra time the round allows past the answer source's own timeout, so the source
/// normally finishes its wait itself.
const ANSWER_GRACE: Duration = Duration::from_secs(1);

/// What a single `advance_round` call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    Answered(QaEntry),
    /// No usable question this round. The budget slot is still spent.
    Skipped { round: u32, reason: String },
    Ended(SessionEnded),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEnded {
    pub status: SessionStatus,
}

#[derive(Debug, Error)]
pub enum SummaryRequestError {
    #[error("summary is only available once the session has completed or been cancelled (status: {0:?})")]
    NotFinished(SessionStatus),

    #[error(transparent)]
    Summary(#[from] SummaryError),
}

/// Serializable view of a session for hosts.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub current_difficulty: DifficultyLevel,
    pub rounds_used: u32,
    pub question_budget: u32,
    pub transcript: Vec<QaEntry>,
    pub fault: Option<SessionFault>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// A running interview. Owned by whoever drives the rounds.
pub struct SessionHandle {
    session: Session,
    config: SessionConfig,
    rounds_used: u32,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    pub fn transcript(&self) -> &[QaEntry] {
        &self.session.transcript
    }

    pub fn rounds_used(&self) -> u32 {
        self.rounds_used
    }

    /// Clone of the token observed at every suspension point.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.session.status,
            current_difficulty: self.session.current_difficulty,
            rounds_used: self.rounds_used,
            question_budget: self.config.question_budget,
            transcript: self.session.transcript.clone(),
            fault: self.session.fault.clone(),
            started_at: self.session.started_at,
            ended_at: self.session.ended_at,
        }
    }
}

pub struct SessionOrchestrator {
    llm: Arc<dyn LanguageModel>,
    evaluator: AnswerEvaluator,
    aggregator: SummaryAggregator,
    answers: Arc<dyn AnswerSource>,
    speech: Option<Arc<dyn SpeechOutput>>,
}

impl SessionOrchestrator {
    pub fn new(llm: Arc<dyn LanguageModel>, answers: Arc<dyn AnswerSource>) -> Self {
        Self {
            evaluator: AnswerEvaluator::new(llm.clone()),
            aggregator: SummaryAggregator::new(llm.clone()),
            llm,
            answers,
            speech: None,
        }
    }

    pub fn with_speech(mut self, speech: Arc<dyn SpeechOutput>) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Creates a session. An empty resume yields a handle that is already `Failed`.
    pub fn start_session(&self, resume_text: &str, config: SessionConfig) -> SessionHandle {
        let mut session = Session::new(resume_text.trim(), config.initial_difficulty);

        if session.resume_text.is_empty() {
            error!("Refusing to start interview: {}", SessionFault::MissingResumeText);
            session.fault = Some(SessionFault::MissingResumeText);
            session.finish(SessionStatus::Failed);
        } else {
            session.status = SessionStatus::Running;
            info!(
                "Interview started: budget={}, initial difficulty={}",
                config.question_budget, config.initial_difficulty
            );
        }

        SessionHandle {
            session,
            config,
            rounds_used: 0,
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancel(handle: &SessionHandle) {
        handle.cancel.cancel();
    }

    /// Runs one round, or reports that the session has ended.
    pub async fn advance_round(&self, handle: &mut SessionHandle) -> RoundOutcome {
        if handle.session.status != SessionStatus::Running {
            return ended(handle);
        }
        if handle.cancel.is_cancelled() {
            return self.cancel_round(handle, None);
        }
        if handle.rounds_used >= handle.config.question_budget {
            handle.session.finish(SessionStatus::Completed);
            return ended(handle);
        }

        let cancel = handle.cancel.clone();
        let round = handle.rounds_used + 1;
        let difficulty = handle.session.current_difficulty;
        info!(
            "Round {}/{} at {} difficulty",
            round, handle.config.question_budget, difficulty
        );

        // 1. Generate
        let generator =
            QuestionGenerator::new(self.llm.clone(), handle.config.max_generation_retries);
        let generated = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = generator.generate(
                &handle.session.resume_text,
                difficulty,
                &handle.session.asked_questions,
            ) => Some(result),
        };
        let question = match generated {
            None => return self.cancel_round(handle, None),
            Some(Ok(question)) => question,
            Some(Err(e)) => {
                warn!("Round {} skipped: {}", round, e);
                self.close_round(handle);
                return RoundOutcome::Skipped {
                    round,
                    reason: e.to_string(),
                };
            }
        };

        // 2. Accept
        handle.session.asked_questions.insert(&question);

        // 3. Speak (best effort)
        if let Some(speech) = &self.speech {
            let spoken = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = speech.speak(&question) => Some(result),
            };
            match spoken {
                None => return self.cancel_round(handle, Some(&question)),
                Some(Err(e)) => warn!("Continuing without speech: {e}"),
                Some(Ok(())) => {}
            }
        }

        // 4. Answer
        let answer_timeout = handle.config.answer_timeout;
        let answer = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = tokio::time::timeout(
                answer_timeout + ANSWER_GRACE,
                self.answers.obtain_answer(&question, answer_timeout),
            ) => Some(result.unwrap_or_default()),
        };
        let Some(answer) = answer else {
            return self.cancel_round(handle, Some(&question));
        };
        let answer = if answer.trim().is_empty() {
            NO_ANSWER_SENTINEL.to_string()
        } else {
            answer.trim().to_string()
        };

        // 5. Evaluate
        let evaluated = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.evaluator.evaluate(&question, &answer) => Some(result),
        };
        let evaluation = match evaluated {
            None => return self.cancel_round(handle, Some(&question)),
            Some(Ok(evaluation)) => evaluation,
            Some(Err(e)) => {
                warn!("Round {} recorded without adaptation: {}", round, e);
                Evaluation::fallback()
            }
        };

        // 6. Append and adapt
        let next_difficulty = next_level(difficulty, evaluation.signal);
        let entry = QaEntry {
            question,
            difficulty,
            answer: Some(answer),
            feedback: Some(evaluation.feedback),
            next_difficulty: Some(next_difficulty),
        };
        handle.session.transcript.push(entry.clone());
        handle.session.current_difficulty = next_difficulty;
        info!(
            "Round {} complete: {:?} → next difficulty {}",
            round, evaluation.signal, next_difficulty
        );

        self.close_round(handle);
        RoundOutcome::Answered(entry)
    }

    /// Summary for a finished session.
    pub async fn get_summary(
        &self,
        handle: &SessionHandle,
    ) -> Result<FinalSummary, SummaryRequestError> {
        self.summary_for(handle.session.status, &handle.session.transcript)
            .await
    }

    /// Same gate as `get_summary`, for hosts that only hold a snapshot.
    pub async fn summary_for(
        &self,
        status: SessionStatus,
        transcript: &[QaEntry],
    ) -> Result<FinalSummary, SummaryRequestError> {
        if !matches!(status, SessionStatus::Completed | SessionStatus::Cancelled) {
            return Err(SummaryRequestError::NotFinished(status));
        }
        Ok(self.aggregator.summarize(transcript).await?)
    }

    fn close_round(&self, handle: &mut SessionHandle) {
        handle.rounds_used += 1;
        if handle.rounds_used >= handle.config.question_budget {
            info!(
                "Interview completed after {} rounds ({} answered)",
                handle.rounds_used,
                handle.session.transcript.len()
            );
            handle.session.finish(SessionStatus::Completed);
        }
    }

    fn cancel_round(&self, handle: &mut SessionHandle, question: Option<&str>) -> RoundOutcome {
        if let Some(question) = question {
            handle.session.asked_questions.remove(question);
        }
        handle.session.finish(SessionStatus::Cancelled);
        info!(
            "Interview cancelled with {} completed rounds",
            handle.session.transcript.len()
        );
        ended(handle)
    }
}

fn ended(handle: &SessionHandle) -> RoundOutcome {
    RoundOutcome::Ended(SessionEnded {
        status: handle.session.status,
    })
}
