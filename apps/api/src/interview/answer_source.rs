//! Where a round's answer comes from.
//!
//! A source always yields a string. An empty string means "no answer"; the
//! orchestrator swaps it for the sentinel text.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::info;

#[async_trait]
pub trait AnswerSource: Send + Sync {
    /// Delivers `question` and waits at most `timeout` for the answer.
    async fn obtain_answer(&self, question: &str, timeout: Duration) -> String;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnswerRejected {
    #[error("no question is awaiting an answer")]
    NoPendingQuestion,

    #[error("an answer for the pending question was already submitted")]
    AlreadySubmitted,

    #[error("the session is no longer accepting answers")]
    Closed,
}

/// Answer source fed by the HTTP host. The pending question is published on a
/// watch channel; answers arrive on a bounded mpsc channel.
pub struct ChannelAnswerSource {
    pending: watch::Sender<Option<String>>,
    answers: Mutex<mpsc::Receiver<String>>,
}

/// Host-side end of a `ChannelAnswerSource`.
#[derive(Clone)]
pub struct AnswerChannel {
    pending: watch::Receiver<Option<String>>,
    answers: mpsc::Sender<String>,
}

pub fn answer_channel() -> (ChannelAnswerSource, AnswerChannel) {
    let (pending_tx, pending_rx) = watch::channel(None);
    let (answer_tx, answer_rx) = mpsc::channel(1);
    (
        ChannelAnswerSource {
            pending: pending_tx,
            answers: Mutex::new(answer_rx),
        },
        AnswerChannel {
            pending: pending_rx,
            answers: answer_tx,
        },
    )
}

/// Withdraws the published question when the wait ends, including when the
/// waiting future is dropped by an outer timeout or cancellation.
struct PendingGuard<'a>(&'a watch::Sender<Option<String>>);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(None);
    }
}

impl ChannelAnswerSource {
    /// Drops the pending question, e.g. after the round was cancelled mid-wait.
    pub fn clear_pending(&self) {
        self.pending.send_replace(None);
    }
}

#[async_trait]
impl AnswerSource for ChannelAnswerSource {
    async fn obtain_answer(&self, question: &str, timeout: Duration) -> String {
        let mut answers = self.answers.lock().await;
        // Anything queued before this question was published is stale.
        while answers.try_recv().is_ok() {}

        self.pending.send_replace(Some(question.to_string()));
        let _guard = PendingGuard(&self.pending);

        match tokio::time::timeout(timeout, answers.recv()).await {
            Ok(Some(answer)) => answer,
            Ok(None) => String::new(),
            Err(_) => {
                info!("No answer received within {}s", timeout.as_secs());
                String::new()
            }
        }
    }
}

impl AnswerChannel {
    pub fn pending_question(&self) -> Option<String> {
        self.pending.borrow().clone()
    }

    /// Receiver that observes every question as it is published and withdrawn.
    pub fn watch_pending(&self) -> watch::Receiver<Option<String>> {
        self.pending.clone()
    }

    pub fn submit(&self, answer: String) -> Result<(), AnswerRejected> {
        if self.pending.borrow().is_none() {
            return Err(AnswerRejected::NoPendingQuestion);
        }
        self.answers.try_send(answer).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => AnswerRejected::AlreadySubmitted,
            mpsc::error::TrySendError::Closed(_) => AnswerRejected::Closed,
        })
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Pre-recorded answers, handed out in order. Once they run out the candidate
    /// either says nothing (empty answer) or goes silent and never replies.
    pub struct ScriptedAnswers {
        answers: Mutex<VecDeque<String>>,
        questions: Mutex<Vec<String>>,
        stall_when_empty: bool,
    }

    impl ScriptedAnswers {
        pub fn new(answers: &[&str]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
                questions: Mutex::new(Vec::new()),
                stall_when_empty: false,
            }
        }

        /// Ignores the timeout hint after the script runs out.
        pub fn then_silent(answers: &[&str]) -> Self {
            Self {
                stall_when_empty: true,
                ..Self::new(answers)
            }
        }

        pub fn questions(&self) -> Vec<String> {
            self.questions.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AnswerSource for ScriptedAnswers {
        async fn obtain_answer(&self, question: &str, _timeout: Duration) -> String {
            self.questions.lock().unwrap().push(question.to_string());
            let next = self.answers.lock().unwrap().pop_front();
            match next {
                Some(answer) => answer,
                None if self.stall_when_empty => std::future::pending::<String>().await,
                None => String::new(),
            }
        }
    }
}
