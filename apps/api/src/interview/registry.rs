//! In-process registry of live interviews for the HTTP host.
//!
//! Each session is driven by its own tokio task that owns the `SessionHandle`.
//! Handlers never touch the session directly: they read snapshots from a watch
//! channel and talk to the driver through the answer channel and the
//! cancellation token.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch, RwLock};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::interview::answer_source::{answer_channel, AnswerChannel, AnswerRejected};
use crate::interview::events::{events_between, InterviewEvent};
use crate::interview::orchestrator::{
    RoundOutcome, SessionOrchestrator, SessionSnapshot, SummaryRequestError,
};
use crate::interview::session::SessionConfig;
use crate::interview::speech::SpeechOutput;
use crate::interview::summary::FinalSummary;
use crate::llm_client::LanguageModel;

/// Snapshot plus the host-only bits.
#[derive(Debug, Clone, Serialize)]
pub struct InterviewView {
    pub id: Uuid,
    pub pending_question: Option<String>,
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
}

struct LiveSession {
    orchestrator: Arc<SessionOrchestrator>,
    snapshots: watch::Receiver<SessionSnapshot>,
    answers: AnswerChannel,
    cancel: CancellationToken,
}

impl LiveSession {
    fn view(&self, id: Uuid) -> InterviewView {
        InterviewView {
            id,
            pending_question: self.answers.pending_question(),
            snapshot: self.snapshots.borrow().clone(),
        }
    }

    /// Cancels and waits for the driver to publish the terminal snapshot.
    async fn stop(&self, id: Uuid) -> InterviewView {
        self.cancel.cancel();
        let mut snapshots = self.snapshots.clone();
        let _ = snapshots.wait_for(|s| s.status.is_terminal()).await;
        self.view(id)
    }
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<LiveSession>>>>,
}

impl SessionRegistry {
    /// Starts a session and spawns its driver. Returns the initial view, which is
    /// already `failed` when the resume text is empty.
    pub async fn start(
        &self,
        llm: Arc<dyn LanguageModel>,
        speech: Arc<dyn SpeechOutput>,
        resume_text: &str,
        config: SessionConfig,
    ) -> InterviewView {
        let id = Uuid::new_v4();
        let (source, channel) = answer_channel();
        let source = Arc::new(source);

        let orchestrator =
            Arc::new(SessionOrchestrator::new(llm, source.clone()).with_speech(speech));
        let mut handle = orchestrator.start_session(resume_text, config);
        let cancel = handle.cancellation_token();
        let (snapshot_tx, snapshot_rx) = watch::channel(handle.snapshot());

        let live = Arc::new(LiveSession {
            orchestrator: orchestrator.clone(),
            snapshots: snapshot_rx,
            answers: channel,
            cancel,
        });
        self.sessions.write().await.insert(id, live.clone());

        if !handle.status().is_terminal() {
            let driver = async move {
                loop {
                    let outcome = orchestrator.advance_round(&mut handle).await;
                    if let RoundOutcome::Ended(ended) = outcome {
                        // No question stays published once the session is over.
                        source.clear_pending();
                        snapshot_tx.send_replace(handle.snapshot());
                        info!(
                            "Interview driver finished: {:?} after {} rounds",
                            ended.status,
                            handle.rounds_used()
                        );
                        break;
                    }
                    snapshot_tx.send_replace(handle.snapshot());
                }
            };
            tokio::spawn(driver.instrument(info_span!("interview", %id)));
        }

        live.view(id)
    }

    pub async fn get(&self, id: Uuid) -> Option<InterviewView> {
        let sessions = self.sessions.read().await;
        sessions.get(&id).map(|live| live.view(id))
    }

    /// All sessions in this process, newest first.
    pub async fn list(&self) -> Vec<InterviewView> {
        let sessions = self.sessions.read().await;
        let mut views: Vec<InterviewView> = sessions
            .iter()
            .map(|(id, live)| live.view(*id))
            .collect();
        views.sort_by(|a, b| b.snapshot.started_at.cmp(&a.snapshot.started_at));
        views
    }

    pub async fn submit_answer(&self, id: Uuid, answer: String) -> Option<Result<(), AnswerRejected>> {
        let live = self.live(id).await?;
        if live.snapshots.borrow().status.is_terminal() {
            return Some(Err(AnswerRejected::Closed));
        }
        Some(live.answers.submit(answer))
    }

    /// Fires the session's cancellation token. Returns `None` for unknown ids.
    pub async fn cancel(&self, id: Uuid) -> Option<InterviewView> {
        let live = self.live(id).await?;
        Some(live.stop(id).await)
    }

    /// Stops the session if it is still running and forgets it. The final view is
    /// returned; later lookups of `id` find nothing.
    pub async fn remove(&self, id: Uuid) -> Option<InterviewView> {
        let live = self.live(id).await?;
        let view = live.stop(id).await;
        self.sessions.write().await.remove(&id);
        info!(%id, "Interview removed");
        Some(view)
    }

    /// Streams progress events until the session ends. A session that has already
    /// ended yields a single `Ended` event.
    pub async fn events(&self, id: Uuid) -> Option<ReceiverStream<InterviewEvent>> {
        let live = self.live(id).await?;
        let mut snapshots = live.snapshots.clone();
        let mut pending = live.answers.watch_pending();
        let (tx, rx) = mpsc::channel(16);

        let forward = async move {
            let mut seen = snapshots.borrow_and_update().clone();
            if seen.status.is_terminal() {
                let _ = tx.send(InterviewEvent::ended(&seen)).await;
                return;
            }
            let current = pending.borrow_and_update().clone();
            if let Some(question) = current {
                if tx.send(InterviewEvent::question(&seen, question)).await.is_err() {
                    return;
                }
            }

            loop {
                // Snapshots first: a round's snapshot is always published before the
                // next round's question.
                tokio::select! {
                    biased;
                    changed = snapshots.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let next = snapshots.borrow_and_update().clone();
                        for event in events_between(&seen, &next) {
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                        seen = next;
                        if seen.status.is_terminal() {
                            break;
                        }
                    }
                    changed = pending.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let current = pending.borrow_and_update().clone();
                        if let Some(question) = current {
                            if tx.send(InterviewEvent::question(&seen, question)).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
            debug!("Event stream closed");
        };
        tokio::spawn(forward.instrument(info_span!("interview_events", %id)));

        Some(ReceiverStream::new(rx))
    }

    pub async fn summary(
        &self,
        id: Uuid,
    ) -> Option<Result<FinalSummary, SummaryRequestError>> {
        let live = self.live(id).await?;
        let snapshot = live.snapshots.borrow().clone();
        Some(
            live.orchestrator
                .summary_for(snapshot.status, &snapshot.transcript)
                .await,
        )
    }

    async fn live(&self, id: Uuid) -> Option<Arc<LiveSession>> {
        self.sessions.read().await.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::interview::session::SessionStatus;
    use crate::interview::speech::TranscriptSpeech;
    use crate::interview::summary::SummaryError;
    use crate::llm_client::testing::ScriptedModel;

    async fn wait_for_pending(registry: &SessionRegistry, id: Uuid) -> String {
        loop {
            let view = registry.get(id).await.unwrap();
            if let Some(question) = view.pending_question {
                return question;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_full_session_over_answer_channel() {
        let model = Arc::new(ScriptedModel::texts(&[
            "What is a primary key?",
            r#"{"feedback": "Correct.", "nextDifficulty": "HARDER"}"#,
            r#"{"strengths": "SQL", "weaknesses": "None", "suggestions": "Keep going"}"#,
        ]));
        let registry = SessionRegistry::default();
        let view = registry
            .start(
                model,
                Arc::new(TranscriptSpeech),
                "Skills: SQL",
                SessionConfig {
                    question_budget: 1,
                    ..SessionConfig::default()
                },
            )
            .await;

        let question = wait_for_pending(&registry, view.id).await;
        assert_eq!(question, "What is a primary key?");

        registry
            .submit_answer(view.id, "Unique row id".to_string())
            .await
            .unwrap()
            .unwrap();

        let done = loop {
            let view = registry.get(view.id).await.unwrap();
            if view.snapshot.status.is_terminal() {
                break view;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        assert_eq!(done.snapshot.status, SessionStatus::Completed);
        assert_eq!(done.snapshot.transcript.len(), 1);
        assert_eq!(done.pending_question, None);

        let summary = registry.summary(view.id).await.unwrap().unwrap();
        assert_eq!(summary.strengths, "SQL");
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_answer() {
        let model = Arc::new(ScriptedModel::texts(&["What is a goroutine?"]));
        let registry = SessionRegistry::default();
        let view = registry
            .start(
                model,
                Arc::new(TranscriptSpeech),
                "Skills: Go",
                SessionConfig::default(),
            )
            .await;
        wait_for_pending(&registry, view.id).await;

        let cancelled = registry.cancel(view.id).await.unwrap();

        assert_eq!(cancelled.snapshot.status, SessionStatus::Cancelled);
        assert!(cancelled.snapshot.transcript.is_empty());
        assert_eq!(cancelled.pending_question, None);
        assert_eq!(
            registry.submit_answer(view.id, "late".to_string()).await,
            Some(Err(AnswerRejected::Closed))
        );
        assert!(matches!(
            registry.summary(view.id).await,
            Some(Err(SummaryRequestError::Summary(SummaryError::EmptyTranscript)))
        ));
    }

    #[tokio::test]
    async fn test_empty_resume_starts_failed_without_driver() {
        let model = Arc::new(ScriptedModel::texts(&["Q?"]));
        let registry = SessionRegistry::default();
        let view = registry
            .start(
                model.clone(),
                Arc::new(TranscriptSpeech),
                "",
                SessionConfig::default(),
            )
            .await;

        assert_eq!(view.snapshot.status, SessionStatus::Failed);
        assert_eq!(model.call_count(), 0);
        assert_eq!(registry.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_id_is_none() {
        let registry = SessionRegistry::default();
        assert!(registry.get(Uuid::new_v4()).await.is_none());
        assert!(registry.cancel(Uuid::new_v4()).await.is_none());
        assert!(registry.remove(Uuid::new_v4()).await.is_none());
        assert!(registry.events(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_stops_and_forgets_running_session() {
        let model = Arc::new(ScriptedModel::texts(&["What is an arena allocator?"]));
        let registry = SessionRegistry::default();
        let view = registry
            .start(
                model,
                Arc::new(TranscriptSpeech),
                "Skills: Zig",
                SessionConfig::default(),
            )
            .await;
        wait_for_pending(&registry, view.id).await;

        let removed = registry.remove(view.id).await.unwrap();

        assert_eq!(removed.snapshot.status, SessionStatus::Cancelled);
        assert!(registry.get(view.id).await.is_none());
        assert!(registry.list().await.is_empty());
        assert_eq!(registry.submit_answer(view.id, "late".to_string()).await, None);
    }

    #[tokio::test]
    async fn test_events_follow_a_session_to_its_end() {
        use tokio_stream::StreamExt;

        let model = Arc::new(ScriptedModel::texts(&[
            "What is a semaphore?",
            r#"{"feedback": "Good.", "nextDifficulty": "HARDER"}"#,
        ]));
        let registry = SessionRegistry::default();
        let view = registry
            .start(
                model,
                Arc::new(TranscriptSpeech),
                "Skills: OS",
                SessionConfig {
                    question_budget: 1,
                    ..SessionConfig::default()
                },
            )
            .await;
        let mut events = registry.events(view.id).await.unwrap();

        let first = events.next().await.unwrap();
        assert!(matches!(
            &first,
            InterviewEvent::Question { round: 1, question, .. } if question == "What is a semaphore?"
        ));

        registry
            .submit_answer(view.id, "A counter guarding access".to_string())
            .await
            .unwrap()
            .unwrap();

        let rest: Vec<InterviewEvent> = events.collect().await;
        let names: Vec<&str> = rest.iter().map(InterviewEvent::name).collect();
        assert_eq!(names, vec!["round", "ended"]);
        assert!(matches!(
            &rest[0],
            InterviewEvent::Round { entry, .. } if entry.next_difficulty == Some(crate::interview::difficulty::DifficultyLevel::Hard)
        ));
        assert!(matches!(
            rest[1],
            InterviewEvent::Ended { status: SessionStatus::Completed, answered: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_events_of_finished_session_only_end() {
        use tokio_stream::StreamExt;

        let model = Arc::new(ScriptedModel::texts(&["Q?"]));
        let registry = SessionRegistry::default();
        let view = registry
            .start(model, Arc::new(TranscriptSpeech), "", SessionConfig::default())
            .await;

        let events: Vec<InterviewEvent> = registry.events(view.id).await.unwrap().collect().await;

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            InterviewEvent::Ended { status: SessionStatus::Failed, .. }
        ));
    }
}
