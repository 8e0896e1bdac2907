//! Axum route handlers for the Interview API.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use serde::Deserialize;
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::difficulty::DifficultyLevel;
use crate::interview::registry::InterviewView;
use crate::interview::session::{SessionConfig, MAX_QUESTION_BUDGET};
use crate::interview::summary::FinalSummary;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StartInterviewRequest {
    pub resume_text: String,
    pub question_budget: Option<u32>,
    pub initial_difficulty: Option<DifficultyLevel>,
    pub answer_timeout_secs: Option<u64>,
}

impl StartInterviewRequest {
    /// Applies request overrides on top of the service defaults.
    fn session_config(&self, defaults: SessionConfig) -> Result<SessionConfig, AppError> {
        let question_budget = self.question_budget.unwrap_or(defaults.question_budget);
        if question_budget == 0 || question_budget > MAX_QUESTION_BUDGET {
            return Err(AppError::Validation(format!(
                "question_budget must be between 1 and {MAX_QUESTION_BUDGET}"
            )));
        }
        if self.answer_timeout_secs == Some(0) {
            return Err(AppError::Validation(
                "answer_timeout_secs must be positive".to_string(),
            ));
        }

        Ok(SessionConfig {
            question_budget,
            initial_difficulty: self
                .initial_difficulty
                .unwrap_or(defaults.initial_difficulty),
            answer_timeout: self
                .answer_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.answer_timeout),
            ..defaults
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub answer: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/interviews
///
/// Starts an interview and its background driver. Poll the returned id for the
/// pending question.
pub async fn handle_start_interview(
    State(state): State<AppState>,
    Json(request): Json<StartInterviewRequest>,
) -> Result<(StatusCode, Json<InterviewView>), AppError> {
    if request.resume_text.trim().is_empty() {
        return Err(AppError::Validation("resume_text cannot be empty".to_string()));
    }
    let config = request.session_config(state.config.session)?;

    let view = state
        .sessions
        .start(
            state.llm.clone(),
            state.speech.clone(),
            &request.resume_text,
            config,
        )
        .await;

    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/interviews
pub async fn handle_list_interviews(State(state): State<AppState>) -> Json<Vec<InterviewView>> {
    Json(state.sessions.list().await)
}

/// GET /api/v1/interviews/:id
pub async fn handle_get_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InterviewView>, AppError> {
    state
        .sessions
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// POST /api/v1/interviews/:id/answer
///
/// 409 when no question is pending or the session has ended.
pub async fn handle_submit_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitAnswerRequest>,
) -> Result<StatusCode, AppError> {
    state
        .sessions
        .submit_answer(id, request.answer)
        .await
        .ok_or_else(|| not_found(id))??;
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/v1/interviews/:id/cancel
pub async fn handle_cancel_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InterviewView>, AppError> {
    state
        .sessions
        .cancel(id)
        .await
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// DELETE /api/v1/interviews/:id
///
/// Cancels the interview if it is still running and discards it.
pub async fn handle_delete_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .sessions
        .remove(id)
        .await
        .ok_or_else(|| not_found(id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/interviews/:id/events
///
/// Server-sent events: `question`, `round`, `skipped` and a final `ended`, after
/// which the stream closes.
pub async fn handle_interview_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let events = state
        .sessions
        .events(id)
        .await
        .ok_or_else(|| not_found(id))?;
    let stream = events.map(|event| Event::default().event(event.name()).json_data(&event));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// GET /api/v1/interviews/:id/summary
///
/// 409 while the interview is still running, 422 when no round was completed.
pub async fn handle_get_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FinalSummary>, AppError> {
    let summary = state
        .sessions
        .summary(id)
        .await
        .ok_or_else(|| not_found(id))??;
    Ok(Json(summary))
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Interview {id} not found"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::interview::registry::SessionRegistry;
    use crate::interview::speech::TranscriptSpeech;
    use crate::llm_client::testing::ScriptedModel;
    use crate::routes::build_router;

    fn test_state(model: ScriptedModel) -> AppState {
        AppState {
            llm: Arc::new(model),
            speech: Arc::new(TranscriptSpeech),
            sessions: SessionRegistry::default(),
            config: Config {
                anthropic_api_key: "test-key".to_string(),
                port: 0,
                rust_log: "info".to_string(),
                session: SessionConfig::default(),
            },
        }
    }

    async fn send(
        state: &AppState,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or(Body::empty(), |b| Body::from(b.to_string())))
            .unwrap();
        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[test]
    fn test_request_overrides_defaults() {
        let request = StartInterviewRequest {
            resume_text: "Skills: Rust".to_string(),
            question_budget: Some(3),
            initial_difficulty: Some(DifficultyLevel::Easy),
            answer_timeout_secs: Some(30),
        };
        let config = request.session_config(SessionConfig::default()).unwrap();
        assert_eq!(config.question_budget, 3);
        assert_eq!(config.initial_difficulty, DifficultyLevel::Easy);
        assert_eq!(config.answer_timeout, Duration::from_secs(30));
        assert_eq!(config.max_generation_retries, 5);
    }

    #[test]
    fn test_zero_budget_is_rejected() {
        let request = StartInterviewRequest {
            resume_text: "Skills: Rust".to_string(),
            question_budget: Some(0),
            initial_difficulty: None,
            answer_timeout_secs: None,
        };
        assert!(matches!(
            request.session_config(SessionConfig::default()),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_start_with_empty_resume_is_bad_request() {
        let state = test_state(ScriptedModel::texts(&["Q?"]));
        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/interviews",
            Some(json!({"resume_text": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_start_answer_and_summary_flow() {
        let state = test_state(ScriptedModel::texts(&[
            "What is a primary key?",
            r#"{"feedback": "Good.", "nextDifficulty": "SAME"}"#,
            r#"{"strengths": "SQL", "weaknesses": "Depth", "suggestions": "Practice"}"#,
        ]));

        let (status, started) = send(
            &state,
            "POST",
            "/api/v1/interviews",
            Some(json!({"resume_text": "Skills: Python, SQL", "question_budget": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(started["status"], "running");
        assert_eq!(started["question_budget"], 1);
        let id = started["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &state,
            "GET",
            &format!("/api/v1/interviews/{id}/summary"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let pending = loop {
            let (_, view) = send(&state, "GET", &format!("/api/v1/interviews/{id}"), None).await;
            if let Some(q) = view["pending_question"].as_str() {
                break q.to_string();
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        };
        assert_eq!(pending, "What is a primary key?");

        let (status, _) = send(
            &state,
            "POST",
            &format!("/api/v1/interviews/{id}/answer"),
            Some(json!({"answer": "A unique identifier"})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let finished = loop {
            let (_, view) = send(&state, "GET", &format!("/api/v1/interviews/{id}"), None).await;
            if view["status"] == "completed" {
                break view;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        };
        assert_eq!(finished["transcript"][0]["answer"], "A unique identifier");
        assert_eq!(finished["transcript"][0]["next_difficulty"], "medium");

        let (status, summary) = send(
            &state,
            "GET",
            &format!("/api/v1/interviews/{id}/summary"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["strengths"], "SQL");
    }

    #[tokio::test]
    async fn test_cancel_then_summary_is_unprocessable() {
        let state = test_state(ScriptedModel::texts(&["What is a thread?"]));
        let (_, started) = send(
            &state,
            "POST",
            "/api/v1/interviews",
            Some(json!({"resume_text": "Skills: C++"})),
        )
        .await;
        let id = started["id"].as_str().unwrap().to_string();

        let (status, cancelled) = send(
            &state,
            "POST",
            &format!("/api/v1/interviews/{id}/cancel"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cancelled["status"], "cancelled");

        let (status, body) = send(
            &state,
            "GET",
            &format!("/api/v1/interviews/{id}/summary"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "UNPROCESSABLE_ENTITY");
    }

    #[tokio::test]
    async fn test_answer_without_pending_question_conflicts() {
        let state = test_state(ScriptedModel::texts(&["What is a thread?"]));
        let (_, started) = send(
            &state,
            "POST",
            "/api/v1/interviews",
            Some(json!({"resume_text": "Skills: C++"})),
        )
        .await;
        let id = started["id"].as_str().unwrap().to_string();
        send(&state, "POST", &format!("/api/v1/interviews/{id}/cancel"), None).await;

        let (status, _) = send(
            &state,
            "POST",
            &format!("/api/v1/interviews/{id}/answer"),
            Some(json!({"answer": "late"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_delete_discards_interview() {
        let state = test_state(ScriptedModel::texts(&["What is a mutex?"]));
        let (_, started) = send(
            &state,
            "POST",
            "/api/v1/interviews",
            Some(json!({"resume_text": "Skills: Go"})),
        )
        .await;
        let id = started["id"].as_str().unwrap().to_string();

        let (status, _) = send(&state, "DELETE", &format!("/api/v1/interviews/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&state, "GET", &format!("/api/v1/interviews/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&state, "DELETE", &format!("/api/v1/interviews/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_events_stream_reports_rounds_until_the_end() {
        let state = test_state(ScriptedModel::texts(&[
            "What is a deadlock?",
            r#"{"feedback": "Clear.", "nextDifficulty": "SAME"}"#,
        ]));
        let (_, started) = send(
            &state,
            "POST",
            "/api/v1/interviews",
            Some(json!({"resume_text": "Skills: Java", "question_budget": 1})),
        )
        .await;
        let id: Uuid = started["id"].as_str().unwrap().parse().unwrap();

        let request = Request::builder()
            .uri(format!("/api/v1/interviews/{id}/events"))
            .body(Body::empty())
            .unwrap();
        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/event-stream");

        let sessions = state.sessions.clone();
        tokio::spawn(async move {
            loop {
                let view = sessions.get(id).await.unwrap();
                if view.pending_question.is_some() {
                    sessions
                        .submit_answer(id, "Two threads waiting on each other".to_string())
                        .await
                        .unwrap()
                        .unwrap();
                    return;
                }
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        });

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        let names: Vec<&str> = body
            .lines()
            .filter_map(|line| line.strip_prefix("event:"))
            .map(str::trim)
            .collect();
        assert_eq!(names, vec!["question", "round", "ended"]);
        assert!(body.contains("What is a deadlock?"));
        assert!(body.contains(r#""status":"completed""#));
    }

    #[tokio::test]
    async fn test_unknown_interview_is_not_found() {
        let state = test_state(ScriptedModel::texts(&["Q?"]));
        let (status, _) = send(
            &state,
            "GET",
            &format!("/api/v1/interviews/{}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
