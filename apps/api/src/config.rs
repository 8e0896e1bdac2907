use std::time::Duration;

use anyhow::{ensure, Context, Result};

use crate::interview::difficulty::DifficultyLevel;
use crate::interview::session::{
    SessionConfig, DEFAULT_ANSWER_TIMEOUT, DEFAULT_MAX_GENERATION_RETRIES,
    DEFAULT_QUESTION_BUDGET, MAX_QUESTION_BUDGET,
};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Defaults for every new interview; a start request may override some of them.
    pub session: SessionConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let session = SessionConfig {
            question_budget: parse_env("QUESTION_BUDGET", DEFAULT_QUESTION_BUDGET)?,
            initial_difficulty: parse_env("INITIAL_DIFFICULTY", DifficultyLevel::Medium)?,
            max_generation_retries: parse_env(
                "MAX_GENERATION_RETRIES",
                DEFAULT_MAX_GENERATION_RETRIES,
            )?,
            answer_timeout: Duration::from_secs(parse_env(
                "ANSWER_TIMEOUT_SECS",
                DEFAULT_ANSWER_TIMEOUT.as_secs(),
            )?),
        };
        validate_session(&session)?;

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            session,
        })
    }
}

/// Rejects interview defaults that would make every session unusable.
fn validate_session(session: &SessionConfig) -> Result<()> {
    ensure!(
        (1..=MAX_QUESTION_BUDGET).contains(&session.question_budget),
        "QUESTION_BUDGET must be between 1 and {MAX_QUESTION_BUDGET}, got {}",
        session.question_budget
    );
    ensure!(
        session.max_generation_retries >= 1,
        "MAX_GENERATION_RETRIES must be at least 1"
    );
    ensure!(
        !session.answer_timeout.is_zero(),
        "ANSWER_TIMEOUT_SECS must be positive"
    );
    Ok(())
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{key} has an invalid value '{raw}'"))
}
