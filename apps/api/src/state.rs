use std::sync::Arc;

use crate::config::Config;
use crate::interview::registry::SessionRegistry;
use crate::interview::speech::SpeechOutput;
use crate::llm_client::LanguageModel;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Read-only gateway shared by every session.
    pub llm: Arc<dyn LanguageModel>,
    pub speech: Arc<dyn SpeechOutput>,
    pub sessions: SessionRegistry,
    pub config: Config,
}
