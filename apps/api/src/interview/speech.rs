//! Speech output seam. Playback failures are logged by the caller and never end a round.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[error("speech output failed: {0}")]
pub struct SpeechError(pub String);

#[async_trait]
pub trait SpeechOutput: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

/// Text-only host: the "spoken" line goes to the log.
pub struct TranscriptSpeech;

#[async_trait]
impl SpeechOutput for TranscriptSpeech {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        info!(target: "interviewer::speech", "{text}");
        Ok(())
    }
}
