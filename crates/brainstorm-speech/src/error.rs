//! Error types for speech input and output.

use brainstorm_core::error::BrainstormError;

/// Errors from the speech services and their host capabilities.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("speech recognition is not available")]
    RecognitionUnavailable,
    #[error("speech recognition failed: {0}")]
    RecognitionFailed(String),
    #[error("speech synthesis is not available")]
    SynthesisUnavailable,
    #[error("remote synthesis failed: {0}")]
    RemoteSynthesisFailed(String),
    #[error("local synthesis failed: {0}")]
    LocalSynthesisFailed(String),
    #[error("playback failed: {0}")]
    PlaybackFailed(String),
    #[error("process error: {0}")]
    Process(String),
}

impl From<SpeechError> for BrainstormError {
    fn from(err: SpeechError) -> Self {
        BrainstormError::Speech(err.to_string())
    }
}
