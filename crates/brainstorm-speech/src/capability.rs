//! Host capability seams used by the speech services.
//!
//! Each trait stands for one thing the host environment may or may not offer:
//! remote synthesis, audio playback, a local voice, and one-shot recognition.

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::SpeechError;

/// Outcome reported by a playback once it ends on its own: `Ok(())` when the
/// audio finished naturally, `Err(reason)` when playback itself failed.
pub type PlaybackResult = Result<(), String>;

/// Stops an in-flight playback. Must be safe to call more than once.
pub trait PlaybackControl: Send + Sync {
    fn stop(&self);
}

/// A started playback: a completion signal plus a way to silence it.
pub struct PlaybackHandle {
    finished: oneshot::Receiver<PlaybackResult>,
    control: Box<dyn PlaybackControl>,
}

impl PlaybackHandle {
    pub fn new(
        finished: oneshot::Receiver<PlaybackResult>,
        control: impl PlaybackControl + 'static,
    ) -> Self {
        Self {
            finished,
            control: Box::new(control),
        }
    }

    pub(crate) fn into_parts(
        self,
    ) -> (oneshot::Receiver<PlaybackResult>, Box<dyn PlaybackControl>) {
        (self.finished, self.control)
    }
}

impl std::fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackHandle").finish_non_exhaustive()
    }
}

/// Parameters for one remote synthesis call.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: String,
    /// Voice stability in [0, 1].
    pub stability: f32,
    /// Similarity boost in [0, 1].
    pub similarity_boost: f32,
}

/// Parameters for the local voice.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVoiceParams {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub language: String,
}

impl Default for LocalVoiceParams {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            language: "en-US".to_string(),
        }
    }
}

/// Primary synthesis path: turns text into an encoded audio payload.
#[async_trait]
pub trait RemoteSynthesizer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Whether the synthesizer has what it needs (credentials, endpoint).
    fn is_configured(&self) -> bool;

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SpeechError>;
}

/// Plays an encoded audio payload.
pub trait AudioPlayer: Send + Sync {
    fn play(&self, audio: Vec<u8>) -> Result<PlaybackHandle, SpeechError>;
}

/// Fallback synthesis path: the host speaks the text itself.
pub trait LocalSynthesizer: Send + Sync {
    fn is_available(&self) -> bool;

    fn speak(&self, text: &str, params: &LocalVoiceParams) -> Result<PlaybackHandle, SpeechError>;
}

/// Single-shot speech recognition.
///
/// A session yields one transcript or one error. Dropping the future aborts
/// the session.
#[async_trait]
pub trait Recognizer: Send + Sync {
    fn is_available(&self) -> bool;

    async fn recognize(&self, language: &str) -> Result<String, SpeechError>;
}
