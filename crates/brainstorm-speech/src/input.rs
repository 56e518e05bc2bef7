//! One-shot voice input.
//!
//! A listening session yields at most one final transcript. Starting a new
//! session stops the previous one, and a stopped session resolves with
//! [`ListenOutcome::Stopped`] instead of delivering a late transcript.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use brainstorm_core::config::RecognitionConfig;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::capability::Recognizer;
use crate::error::SpeechError;

/// Whether a listening session is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListeningState {
    Idle,
    Listening,
}

impl fmt::Display for ListeningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListeningState::Idle => write!(f, "Idle"),
            ListeningState::Listening => write!(f, "Listening"),
        }
    }
}

/// How a listening session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenOutcome {
    /// The final transcript, trimmed.
    Heard(String),
    /// The session was stopped or superseded before a result arrived.
    Stopped,
}

#[derive(Default)]
struct InputState {
    generation: u64,
    cancel: Option<oneshot::Sender<()>>,
}

/// Ends its session when dropped, including when `listen` is cancelled.
struct SessionGuard<'a> {
    state: &'a Mutex<InputState>,
    generation: u64,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.generation == self.generation {
            state.cancel = None;
        }
    }
}

/// Speech-to-text in single-utterance sessions.
pub struct SpeechInputService {
    recognizer: Option<Arc<dyn Recognizer>>,
    language: String,
    state: Mutex<InputState>,
}

impl SpeechInputService {
    pub fn new(recognizer: Option<Arc<dyn Recognizer>>, language: impl Into<String>) -> Self {
        Self {
            recognizer,
            language: language.into(),
            state: Mutex::new(InputState::default()),
        }
    }

    /// Build from config. Disabled recognition yields a service that reports
    /// itself unavailable.
    pub fn from_config(config: &RecognitionConfig, recognizer: Option<Arc<dyn Recognizer>>) -> Self {
        let recognizer = if config.enabled { recognizer } else { None };
        Self::new(recognizer, config.language.clone())
    }

    /// Whether the host offers recognition at all.
    pub fn is_available(&self) -> bool {
        self.recognizer
            .as_ref()
            .is_some_and(|r| r.is_available())
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn state(&self) -> ListeningState {
        if self.lock_state().cancel.is_some() {
            ListeningState::Listening
        } else {
            ListeningState::Idle
        }
    }

    /// Listen for one utterance.
    ///
    /// Any session already in progress is stopped first. Fails with
    /// [`SpeechError::RecognitionUnavailable`] when the host has no recognizer
    /// and with [`SpeechError::RecognitionFailed`] when the session errors or
    /// hears nothing.
    pub async fn listen(&self) -> Result<ListenOutcome, SpeechError> {
        let recognizer = match &self.recognizer {
            Some(r) if r.is_available() => Arc::clone(r),
            _ => return Err(SpeechError::RecognitionUnavailable),
        };

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let generation = {
            let mut state = self.lock_state();
            if let Some(previous) = state.cancel.take() {
                debug!("Stopping previous listening session");
                let _ = previous.send(());
            }
            state.generation += 1;
            state.cancel = Some(cancel_tx);
            state.generation
        };
        let _session = SessionGuard {
            state: &self.state,
            generation,
        };
        info!(language = %self.language, "Listening started");

        let result = tokio::select! {
            biased;
            _ = cancel_rx => Ok(ListenOutcome::Stopped),
            heard = recognizer.recognize(&self.language) => match heard {
                Ok(text) => {
                    let text = text.trim();
                    if text.is_empty() {
                        Err(SpeechError::RecognitionFailed("no speech detected".to_string()))
                    } else {
                        Ok(ListenOutcome::Heard(text.to_string()))
                    }
                }
                Err(e @ (SpeechError::RecognitionFailed(_) | SpeechError::RecognitionUnavailable)) => {
                    Err(e)
                }
                Err(e) => Err(SpeechError::RecognitionFailed(e.to_string())),
            },
        };

        match &result {
            Ok(ListenOutcome::Heard(text)) => {
                info!(chars = text.chars().count(), "Listening finished")
            }
            Ok(ListenOutcome::Stopped) => debug!("Listening stopped"),
            Err(e) => warn!(error = %e, "Listening failed"),
        }
        result
    }

    /// End the current session without a result. No-op when idle.
    pub fn stop_listening(&self) {
        if let Some(cancel) = self.lock_state().cancel.take() {
            let _ = cancel.send(());
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, InputState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
