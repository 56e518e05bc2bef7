//! Speech output with a remote primary path and a local fallback.
//!
//! At most one playback is audible at a time. Every `speak` supersedes the
//! previous one, and the superseded call resolves with
//! [`SpeechOutcome::Cancelled`] rather than reporting completion.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use brainstorm_core::config::{FallbackVoiceConfig, SynthesisConfig};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::capability::{
    AudioPlayer, LocalSynthesizer, LocalVoiceParams, PlaybackControl, PlaybackHandle,
    RemoteSynthesizer, SynthesisRequest,
};
use crate::error::SpeechError;

/// Which synthesis path produced a playback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackPath {
    Remote,
    Local,
}

impl std::fmt::Display for PlaybackPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackPath::Remote => write!(f, "remote"),
            PlaybackPath::Local => write!(f, "local"),
        }
    }
}

/// How a `speak` call ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// The utterance played to the end.
    Completed(PlaybackPath),
    /// The utterance was superseded or stopped before it finished.
    Cancelled,
}

impl SpeechOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SpeechOutcome::Completed(_))
    }
}

/// Per-call overrides. Unset fields use the service defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpeakOptions {
    pub voice_id: Option<String>,
    pub stability: Option<f32>,
    pub similarity_boost: Option<f32>,
    pub rate: Option<f32>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
    pub language: Option<String>,
}

/// Default voice parameters for both synthesis paths.
#[derive(Clone, Debug, PartialEq)]
pub struct VoiceDefaults {
    pub voice_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
    pub local: LocalVoiceParams,
}

impl Default for VoiceDefaults {
    fn default() -> Self {
        Self::from_config(&SynthesisConfig::default(), &FallbackVoiceConfig::default())
    }
}

impl VoiceDefaults {
    pub fn from_config(synthesis: &SynthesisConfig, fallback: &FallbackVoiceConfig) -> Self {
        Self {
            voice_id: synthesis.voice_id.clone(),
            stability: synthesis.stability,
            similarity_boost: synthesis.similarity_boost,
            local: LocalVoiceParams {
                rate: fallback.rate,
                pitch: fallback.pitch,
                volume: fallback.volume,
                language: fallback.language.clone(),
            },
        }
    }

    fn request_for(&self, text: &str, options: &SpeakOptions) -> SynthesisRequest {
        SynthesisRequest {
            text: text.to_string(),
            voice_id: options
                .voice_id
                .clone()
                .unwrap_or_else(|| self.voice_id.clone()),
            stability: options.stability.unwrap_or(self.stability).clamp(0.0, 1.0),
            similarity_boost: options
                .similarity_boost
                .unwrap_or(self.similarity_boost)
                .clamp(0.0, 1.0),
        }
    }

    fn local_params_for(&self, options: &SpeakOptions) -> LocalVoiceParams {
        LocalVoiceParams {
            rate: options.rate.unwrap_or(self.local.rate),
            pitch: options.pitch.unwrap_or(self.local.pitch),
            volume: options.volume.unwrap_or(self.local.volume),
            language: options
                .language
                .clone()
                .unwrap_or_else(|| self.local.language.clone()),
        }
    }
}

struct ActivePlayback {
    generation: u64,
    path: PlaybackPath,
    control: Box<dyn PlaybackControl>,
    cancel: oneshot::Sender<()>,
}

impl ActivePlayback {
    fn silence(self) {
        let _ = self.cancel.send(());
        self.control.stop();
    }
}

#[derive(Default)]
struct OutputState {
    generation: u64,
    active: Option<ActivePlayback>,
}

/// Text-to-speech with a single audible utterance at a time.
pub struct SpeechOutputService {
    remote: Option<(Arc<dyn RemoteSynthesizer>, Arc<dyn AudioPlayer>)>,
    local: Option<Arc<dyn LocalSynthesizer>>,
    defaults: VoiceDefaults,
    state: Mutex<OutputState>,
    fallback_count: AtomicU32,
}

impl SpeechOutputService {
    pub fn new(defaults: VoiceDefaults) -> Self {
        Self {
            remote: None,
            local: None,
            defaults,
            state: Mutex::new(OutputState::default()),
            fallback_count: AtomicU32::new(0),
        }
    }

    /// Attach the primary path: a remote synthesizer and a player for its audio.
    pub fn with_remote(
        mut self,
        synthesizer: Arc<dyn RemoteSynthesizer>,
        player: Arc<dyn AudioPlayer>,
    ) -> Self {
        self.remote = Some((synthesizer, player));
        self
    }

    /// Attach the fallback local voice.
    pub fn with_local(mut self, synthesizer: Arc<dyn LocalSynthesizer>) -> Self {
        self.local = Some(synthesizer);
        self
    }

    pub fn defaults(&self) -> &VoiceDefaults {
        &self.defaults
    }

    /// Speak `text`, superseding anything currently playing.
    ///
    /// Resolves when playback finishes or is superseded. Fails with
    /// [`SpeechError::SynthesisUnavailable`] only when neither path can be used.
    pub async fn speak(
        &self,
        text: &str,
        options: &SpeakOptions,
    ) -> Result<SpeechOutcome, SpeechError> {
        let generation = self.supersede();
        debug!(generation, chars = text.chars().count(), "Speak requested");

        let started = self
            .start_remote(text, options, generation)
            .await
            .map(|handle| (handle, PlaybackPath::Remote));

        if self.is_superseded(generation) {
            if let Some((handle, _)) = started {
                let (_, control) = handle.into_parts();
                control.stop();
            }
            return Ok(SpeechOutcome::Cancelled);
        }

        let (handle, path) = match started {
            Some(started) => started,
            None => {
                let handle = self.start_local(text, options)?;
                self.fallback_count.fetch_add(1, Ordering::Relaxed);
                (handle, PlaybackPath::Local)
            }
        };

        self.await_playback(handle, path, generation).await
    }

    /// Speak with the default voice.
    pub async fn say(&self, text: &str) -> Result<SpeechOutcome, SpeechError> {
        self.speak(text, &SpeakOptions::default()).await
    }

    /// Greet the user, by name when known.
    pub async fn welcome_user(&self, name: Option<&str>) -> Result<SpeechOutcome, SpeechError> {
        self.say(&welcome_text(name)).await
    }

    /// Narrate a generated idea.
    pub async fn speak_idea(&self, idea: &str) -> Result<SpeechOutcome, SpeechError> {
        self.say(&format!("Here's an idea: {}", idea)).await
    }

    /// Ask the user a question.
    pub async fn speak_question(&self, question: &str) -> Result<SpeechOutcome, SpeechError> {
        self.say(question).await
    }

    /// Halt any playback immediately. Safe to call when idle and repeatedly.
    pub fn stop(&self) {
        let previous = {
            let mut state = self.lock_state();
            state.generation += 1;
            state.active.take()
        };
        if let Some(active) = previous {
            info!(path = %active.path, "Speech stopped");
            active.silence();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.lock_state().active.is_some()
    }

    /// Path of the playback currently audible, if any.
    pub fn active_path(&self) -> Option<PlaybackPath> {
        self.lock_state().active.as_ref().map(|a| a.path)
    }

    /// How many utterances were spoken through the local fallback.
    pub fn fallback_count(&self) -> u32 {
        self.fallback_count.load(Ordering::Relaxed)
    }

    fn lock_state(&self) -> MutexGuard<'_, OutputState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn supersede(&self) -> u64 {
        let (generation, previous) = {
            let mut state = self.lock_state();
            state.generation += 1;
            (state.generation, state.active.take())
        };
        if let Some(active) = previous {
            debug!(path = %active.path, "Superseding active playback");
            active.silence();
        }
        generation
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.lock_state().generation != generation
    }

    async fn start_remote(
        &self,
        text: &str,
        options: &SpeakOptions,
        generation: u64,
    ) -> Option<PlaybackHandle> {
        let (synthesizer, player) = self.remote.as_ref()?;
        if !synthesizer.is_configured() {
            debug!(synthesizer = synthesizer.name(), "Remote synthesis not configured");
            return None;
        }

        let request = self.defaults.request_for(text, options);
        let audio = match synthesizer.synthesize(&request).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!(synthesizer = synthesizer.name(), error = %e, "Remote synthesis failed, falling back");
                return None;
            }
        };

        if self.is_superseded(generation) {
            return None;
        }

        match player.play(audio) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "Remote audio playback failed to start, falling back");
                None
            }
        }
    }

    fn start_local(&self, text: &str, options: &SpeakOptions) -> Result<PlaybackHandle, SpeechError> {
        let local = match &self.local {
            Some(local) if local.is_available() => local,
            _ => return Err(SpeechError::SynthesisUnavailable),
        };
        let params = self.defaults.local_params_for(options);
        local.speak(text, &params).map_err(|e| {
            warn!(error = %e, "Local synthesis failed");
            SpeechError::SynthesisUnavailable
        })
    }

    async fn await_playback(
        &self,
        handle: PlaybackHandle,
        path: PlaybackPath,
        generation: u64,
    ) -> Result<SpeechOutcome, SpeechError> {
        let (finished, control) = handle.into_parts();
        let (cancel_tx, cancel_rx) = oneshot::channel();

        {
            let mut state = self.lock_state();
            if state.generation != generation {
                drop(state);
                control.stop();
                return Ok(SpeechOutcome::Cancelled);
            }
            state.active = Some(ActivePlayback {
                generation,
                path,
                control,
                cancel: cancel_tx,
            });
        }
        info!(%path, "Speech started");

        let outcome = tokio::select! {
            biased;
            _ = cancel_rx => Ok(SpeechOutcome::Cancelled),
            result = finished => match result {
                Ok(Ok(())) => Ok(SpeechOutcome::Completed(path)),
                Ok(Err(reason)) => Err(SpeechError::PlaybackFailed(reason)),
                Err(_) => Err(SpeechError::PlaybackFailed(
                    "playback ended without reporting".to_string(),
                )),
            },
        };

        {
            let mut state = self.lock_state();
            if state
                .active
                .as_ref()
                .is_some_and(|a| a.generation == generation)
            {
                state.active = None;
            }
        }

        match &outcome {
            Ok(SpeechOutcome::Completed(_)) => debug!(%path, "Speech completed"),
            Ok(SpeechOutcome::Cancelled) => debug!(%path, "Speech cancelled"),
            Err(e) => warn!(%path, error = %e, "Speech playback failed"),
        }
        outcome
    }
}

/// Greeting spoken when a user arrives.
pub fn welcome_text(name: Option<&str>) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!(
            "Welcome {}! I'm your AI brainstorming facilitator. Let's explore ideas together.",
            name
        ),
        None => "Welcome! I'm your AI brainstorming facilitator. Let's explore ideas together."
            .to_string(),
    }
}
