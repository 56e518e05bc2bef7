//! Mock host capabilities.
//!
//! Used for testing and development without audio hardware, network access
//! or a recognizer. Playbacks either finish immediately (`auto_finishing`) or
//! wait until the test finishes them explicitly (`manual`).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::capability::{
    AudioPlayer, LocalSynthesizer, LocalVoiceParams, PlaybackControl, PlaybackHandle,
    PlaybackResult, Recognizer, RemoteSynthesizer, SynthesisRequest,
};
use crate::error::SpeechError;

// =============================================================================
// Playback log
// =============================================================================

struct MockPlayback {
    label: String,
    stopped: Arc<AtomicBool>,
    finish: Option<oneshot::Sender<PlaybackResult>>,
}

struct StopFlag(Arc<AtomicBool>);

impl PlaybackControl for StopFlag {
    fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Shared record of every playback a mock capability started.
#[derive(Clone, Default)]
pub struct MockPlaybackLog {
    entries: Arc<Mutex<Vec<MockPlayback>>>,
    auto_finish: bool,
}

impl MockPlaybackLog {
    fn new(auto_finish: bool) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            auto_finish,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<MockPlayback>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, label: String) -> PlaybackHandle {
        let (tx, rx) = oneshot::channel();
        let stopped = Arc::new(AtomicBool::new(false));
        let finish = if self.auto_finish {
            let _ = tx.send(Ok(()));
            None
        } else {
            Some(tx)
        };
        self.lock().push(MockPlayback {
            label,
            stopped: Arc::clone(&stopped),
            finish,
        });
        PlaybackHandle::new(rx, StopFlag(stopped))
    }

    /// Number of playbacks started so far.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Labels (spoken text or decoded audio) in start order.
    pub fn labels(&self) -> Vec<String> {
        self.lock().iter().map(|p| p.label.clone()).collect()
    }

    /// Whether playback `index` was stopped.
    pub fn is_stopped(&self, index: usize) -> bool {
        self.lock()
            .get(index)
            .map(|p| p.stopped.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Playbacks neither stopped nor finished.
    pub fn active_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|p| !p.stopped.load(Ordering::SeqCst) && p.finish.is_some())
            .count()
    }

    /// Let playback `index` end naturally. Returns false if it already ended.
    pub fn finish(&self, index: usize) -> bool {
        self.settle(index, Ok(()))
    }

    /// Make playback `index` fail with `reason`.
    pub fn fail(&self, index: usize, reason: &str) -> bool {
        self.settle(index, Err(reason.to_string()))
    }

    fn settle(&self, index: usize, result: PlaybackResult) -> bool {
        let sender = self.lock().get_mut(index).and_then(|p| p.finish.take());
        match sender {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }
}

// =============================================================================
// Player
// =============================================================================

/// Mock audio player. Audio payloads are recorded as lossy UTF-8 labels.
#[derive(Clone)]
pub struct MockAudioPlayer {
    log: MockPlaybackLog,
    fail_start: Arc<AtomicBool>,
}

impl MockAudioPlayer {
    pub fn auto_finishing() -> Self {
        Self {
            log: MockPlaybackLog::new(true),
            fail_start: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn manual() -> Self {
        Self {
            log: MockPlaybackLog::new(false),
            fail_start: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn log(&self) -> &MockPlaybackLog {
        &self.log
    }

    /// Make subsequent `play` calls fail before starting.
    pub fn set_fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }
}

impl AudioPlayer for MockAudioPlayer {
    fn play(&self, audio: Vec<u8>) -> Result<PlaybackHandle, SpeechError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(SpeechError::PlaybackFailed("mock player refused".to_string()));
        }
        Ok(self.log.record(String::from_utf8_lossy(&audio).into_owned()))
    }
}

// =============================================================================
// Remote synthesizer
// =============================================================================

/// Mock remote synthesizer. The "audio" it returns is the request text.
#[derive(Default)]
pub struct MockRemoteSynthesizer {
    configured: bool,
    failing: AtomicBool,
    calls: AtomicUsize,
    requests: Mutex<Vec<SynthesisRequest>>,
}

impl MockRemoteSynthesizer {
    pub fn new() -> Self {
        Self {
            configured: true,
            ..Self::default()
        }
    }

    /// A synthesizer that reports itself as lacking credentials.
    pub fn unconfigured() -> Self {
        Self::default()
    }

    /// A synthesizer whose every call fails like a non-success HTTP response.
    pub fn failing() -> Self {
        let synth = Self::new();
        synth.set_failing(true);
        synth
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RemoteSynthesizer for MockRemoteSynthesizer {
    fn name(&self) -> &str {
        "mock-remote"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SpeechError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        tokio::task::yield_now().await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(SpeechError::RemoteSynthesisFailed(
                "HTTP 503 Service Unavailable".to_string(),
            ));
        }
        Ok(request.text.as_bytes().to_vec())
    }
}

// =============================================================================
// Local synthesizer
// =============================================================================

/// Mock local voice.
#[derive(Clone)]
pub struct MockLocalSynthesizer {
    available: bool,
    log: MockPlaybackLog,
    params: Arc<Mutex<Vec<LocalVoiceParams>>>,
}

impl MockLocalSynthesizer {
    pub fn auto_finishing() -> Self {
        Self {
            available: true,
            log: MockPlaybackLog::new(true),
            params: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn manual() -> Self {
        Self {
            log: MockPlaybackLog::new(false),
            ..Self::auto_finishing()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::auto_finishing()
        }
    }

    pub fn log(&self) -> &MockPlaybackLog {
        &self.log
    }

    pub fn params(&self) -> Vec<LocalVoiceParams> {
        self.params
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LocalSynthesizer for MockLocalSynthesizer {
    fn is_available(&self) -> bool {
        self.available
    }

    fn speak(&self, text: &str, params: &LocalVoiceParams) -> Result<PlaybackHandle, SpeechError> {
        if !self.available {
            return Err(SpeechError::LocalSynthesisFailed(
                "mock voice unavailable".to_string(),
            ));
        }
        self.params
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(params.clone());
        Ok(self.log.record(text.to_string()))
    }
}

// =============================================================================
// Recognizer
// =============================================================================

/// Mock recognizer fed from a script.
///
/// Each session pops the next scripted result. With nothing scripted the
/// session waits forever, like a user who never speaks.
#[derive(Default)]
pub struct MockRecognizer {
    available: bool,
    script: Mutex<VecDeque<Result<String, SpeechError>>>,
    sessions: AtomicUsize,
    languages: Mutex<Vec<String>>,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self {
            available: true,
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn push_transcript(&self, text: &str) {
        self.lock_script().push_back(Ok(text.to_string()));
    }

    pub fn push_error(&self, error: SpeechError) {
        self.lock_script().push_back(Err(error));
    }

    pub fn session_count(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    pub fn languages(&self) -> Vec<String> {
        self.languages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, SpeechError>>> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Recognizer for MockRecognizer {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn recognize(&self, language: &str) -> Result<String, SpeechError> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        self.languages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(language.to_string());
        let next = self.lock_script().pop_front();
        match next {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_auto_finishing_player_completes_immediately() {
        let player = MockAudioPlayer::auto_finishing();
        let handle = player.play(b"hello".to_vec()).unwrap();
        let (finished, _control) = handle.into_parts();
        assert_eq!(finished.await.unwrap(), Ok(()));
        assert_eq!(player.log().labels(), vec!["hello".to_string()]);
        assert_eq!(player.log().active_count(), 0);
    }

    #[tokio::test]
    async fn test_manual_player_waits_for_finish() {
        let player = MockAudioPlayer::manual();
        let handle = player.play(b"one".to_vec()).unwrap();
        assert_eq!(player.log().active_count(), 1);

        assert!(player.log().finish(0));
        assert!(!player.log().finish(0));
        let (finished, _control) = handle.into_parts();
        assert_eq!(finished.await.unwrap(), Ok(()));
    }

    #[test]
    fn test_stop_flag_marks_playback_stopped() {
        let player = MockAudioPlayer::manual();
        let handle = player.play(b"x".to_vec()).unwrap();
        let (_finished, control) = handle.into_parts();
        control.stop();
        control.stop();
        assert!(player.log().is_stopped(0));
        assert_eq!(player.log().active_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_remote_failing() {
        let synth = MockRemoteSynthesizer::failing();
        let request = SynthesisRequest {
            text: "hi".to_string(),
            voice_id: "v".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
        };
        assert!(synth.synthesize(&request).await.is_err());
        assert_eq!(synth.call_count(), 1);
        assert_eq!(synth.requests()[0].voice_id, "v");
    }

    #[tokio::test]
    async fn test_mock_recognizer_pops_script_in_order() {
        let recognizer = MockRecognizer::new();
        recognizer.push_transcript("first");
        recognizer.push_error(SpeechError::RecognitionFailed("no-speech".to_string()));

        assert_eq!(recognizer.recognize("en-US").await.unwrap(), "first");
        assert!(recognizer.recognize("en-US").await.is_err());
        assert_eq!(recognizer.session_count(), 2);
    }
}
