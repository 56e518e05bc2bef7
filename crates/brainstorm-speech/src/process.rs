//! Host capabilities backed by external programs.
//!
//! - `CommandPlayer` pipes encoded audio into a player such as `mpg123 -q -`.
//! - `CommandSynthesizer` speaks through an espeak-ng compatible program.
//! - `CommandRecognizer` runs a one-shot recognizer that prints a transcript.

use std::path::Path;
use std::process::Stdio;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use brainstorm_core::config::{FallbackVoiceConfig, RecognitionConfig};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::capability::{
    AudioPlayer, LocalSynthesizer, LocalVoiceParams, PlaybackControl, PlaybackHandle,
    PlaybackResult, Recognizer,
};
use crate::error::SpeechError;

/// Placeholder replaced with the session language in recognizer arguments.
pub const LANGUAGE_PLACEHOLDER: &str = "{language}";

/// Whether `program` resolves to an executable file.
fn is_on_path(program: &str) -> bool {
    if program.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(program).is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

struct KillSwitch(Mutex<Option<oneshot::Sender<()>>>);

impl PlaybackControl for KillSwitch {
    fn stop(&self) {
        let sender = self
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = sender {
            let _ = tx.send(());
        }
    }
}

/// Watch a spawned child and report how it ended.
///
/// Stopping (or dropping) the returned handle's control kills the child.
fn supervise(mut child: Child, program: String, stdin_payload: Option<Vec<u8>>) -> PlaybackHandle {
    let (done_tx, done_rx) = oneshot::channel::<PlaybackResult>();
    let (kill_tx, mut kill_rx) = oneshot::channel::<()>();

    if let (Some(payload), Some(mut stdin)) = (stdin_payload, child.stdin.take()) {
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&payload).await {
                debug!(error = %e, "Audio pipe closed early");
            }
            let _ = stdin.shutdown().await;
        });
    }

    tokio::spawn(async move {
        let waited = tokio::select! {
            biased;
            _ = &mut kill_rx => None,
            status = child.wait() => Some(status),
        };
        let result = match waited {
            None => {
                let _ = child.kill().await;
                debug!(program = %program, "Playback process killed");
                Err("stopped".to_string())
            }
            Some(Ok(status)) if status.success() => Ok(()),
            Some(Ok(status)) => Err(format!("{} exited with {}", program, status)),
            Some(Err(e)) => Err(e.to_string()),
        };
        let _ = done_tx.send(result);
    });

    PlaybackHandle::new(done_rx, KillSwitch(Mutex::new(Some(kill_tx))))
}

// =============================================================================
// Player
// =============================================================================

/// Plays encoded audio by writing it to a player process's stdin.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    /// `command` is the program followed by its arguments. Empty yields `None`.
    pub fn from_command(command: Vec<String>) -> Option<Self> {
        let mut parts = command.into_iter();
        let program = parts.next().filter(|p| !p.trim().is_empty())?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn is_available(&self) -> bool {
        is_on_path(&self.program)
    }
}

impl AudioPlayer for CommandPlayer {
    fn play(&self, audio: Vec<u8>) -> Result<PlaybackHandle, SpeechError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpeechError::PlaybackFailed(format!("{}: {}", self.program, e)))?;
        debug!(program = %self.program, bytes = audio.len(), "Player started");
        Ok(supervise(child, self.program.clone(), Some(audio)))
    }
}

// =============================================================================
// Local synthesizer
// =============================================================================

/// Local voice through an espeak-ng compatible program.
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
}

impl CommandSynthesizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `None` when the fallback voice is disabled or has no program.
    pub fn from_config(config: &FallbackVoiceConfig) -> Option<Self> {
        if !config.enabled || config.command.trim().is_empty() {
            return None;
        }
        Some(Self::new(config.command.trim()))
    }

    /// Arguments for speaking with `params`. The text itself goes to stdin.
    pub fn args(&self, params: &LocalVoiceParams) -> Vec<String> {
        let words_per_minute = (175.0 * params.rate).round().max(1.0) as u32;
        let pitch = (50.0 * params.pitch).round().clamp(0.0, 99.0) as u32;
        let amplitude = (100.0 * params.volume).round().clamp(0.0, 200.0) as u32;
        vec![
            "-s".to_string(),
            words_per_minute.to_string(),
            "-p".to_string(),
            pitch.to_string(),
            "-a".to_string(),
            amplitude.to_string(),
            "-v".to_string(),
            params.language.to_ascii_lowercase(),
            "--stdin".to_string(),
        ]
    }
}

impl LocalSynthesizer for CommandSynthesizer {
    fn is_available(&self) -> bool {
        is_on_path(&self.program)
    }

    fn speak(&self, text: &str, params: &LocalVoiceParams) -> Result<PlaybackHandle, SpeechError> {
        let child = Command::new(&self.program)
            .args(self.args(params))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpeechError::LocalSynthesisFailed(format!("{}: {}", self.program, e)))?;
        debug!(program = %self.program, chars = text.chars().count(), "Local voice started");
        Ok(supervise(child, self.program.clone(), Some(text.as_bytes().to_vec())))
    }
}

// =============================================================================
// Recognizer
// =============================================================================

/// One-shot recognizer process that prints the transcript on stdout.
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandRecognizer {
    pub fn from_command(command: Vec<String>) -> Option<Self> {
        let mut parts = command.into_iter();
        let program = parts.next().filter(|p| !p.trim().is_empty())?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    /// `None` when recognition is disabled or no command is configured.
    pub fn from_config(config: &RecognitionConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        Self::from_command(config.command.clone())
    }

    fn args_for(&self, language: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.replace(LANGUAGE_PLACEHOLDER, language))
            .collect()
    }
}

#[async_trait]
impl Recognizer for CommandRecognizer {
    fn is_available(&self) -> bool {
        is_on_path(&self.program)
    }

    async fn recognize(&self, language: &str) -> Result<String, SpeechError> {
        let output = Command::new(&self.program)
            .args(self.args_for(language))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SpeechError::RecognitionFailed(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            warn!(program = %self.program, status = %output.status, "Recognizer failed");
            return Err(SpeechError::RecognitionFailed(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| SpeechError::RecognitionFailed("no speech detected".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    fn strings(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_command_requires_program() {
        assert!(CommandPlayer::from_command(Vec::new()).is_none());
        assert!(CommandPlayer::from_command(strings(&[" "])).is_none());
        assert!(CommandRecognizer::from_command(strings(&["whisper-once", "--lang"])).is_some());
    }

    #[test]
    fn test_recognizer_from_config() {
        assert!(CommandRecognizer::from_config(&RecognitionConfig::default()).is_none());
        let config = RecognitionConfig {
            command: strings(&["whisper-once"]),
            ..RecognitionConfig::default()
        };
        assert!(CommandRecognizer::from_config(&config).is_some());
        let disabled = RecognitionConfig {
            enabled: false,
            ..config
        };
        assert!(CommandRecognizer::from_config(&disabled).is_none());
    }

    #[test]
    fn test_language_placeholder_substitution() {
        let recognizer =
            CommandRecognizer::from_command(strings(&["stt", "--lang={language}", "-q"])).unwrap();
        assert_eq!(recognizer.args_for("en-US"), strings(&["--lang=en-US", "-q"]));
    }

    #[test]
    fn test_espeak_arguments() {
        let synth = CommandSynthesizer::new("espeak-ng");
        let params = LocalVoiceParams {
            rate: 1.2,
            pitch: 3.0,
            volume: 0.5,
            language: "en-US".to_string(),
        };
        assert_eq!(
            synth.args(&params),
            strings(&["-s", "210", "-p", "99", "-a", "50", "-v", "en-us", "--stdin"])
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_local_voice_reads_text_from_stdin() {
        // The script ignores the voice flags and records what arrives on stdin.
        let dir = tempfile::tempdir().unwrap();
        let heard = dir.path().join("heard.txt");
        let script = dir.path().join("fake-tts");
        std::fs::write(&script, format!("#!/bin/sh\ncat > '{}'\n", heard.display())).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let synth = CommandSynthesizer::new(script.to_string_lossy());
        let params = LocalVoiceParams {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            language: "en-US".to_string(),
        };
        let (finished, _control) = synth
            .speak("-v is not a flag here", &params)
            .unwrap()
            .into_parts();
        assert_eq!(finished.await.unwrap(), Ok(()));
        assert_eq!(std::fs::read_to_string(&heard).unwrap(), "-v is not a flag here");
    }

    #[test]
    fn test_synthesizer_from_config() {
        assert!(CommandSynthesizer::from_config(&FallbackVoiceConfig::default()).is_some());
        let disabled = FallbackVoiceConfig {
            enabled: false,
            ..FallbackVoiceConfig::default()
        };
        assert!(CommandSynthesizer::from_config(&disabled).is_none());
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let synth = CommandSynthesizer::new("definitely-not-a-real-tts-binary");
        assert!(!synth.is_available());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_player_pipes_audio_and_completes() {
        let player = CommandPlayer::from_command(strings(&["cat"])).unwrap();
        assert!(player.is_available());
        let (finished, _control) = player.play(b"audio".to_vec()).unwrap().into_parts();
        assert_eq!(finished.await.unwrap(), Ok(()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_player_stop_kills_process() {
        let player = CommandPlayer::from_command(strings(&["sleep", "30"])).unwrap();
        let (finished, control) = player.play(Vec::new()).unwrap().into_parts();
        control.stop();
        control.stop();
        assert_eq!(finished.await.unwrap(), Err("stopped".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_player_nonzero_exit_is_failure() {
        let player = CommandPlayer::from_command(strings(&["sh", "-c", "exit 3"])).unwrap();
        let (finished, _control) = player.play(Vec::new()).unwrap().into_parts();
        assert!(finished.await.unwrap().is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_recognizer_reads_first_line() {
        let recognizer = CommandRecognizer::from_command(strings(&[
            "sh",
            "-c",
            "echo; echo '  heard in {language}  '; echo second",
        ]))
        .unwrap();
        assert_eq!(
            recognizer.recognize("en-US").await.unwrap(),
            "heard in en-US"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_recognizer_failures() {
        let silent = CommandRecognizer::from_command(strings(&["true"])).unwrap();
        assert!(matches!(
            silent.recognize("en-US").await.unwrap_err(),
            SpeechError::RecognitionFailed(_)
        ));

        let failing = CommandRecognizer::from_command(strings(&["sh", "-c", "exit 1"])).unwrap();
        assert!(matches!(
            failing.recognize("en-US").await.unwrap_err(),
            SpeechError::RecognitionFailed(_)
        ));

        let missing =
            CommandRecognizer::from_command(strings(&["definitely-not-a-real-stt"])).unwrap();
        assert!(matches!(
            missing.recognize("en-US").await.unwrap_err(),
            SpeechError::RecognitionFailed(_)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_executable_recognizer_fails_as_recognition() {
        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("stt");
        std::fs::write(&program, "#!/bin/sh\necho hi\n").unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o644)).unwrap();

        let recognizer =
            CommandRecognizer::from_command(vec![program.to_string_lossy().into_owned()]).unwrap();
        let input = crate::input::SpeechInputService::new(
            Some(std::sync::Arc::new(recognizer) as std::sync::Arc<dyn Recognizer>),
            "en-US",
        );
        assert!(matches!(
            input.listen().await.unwrap_err(),
            SpeechError::RecognitionFailed(_)
        ));
    }
}
