use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{BrainstormError, Result};

/// Environment variable consulted when `synthesis.api_key` is empty.
pub const SYNTHESIS_API_KEY_ENV: &str = "ELEVENLABS_API_KEY";

/// Top-level configuration for the brainstorm voice core.
///
/// Loaded from `~/.brainstorm/config.toml` by default. Each section
/// corresponds to one component of the voice/phase core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrainstormConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub fallback_voice: FallbackVoiceConfig,
    #[serde(default)]
    pub recognition: RecognitionConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub phase: PhaseConfig,
}

impl BrainstormConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BrainstormConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| BrainstormError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Primary (remote) speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Whether the remote synthesis path is attempted at all.
    pub enabled: bool,
    /// Base URL of the text-to-speech API.
    pub api_url: String,
    /// API key. Empty means "read `ELEVENLABS_API_KEY`".
    pub api_key: String,
    /// Default voice identity.
    pub voice_id: String,
    /// Synthesis model identifier.
    pub model_id: String,
    /// Voice stability in [0, 1].
    pub stability: f32,
    /// Similarity boost in [0, 1].
    pub similarity_boost: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Player process (program followed by arguments) fed the encoded audio on stdin.
    pub player_command: Vec<String>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: "https://api.elevenlabs.io/v1".to_string(),
            api_key: String::new(),
            voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
            model_id: "eleven_monolingual_v1".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
            timeout_secs: 30,
            player_command: vec!["mpg123".to_string(), "-q".to_string(), "-".to_string()],
        }
    }
}

impl SynthesisConfig {
    /// The configured API key, or the value of `ELEVENLABS_API_KEY` when the
    /// config leaves it empty. Returns `None` when neither is set.
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.trim().is_empty() {
            return Some(self.api_key.trim().to_string());
        }
        std::env::var(SYNTHESIS_API_KEY_ENV)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// Local (host) speech synthesis fallback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackVoiceConfig {
    /// Whether the local synthesis fallback may be used.
    pub enabled: bool,
    /// Local TTS program (espeak-ng compatible arguments).
    pub command: String,
    /// Speaking rate multiplier (1.0 = normal).
    pub rate: f32,
    /// Pitch multiplier (1.0 = normal).
    pub pitch: f32,
    /// Volume in [0, 1].
    pub volume: f32,
    /// Language tag, e.g. "en-US".
    pub language: String,
}

impl Default for FallbackVoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "espeak-ng".to_string(),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            language: "en-US".to_string(),
        }
    }
}

/// Speech recognition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Whether voice input is offered.
    pub enabled: bool,
    /// One-shot recognizer program. It must print a single transcript line
    /// to stdout. Empty means no recognition capability.
    pub command: Vec<String>,
    /// Recognition language, fixed for each listening session.
    pub language: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: Vec::new(),
            language: "en-US".to_string(),
        }
    }
}

/// Intake conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Whether the remote reply collaborator is consulted.
    pub remote_enabled: bool,
    /// Base URL of the reply collaborator (`POST {backend_url}/conversation`).
    pub backend_url: String,
    /// Reply request timeout in seconds.
    pub timeout_secs: u64,
    /// Context tag sent with each reply request.
    pub context: String,
    /// Maximum accepted utterance length in characters.
    pub max_message_chars: usize,
    /// Dialogue utterances that must precede a submission before the local
    /// proceed condition can hold.
    pub min_prior_utterances: usize,
    /// The topic must be longer than this (in characters) to offer proceeding.
    pub min_offer_topic_chars: usize,
    /// The topic must be longer than this (in characters) for `proceed` to complete.
    pub min_proceed_topic_chars: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            remote_enabled: true,
            backend_url: "http://localhost:8000".to_string(),
            timeout_secs: 15,
            context: "voice_conversation".to_string(),
            max_message_chars: 2000,
            min_prior_utterances: 4,
            min_offer_topic_chars: 10,
            min_proceed_topic_chars: 5,
        }
    }
}

/// Timed phase settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Interval between timer ticks in milliseconds.
    pub tick_interval_ms: u64,
    /// Seconds added by one extension.
    pub extend_secs: u32,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            extend_secs: 30,
        }
    }
}
