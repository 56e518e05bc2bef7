use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Conversation
// =============================================================================

/// Who produced an utterance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    User,
    Assistant,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::User => write!(f, "user"),
            Origin::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn of dialogue text. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub id: Uuid,
    pub origin: Origin,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Whether this utterance invites the user to proceed to the next step.
    pub is_action_prompt: bool,
}

impl Utterance {
    fn new(origin: Origin, text: impl Into<String>, is_action_prompt: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin,
            text: text.into(),
            timestamp: Utc::now(),
            is_action_prompt,
        }
    }

    /// A user utterance (typed or transcribed).
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Origin::User, text, false)
    }

    /// An ordinary assistant reply.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Origin::Assistant, text, false)
    }

    /// An assistant utterance offering to proceed.
    pub fn action_prompt(text: impl Into<String>) -> Self {
        Self::new(Origin::Assistant, text, true)
    }
}

/// Structured facts derived from a single piece of free text.
///
/// Empty fields are not an error: they simply mean nothing confident was found.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub name: Option<String>,
    pub topic: Option<String>,
}

impl ExtractionResult {
    /// True when neither a name nor a topic was found.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.topic.is_none()
    }
}

/// The plain hand-off produced when the intake dialogue completes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub name: String,
    pub topic: String,
    pub transcript: Vec<Utterance>,
}

// =============================================================================
// Phases
// =============================================================================

/// Mode of the idea-generation activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseMode {
    /// No countdown.
    #[default]
    Untimed,
    /// 90-second burst.
    Lightning,
    /// 180-second focused session.
    DeepDive,
}

impl PhaseMode {
    /// Fixed total duration of the mode in seconds, `None` for untimed.
    pub fn total_duration_secs(&self) -> Option<u32> {
        match self {
            PhaseMode::Untimed => None,
            PhaseMode::Lightning => Some(90),
            PhaseMode::DeepDive => Some(180),
        }
    }
}

impl std::fmt::Display for PhaseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseMode::Untimed => write!(f, "untimed"),
            PhaseMode::Lightning => write!(f, "lightning"),
            PhaseMode::DeepDive => write!(f, "deep dive"),
        }
    }
}

impl std::str::FromStr for PhaseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "untimed" => Ok(PhaseMode::Untimed),
            "lightning" => Ok(PhaseMode::Lightning),
            "deepdive" => Ok(PhaseMode::DeepDive),
            other => Err(format!("unknown phase mode: {}", other)),
        }
    }
}

/// A bounded or unbounded time window.
///
/// `total_duration_secs` only drives display progress; expiry is computed from
/// `end_at`, so extending a phase moves `end_at` and leaves the total alone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseDescriptor {
    pub mode: PhaseMode,
    pub total_duration_secs: u32,
    pub end_at: Option<DateTime<Utc>>,
}

impl PhaseDescriptor {
    /// Describe a phase of `mode` starting at `now`.
    pub fn starting_at(mode: PhaseMode, now: DateTime<Utc>) -> Self {
        match mode.total_duration_secs() {
            Some(total) => Self {
                mode,
                total_duration_secs: total,
                end_at: Some(now + Duration::seconds(i64::from(total))),
            },
            None => Self {
                mode,
                total_duration_secs: 0,
                end_at: None,
            },
        }
    }

    /// Whether this phase has a countdown.
    pub fn is_timed(&self) -> bool {
        self.end_at.is_some()
    }
}
