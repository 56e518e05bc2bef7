//! Reply generation for the intake dialogue.
//!
//! A remote collaborator (`POST {backend_url}/conversation`) is consulted
//! first when configured. `LocalReplyRules` is the deterministic fallback.

use std::time::Duration;

use async_trait::async_trait;
use brainstorm_core::config::ConversationConfig;
use brainstorm_core::types::{Origin, Utterance};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

use crate::error::ChatError;

/// A reply from the remote collaborator, with blank fields normalised away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteReply {
    pub response: String,
    pub extracted_name: Option<String>,
    pub extracted_topic: Option<String>,
    pub should_proceed: bool,
}

/// Produces an assistant reply for a user message.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// `history` is the transcript before `message`.
    async fn reply(
        &self,
        message: &str,
        history: &[Utterance],
        context: &str,
    ) -> Result<RemoteReply, ChatError>;
}

// =============================================================================
// HTTP collaborator
// =============================================================================

#[derive(Serialize)]
struct ConversationRequest<'a> {
    message: &'a str,
    conversation_history: Vec<HistoryEntry<'a>>,
    context: &'a str,
}

#[derive(Serialize)]
struct HistoryEntry<'a> {
    #[serde(rename = "type")]
    origin: Origin,
    text: &'a str,
}

#[derive(Deserialize)]
struct ConversationResponse {
    response: String,
    #[serde(default)]
    extracted_topic: Option<String>,
    #[serde(default)]
    extracted_name: Option<String>,
    #[serde(default)]
    should_proceed: Option<bool>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// JSON-over-HTTP reply collaborator.
pub struct HttpReplyClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpReplyClient {
    pub fn new(backend_url: &str, timeout: Duration) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::RemoteReplyFailed(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/conversation", backend_url.trim_end_matches('/')),
        })
    }

    /// `None` when the remote collaborator is disabled.
    pub fn from_config(config: &ConversationConfig) -> Result<Option<Self>, ChatError> {
        if !config.remote_enabled || config.backend_url.trim().is_empty() {
            return Ok(None);
        }
        Self::new(&config.backend_url, Duration::from_secs(config.timeout_secs)).map(Some)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ReplyGenerator for HttpReplyClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn reply(
        &self,
        message: &str,
        history: &[Utterance],
        context: &str,
    ) -> Result<RemoteReply, ChatError> {
        let body = ConversationRequest {
            message,
            conversation_history: history
                .iter()
                .map(|u| HistoryEntry {
                    origin: u.origin,
                    text: &u.text,
                })
                .collect(),
            context,
        };

        debug!(endpoint = %self.endpoint, history = history.len(), "Requesting remote reply");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::RemoteReplyFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::RemoteReplyFailed(format!("HTTP {status}")));
        }

        let parsed: ConversationResponse = response
            .json()
            .await
            .map_err(|e| ChatError::RemoteReplyFailed(format!("invalid response: {e}")))?;

        let text = parsed.response.trim();
        if text.is_empty() {
            return Err(ChatError::RemoteReplyFailed("empty response".to_string()));
        }

        Ok(RemoteReply {
            response: text.to_string(),
            extracted_name: non_blank(parsed.extracted_name),
            extracted_topic: non_blank(parsed.extracted_topic),
            should_proceed: parsed.should_proceed.unwrap_or(false),
        })
    }
}

// =============================================================================
// Local rule table
// =============================================================================

pub const GREETING_REPLY: &str =
    "Hello! I'm excited to help you brainstorm. What idea or problem would you like to explore today?";
pub const IDEA_REPLY: &str =
    "That sounds interesting! Tell me more about it. What problem does it solve, or what makes it unique?";
pub const PROBLEM_REPLY: &str =
    "I see. Let's think about this problem from different angles. What have you tried so far? What obstacles are you facing?";
pub const CONTINUE_REPLY: &str =
    "Great! Let's continue exploring your idea. What aspect would you like to dive deeper into?";
pub const GENERIC_REPLY: &str =
    "That's a great point! Tell me more about that. What are you hoping to achieve with this idea?";

/// Which rule produced a local reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Greeting,
    Idea,
    Problem,
    Affirmative,
    Generic,
}

struct ReplyPatterns {
    greeting: Regex,
    idea: Regex,
    problem: Regex,
    affirmative: Regex,
}

static REPLY_PATTERNS: LazyLock<ReplyPatterns> = LazyLock::new(|| ReplyPatterns {
    greeting: Regex::new(r"(?i)\b(?:hello|hi|hey)\b").expect("Invalid greeting regex"),
    idea: Regex::new(r"(?i)\bideas?\b|\bwant\s+to\b|\bthinking\s+about\b")
        .expect("Invalid idea regex"),
    problem: Regex::new(r"(?i)\b(?:problems?|challenges?|issues?)\b")
        .expect("Invalid problem regex"),
    affirmative: Regex::new(r"(?i)\b(?:yes|sure|okay|ok)\b").expect("Invalid affirmative regex"),
});

/// Deterministic keyword rules, checked in order: greeting, idea, problem,
/// affirmative, then a generic probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalReplyRules;

impl LocalReplyRules {
    pub fn classify(&self, message: &str) -> ReplyKind {
        let pats = &*REPLY_PATTERNS;
        if pats.greeting.is_match(message) {
            ReplyKind::Greeting
        } else if pats.idea.is_match(message) {
            ReplyKind::Idea
        } else if pats.problem.is_match(message) {
            ReplyKind::Problem
        } else if pats.affirmative.is_match(message) {
            ReplyKind::Affirmative
        } else {
            ReplyKind::Generic
        }
    }

    /// Reply text for `message`. `topic` is quoted by the affirmative reply.
    pub fn reply(&self, message: &str, topic: Option<&str>) -> String {
        match self.classify(message) {
            ReplyKind::Greeting => GREETING_REPLY.to_string(),
            ReplyKind::Idea => IDEA_REPLY.to_string(),
            ReplyKind::Problem => PROBLEM_REPLY.to_string(),
            ReplyKind::Affirmative => match topic {
                Some(topic) => format!(
                    "Perfect! Let's start brainstorming about \"{}\". I'll help you generate some creative ideas.",
                    topic
                ),
                None => CONTINUE_REPLY.to_string(),
            },
            ReplyKind::Generic => GENERIC_REPLY.to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_order() {
        let rules = LocalReplyRules;
        assert_eq!(rules.classify("Hello"), ReplyKind::Greeting);
        assert_eq!(rules.classify("hey, I have an idea"), ReplyKind::Greeting);
        assert_eq!(
            rules.classify("I'm thinking about reducing food waste"),
            ReplyKind::Idea
        );
        assert_eq!(rules.classify("I want to fix a problem"), ReplyKind::Idea);
        assert_eq!(
            rules.classify("It's a big problem for sustainability"),
            ReplyKind::Problem
        );
        assert_eq!(rules.classify("Yes, sure"), ReplyKind::Affirmative);
        assert_eq!(rules.classify("OK"), ReplyKind::Affirmative);
        assert_eq!(rules.classify("Bananas are yellow"), ReplyKind::Generic);
    }

    #[test]
    fn test_single_word_cues_match_whole_words() {
        let rules = LocalReplyRules;
        // "hi" inside "thinking" or "this" is not a greeting.
        assert_ne!(rules.classify("this thing"), ReplyKind::Greeting);
        assert_eq!(rules.classify("They"), ReplyKind::Generic);
        // "ok" inside "token" is not an affirmative.
        assert_eq!(rules.classify("token economy"), ReplyKind::Generic);
        assert_eq!(rules.classify("Two ideas so far"), ReplyKind::Idea);
        assert_eq!(rules.classify("Supply issues"), ReplyKind::Problem);
    }

    #[test]
    fn test_affirmative_quotes_topic() {
        let rules = LocalReplyRules;
        assert_eq!(
            rules.reply("yes", Some("urban beekeeping")),
            "Perfect! Let's start brainstorming about \"urban beekeeping\". I'll help you generate some creative ideas."
        );
        assert_eq!(rules.reply("sure", None), CONTINUE_REPLY);
    }

    #[test]
    fn test_reply_texts() {
        let rules = LocalReplyRules;
        assert_eq!(rules.reply("hi there", None), GREETING_REPLY);
        assert_eq!(rules.reply("my idea", None), IDEA_REPLY);
        assert_eq!(rules.reply("the challenge", None), PROBLEM_REPLY);
        assert_eq!(rules.reply("purple", None), GENERIC_REPLY);
    }

    #[test]
    fn test_request_wire_format() {
        let history = vec![Utterance::assistant("Hello!"), Utterance::user("Hi")];
        let body = ConversationRequest {
            message: "I want to build a garden app",
            conversation_history: history
                .iter()
                .map(|u| HistoryEntry {
                    origin: u.origin,
                    text: &u.text,
                })
                .collect(),
            context: "voice_conversation",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["message"], "I want to build a garden app");
        assert_eq!(json["context"], "voice_conversation");
        assert_eq!(json["conversation_history"][0]["type"], "assistant");
        assert_eq!(json["conversation_history"][1]["type"], "user");
        assert_eq!(json["conversation_history"][1]["text"], "Hi");
    }

    #[test]
    fn test_response_optional_fields() {
        let parsed: ConversationResponse =
            serde_json::from_str(r#"{"response": "Tell me more"}"#).unwrap();
        assert_eq!(parsed.response, "Tell me more");
        assert!(parsed.extracted_topic.is_none());
        assert!(parsed.should_proceed.is_none());

        let parsed: ConversationResponse = serde_json::from_str(
            r#"{"response": "ok", "extracted_topic": null, "extracted_name": " ", "should_proceed": null}"#,
        )
        .unwrap();
        assert_eq!(non_blank(parsed.extracted_name), None);
    }

    #[test]
    fn test_from_config_disabled() {
        let config = ConversationConfig {
            remote_enabled: false,
            ..ConversationConfig::default()
        };
        assert!(HttpReplyClient::from_config(&config).unwrap().is_none());

        let client = HttpReplyClient::from_config(&ConversationConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8000/conversation");
    }
}
