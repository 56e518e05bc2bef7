//! Conversation controller: drives the intake dialogue.
//!
//! Each submitted utterance is extracted, answered (remote collaborator first,
//! local rules as fallback), narrated, and checked against the proceed
//! condition. The controller is the single writer of its state, so a reply is
//! always recorded before the next utterance can be submitted.

use std::sync::Arc;

use brainstorm_core::config::ConversationConfig;
use brainstorm_core::types::{SessionSummary, Utterance};
use brainstorm_speech::SpeechOutputService;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ChatError;
use crate::extractor::{HeuristicExtractor, TranscriptExtractor};
use crate::reply::{LocalReplyRules, ReplyGenerator};
use crate::state::{ConversationPhase, StateMachine};

/// Opening line spoken by `start`.
pub const OPENING_GREETING: &str = "Hello! I'm your AI brainstorming facilitator. Tell me about an idea you'd like to explore, or describe a problem you're trying to solve. Speak naturally, and I'll help you brainstorm!";

/// Asked when `proceed` is requested without a usable topic.
pub const CLARIFYING_PROMPT: &str = "I'd like to help you brainstorm! Could you tell me in one sentence what idea or topic you'd like to explore?";

/// Name used in the summary when none was extracted.
pub const DEFAULT_NAME: &str = "User";

/// Offer to move on to idea generation.
pub fn proceed_prompt_text(topic: &str) -> String {
    format!(
        "Great! Based on our conversation, I understand you want to brainstorm about \"{}\". Would you like to proceed to generate some creative ideas?",
        topic
    )
}

/// Mutable facts of one intake session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub transcript: Vec<Utterance>,
    pub extracted_name: Option<String>,
    pub extracted_topic: Option<String>,
    /// Dialogue utterances (user utterances and their direct replies)
    /// recorded before the latest submission.
    pub turn_count: usize,
    pub proceed_offered: bool,
}

/// Result of one `submit`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub reply: Utterance,
    pub should_offer_proceed: bool,
    /// The proceed prompt appended after the reply, when one was offered.
    pub proceed_prompt: Option<Utterance>,
}

/// Result of `proceed`.
#[derive(Debug, Clone, PartialEq)]
pub enum ProceedOutcome {
    /// The session is complete and handed off.
    Completed(SessionSummary),
    /// No usable topic yet; a clarifying prompt was appended.
    NeedsTopic(Utterance),
}

fn merge_first(slot: &mut Option<String>, value: Option<String>) -> bool {
    if slot.is_some() {
        return false;
    }
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(v) => {
            *slot = Some(v);
            true
        }
        None => false,
    }
}

fn char_len(value: Option<&str>) -> usize {
    value.map(|v| v.chars().count()).unwrap_or(0)
}

/// Drives the multi-turn intake dialogue.
pub struct ConversationController {
    extractor: Box<dyn TranscriptExtractor>,
    remote: Option<Arc<dyn ReplyGenerator>>,
    local: LocalReplyRules,
    speech: Option<Arc<SpeechOutputService>>,
    settings: ConversationConfig,
    state: ConversationState,
    /// User utterances and direct replies recorded so far.
    dialogue_utterances: usize,
    machine: StateMachine,
}

impl ConversationController {
    /// A controller with the heuristic extractor, local replies only and no
    /// narration.
    pub fn new(settings: ConversationConfig) -> Self {
        Self {
            extractor: Box::new(HeuristicExtractor::new()),
            remote: None,
            local: LocalReplyRules,
            speech: None,
            settings,
            state: ConversationState::default(),
            dialogue_utterances: 0,
            machine: StateMachine::new(),
        }
    }

    pub fn with_extractor(mut self, extractor: impl TranscriptExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    pub fn with_remote(mut self, remote: Arc<dyn ReplyGenerator>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_speech(mut self, speech: Arc<SpeechOutputService>) -> Self {
        self.speech = Some(speech);
        self
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn phase(&self) -> ConversationPhase {
        self.machine.current()
    }

    pub fn transcript(&self) -> &[Utterance] {
        &self.state.transcript
    }

    pub fn extracted_name(&self) -> Option<&str> {
        self.state.extracted_name.as_deref()
    }

    pub fn extracted_topic(&self) -> Option<&str> {
        self.state.extracted_topic.as_deref()
    }

    // -----------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------

    /// Deliver the opening greeting and start accepting utterances.
    pub async fn start(&mut self) -> Result<Utterance, ChatError> {
        self.machine.transition(ConversationPhase::AwaitingUtterance)?;
        let greeting = Utterance::assistant(OPENING_GREETING);
        self.state.transcript.push(greeting.clone());
        info!("Conversation started");
        self.narrate(&greeting.text).await;
        Ok(greeting)
    }

    /// Submit one user utterance (typed or transcribed).
    pub async fn submit(&mut self, text: &str) -> Result<SubmitOutcome, ChatError> {
        let text = text.trim();
        if self.machine.current().is_terminal() {
            return Err(ChatError::SessionCompleted);
        }
        self.recover_interrupted()?;
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if text.chars().count() > self.settings.max_message_chars {
            return Err(ChatError::MessageTooLong(self.settings.max_message_chars));
        }
        if self.machine.current() == ConversationPhase::Greeting {
            debug!("Utterance submitted before greeting, skipping it");
            self.machine.transition(ConversationPhase::AwaitingUtterance)?;
        }

        let prior_utterances = self.dialogue_utterances;
        let history_len = self.state.transcript.len();
        self.machine.transition(ConversationPhase::Processing)?;

        self.state.turn_count = prior_utterances;
        self.state.transcript.push(Utterance::user(text));
        self.dialogue_utterances += 1;

        let extraction = self.extractor.extract(text);
        if merge_first(&mut self.state.extracted_name, extraction.name) {
            info!(name = ?self.state.extracted_name, "Name captured");
        }
        if merge_first(&mut self.state.extracted_topic, extraction.topic) {
            info!(topic = ?self.state.extracted_topic, "Topic captured");
        }

        let (reply_text, remote_ready) = self.generate_reply(text, history_len).await;

        let reply = Utterance::assistant(reply_text);
        self.state.transcript.push(reply.clone());
        self.dialogue_utterances += 1;
        self.narrate(&reply.text).await;

        let local_ready = char_len(self.extracted_topic()) > self.settings.min_offer_topic_chars
            && prior_utterances >= self.settings.min_prior_utterances;
        let should_offer = !self.state.proceed_offered && (local_ready || remote_ready);

        let proceed_prompt = if should_offer {
            let topic = self.state.extracted_topic.clone().unwrap_or_default();
            let prompt = Utterance::action_prompt(proceed_prompt_text(&topic));
            self.state.transcript.push(prompt.clone());
            self.state.proceed_offered = true;
            info!(topic = %topic, remote = remote_ready, "Proceed offered");
            self.narrate(&prompt.text).await;
            Some(prompt)
        } else {
            None
        };

        let next = if self.state.proceed_offered {
            ConversationPhase::ProceedOffered
        } else {
            ConversationPhase::AwaitingUtterance
        };
        self.machine.transition(next)?;

        debug!(
            turn_count = self.state.turn_count,
            offered = should_offer,
            "Utterance processed"
        );
        Ok(SubmitOutcome {
            reply,
            should_offer_proceed: should_offer,
            proceed_prompt,
        })
    }

    /// Complete the session if a usable topic exists, else ask for one.
    pub async fn proceed(&mut self) -> Result<ProceedOutcome, ChatError> {
        if self.machine.current().is_terminal() {
            return Err(ChatError::SessionCompleted);
        }
        self.recover_interrupted()?;

        let topic = self
            .state
            .extracted_topic
            .clone()
            .filter(|t| t.chars().count() > self.settings.min_proceed_topic_chars);

        match topic {
            Some(topic) => {
                if self.machine.current() == ConversationPhase::Greeting {
                    self.machine.transition(ConversationPhase::AwaitingUtterance)?;
                }
                self.machine.transition(ConversationPhase::Completed)?;
                let summary = SessionSummary {
                    name: self
                        .state
                        .extracted_name
                        .clone()
                        .unwrap_or_else(|| DEFAULT_NAME.to_string()),
                    topic,
                    transcript: self.state.transcript.clone(),
                };
                info!(
                    name = %summary.name,
                    topic = %summary.topic,
                    utterances = summary.transcript.len(),
                    "Conversation completed"
                );
                Ok(ProceedOutcome::Completed(summary))
            }
            None => {
                debug!("Proceed requested without a usable topic");
                let prompt = self.ask_for_topic().await?;
                Ok(ProceedOutcome::NeedsTopic(prompt))
            }
        }
    }

    /// Ask the user to state their topic in one sentence.
    pub async fn request_more_info(&mut self) -> Result<Utterance, ChatError> {
        if self.machine.current().is_terminal() {
            return Err(ChatError::SessionCompleted);
        }
        self.recover_interrupted()?;
        self.ask_for_topic().await
    }

    /// Leave `Processing` after a `submit` future was dropped mid-turn.
    fn recover_interrupted(&mut self) -> Result<(), ChatError> {
        if self.machine.current() != ConversationPhase::Processing {
            return Ok(());
        }
        warn!(
            offered = self.state.proceed_offered,
            "Previous submission was interrupted"
        );
        if self.state.proceed_offered {
            self.machine.transition(ConversationPhase::ProceedOffered)
        } else {
            self.machine.reset();
            Ok(())
        }
    }

    async fn ask_for_topic(&mut self) -> Result<Utterance, ChatError> {
        if self.machine.current() == ConversationPhase::Greeting {
            self.machine.transition(ConversationPhase::AwaitingUtterance)?;
        }
        let prompt = Utterance::assistant(CLARIFYING_PROMPT);
        self.state.transcript.push(prompt.clone());
        self.narrate(&prompt.text).await;
        Ok(prompt)
    }

    /// Reply text plus whether the remote collaborator signalled readiness.
    async fn generate_reply(&mut self, text: &str, history_len: usize) -> (String, bool) {
        if let Some(remote) = self.remote.clone() {
            let history = &self.state.transcript[..history_len];
            match remote.reply(text, history, &self.settings.context).await {
                Ok(reply) => {
                    let remote_topic = reply.extracted_topic.is_some();
                    merge_first(&mut self.state.extracted_name, reply.extracted_name);
                    merge_first(&mut self.state.extracted_topic, reply.extracted_topic);
                    let ready = reply.should_proceed && remote_topic;
                    debug!(collaborator = remote.name(), ready, "Remote reply received");
                    return (reply.response, ready);
                }
                Err(e) => {
                    warn!(collaborator = remote.name(), error = %e, "Remote reply failed, using local rules");
                }
            }
        }
        (self.local.reply(text, self.extracted_topic()), false)
    }

    /// Speak `text` if narration is configured. Failures are logged only.
    async fn narrate(&self, text: &str) {
        if let Some(speech) = &self.speech {
            if let Err(e) = speech.say(text).await {
                warn!(error = %e, "Narration failed");
            }
        }
    }
}
