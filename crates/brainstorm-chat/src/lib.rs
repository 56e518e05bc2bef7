//! Brainstorm chat crate - the intake dialogue.
//!
//! Extracts a speaker name and topic from each utterance, answers through a
//! remote collaborator or a deterministic rule table, narrates replies, and
//! decides when enough is known to hand the session off.

pub mod controller;
pub mod error;
pub mod extractor;
pub mod reply;
pub mod state;

pub use controller::{
    proceed_prompt_text, ConversationController, ConversationState, ProceedOutcome, SubmitOutcome,
    CLARIFYING_PROMPT, DEFAULT_NAME, OPENING_GREETING,
};
pub use error::ChatError;
pub use extractor::{HeuristicExtractor, TranscriptExtractor};
pub use reply::{HttpReplyClient, LocalReplyRules, RemoteReply, ReplyGenerator, ReplyKind};
pub use state::{ConversationPhase, StateMachine};
