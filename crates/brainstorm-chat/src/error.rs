//! Error types for the intake conversation.

use brainstorm_core::error::BrainstormError;

use crate::state::ConversationPhase;

/// Errors from the conversation controller and its reply collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("conversation already completed")]
    SessionCompleted,
    #[error("invalid conversation transition: {from} -> {to}")]
    InvalidTransition {
        from: ConversationPhase,
        to: ConversationPhase,
    },
    #[error("remote reply failed: {0}")]
    RemoteReplyFailed(String),
}

impl From<ChatError> for BrainstormError {
    fn from(err: ChatError) -> Self {
        BrainstormError::Conversation(err.to_string())
    }
}
