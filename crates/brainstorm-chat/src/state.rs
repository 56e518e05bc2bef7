//! Conversation state machine.
//!
//! Valid transitions for the intake dialogue:
//! - Greeting -> AwaitingUtterance (greeting delivered)
//! - AwaitingUtterance -> Processing (user utterance submitted)
//! - Processing -> AwaitingUtterance (reply delivered)
//! - Processing -> ProceedOffered (reply delivered, proceed offered)
//! - ProceedOffered -> Processing (user keeps talking after the offer)
//! - AwaitingUtterance -> Completed, ProceedOffered -> Completed (proceed)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Phase of the intake dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversationPhase {
    /// Created, greeting not yet delivered.
    Greeting,
    /// Waiting for the next user utterance.
    AwaitingUtterance,
    /// Extracting facts and producing a reply.
    Processing,
    /// A proceed prompt has been offered.
    ProceedOffered,
    /// Session handed off. Terminal.
    Completed,
}

impl fmt::Display for ConversationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationPhase::Greeting => write!(f, "Greeting"),
            ConversationPhase::AwaitingUtterance => write!(f, "AwaitingUtterance"),
            ConversationPhase::Processing => write!(f, "Processing"),
            ConversationPhase::ProceedOffered => write!(f, "ProceedOffered"),
            ConversationPhase::Completed => write!(f, "Completed"),
        }
    }
}

impl ConversationPhase {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &ConversationPhase) -> bool {
        use ConversationPhase::*;
        matches!(
            (self, target),
            (Greeting, AwaitingUtterance)
                | (AwaitingUtterance, Processing)
                | (Processing, AwaitingUtterance)
                | (Processing, ProceedOffered)
                | (ProceedOffered, Processing)
                | (AwaitingUtterance, Completed)
                | (ProceedOffered, Completed)
        )
    }

    /// Whether a user utterance may be submitted in this phase.
    pub fn accepts_utterance(&self) -> bool {
        matches!(
            self,
            ConversationPhase::AwaitingUtterance | ConversationPhase::ProceedOffered
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ConversationPhase::Completed)
    }
}

/// Validated holder of the current conversation phase.
///
/// Owned by a single controller, so no locking is needed.
#[derive(Debug, Clone)]
pub struct StateMachine {
    phase: ConversationPhase,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a state machine in `Greeting`.
    pub fn new() -> Self {
        Self {
            phase: ConversationPhase::Greeting,
        }
    }

    pub fn current(&self) -> ConversationPhase {
        self.phase
    }

    /// Attempt to move to `target`.
    pub fn transition(&mut self, target: ConversationPhase) -> Result<(), ChatError> {
        if self.phase.can_transition_to(&target) {
            tracing::debug!("Conversation phase: {} -> {}", self.phase, target);
            self.phase = target;
            Ok(())
        } else {
            Err(ChatError::InvalidTransition {
                from: self.phase,
                to: target,
            })
        }
    }

    /// Force the machine back to `AwaitingUtterance` (error recovery).
    pub fn reset(&mut self) {
        tracing::warn!("Conversation phase reset to AwaitingUtterance from {}", self.phase);
        self.phase = ConversationPhase::AwaitingUtterance;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(ConversationPhase::Greeting.to_string(), "Greeting");
        assert_eq!(
            ConversationPhase::AwaitingUtterance.to_string(),
            "AwaitingUtterance"
        );
        assert_eq!(ConversationPhase::Completed.to_string(), "Completed");
    }

    #[test]
    fn test_valid_transitions() {
        use ConversationPhase::*;
        assert!(Greeting.can_transition_to(&AwaitingUtterance));
        assert!(AwaitingUtterance.can_transition_to(&Processing));
        assert!(Processing.can_transition_to(&AwaitingUtterance));
        assert!(Processing.can_transition_to(&ProceedOffered));
        assert!(ProceedOffered.can_transition_to(&Processing));
        assert!(AwaitingUtterance.can_transition_to(&Completed));
        assert!(ProceedOffered.can_transition_to(&Completed));
    }

    #[test]
    fn test_invalid_transitions() {
        use ConversationPhase::*;
        assert!(!Greeting.can_transition_to(&Processing));
        assert!(!Greeting.can_transition_to(&Completed));
        assert!(!Processing.can_transition_to(&Completed));
        assert!(!Completed.can_transition_to(&AwaitingUtterance));
        assert!(!Completed.can_transition_to(&Processing));
        assert!(!AwaitingUtterance.can_transition_to(&ProceedOffered));
    }

    #[test]
    fn test_state_machine_full_cycle() {
        let mut sm = StateMachine::new();
        assert_eq!(sm.current(), ConversationPhase::Greeting);
        sm.transition(ConversationPhase::AwaitingUtterance).unwrap();
        sm.transition(ConversationPhase::Processing).unwrap();
        sm.transition(ConversationPhase::ProceedOffered).unwrap();
        sm.transition(ConversationPhase::Processing).unwrap();
        sm.transition(ConversationPhase::ProceedOffered).unwrap();
        sm.transition(ConversationPhase::Completed).unwrap();
        assert!(sm.current().is_terminal());
    }

    #[test]
    fn test_invalid_transition_is_error() {
        let mut sm = StateMachine::new();
        let err = sm.transition(ConversationPhase::Completed).unwrap_err();
        assert!(matches!(
            err,
            ChatError::InvalidTransition {
                from: ConversationPhase::Greeting,
                to: ConversationPhase::Completed,
            }
        ));
        assert_eq!(sm.current(), ConversationPhase::Greeting);
    }

    #[test]
    fn test_reset() {
        let mut sm = StateMachine::new();
        sm.transition(ConversationPhase::AwaitingUtterance).unwrap();
        sm.transition(ConversationPhase::Processing).unwrap();
        sm.reset();
        assert_eq!(sm.current(), ConversationPhase::AwaitingUtterance);
    }

    #[test]
    fn test_accepts_utterance() {
        assert!(ConversationPhase::AwaitingUtterance.accepts_utterance());
        assert!(ConversationPhase::ProceedOffered.accepts_utterance());
        assert!(!ConversationPhase::Greeting.accepts_utterance());
        assert!(!ConversationPhase::Completed.accepts_utterance());
    }
}
