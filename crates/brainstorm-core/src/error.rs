use thiserror::Error;

/// Top-level error type for the brainstorm workspace.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for BrainstormError` so that `?` works across crate
/// boundaries (speech, conversation, phase).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BrainstormError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("Conversation error: {0}")]
    Conversation(String),

    #[error("Phase error: {0}")]
    Phase(String),
}

impl From<toml::de::Error> for BrainstormError {
    fn from(err: toml::de::Error) -> Self {
        BrainstormError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for BrainstormError {
    fn from(err: toml::ser::Error) -> Self {
        BrainstormError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for BrainstormError {
    fn from(err: serde_json::Error) -> Self {
        BrainstormError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for brainstorm operations.
pub type Result<T> = std::result::Result<T, BrainstormError>;
