//! Error types for slide generation.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while turning text into a presentation.
#[derive(Error, Debug)]
pub enum Error {
    /// No usable API key was supplied; nothing was sent to the LLM service.
    #[error("API key required: {0}")]
    Credential(String),

    /// The chat-completion call failed (network, auth, rate limit, bad response).
    #[error("Failed to process with LLM: {0}")]
    Llm(String),

    /// The template could not be loaded or the output could not be written.
    #[error("Presentation error: {0}")]
    Document(String),

    /// The request itself is unusable (e.g. empty text).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The template file is not one of the accepted formats.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to open, read or write a local file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a [`Error::Document`] from anything displayable.
    pub fn document(message: impl std::fmt::Display) -> Self {
        Self::Document(message.to_string())
    }

    /// Build a [`Error::Llm`] from anything displayable.
    pub fn llm(message: impl std::fmt::Display) -> Self {
        Self::Llm(message.to_string())
    }
}
