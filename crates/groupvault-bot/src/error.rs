//! Bot error types.

use std::io;
use thiserror::Error;

use groupvault_providers::ProviderError;

/// Result type for bot operations.
pub type BotResult<T> = Result<T, BotError>;

/// Errors that can occur in the bot daemon.
#[derive(Debug, Error)]
pub enum BotError {
    /// IO error (state file, scratch dir, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error from the storage or identity provider.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error talking to the chat platform.
    #[error("chat platform error: {message}")]
    Chat { message: String },

    /// State document could not be read or written.
    #[error("state error: {message}")]
    State { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl BotError {
    /// Creates a chat platform error.
    pub fn chat(message: impl Into<String>) -> Self {
        Self::Chat {
            message: message.into(),
        }
    }

    /// Creates a state error.
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
