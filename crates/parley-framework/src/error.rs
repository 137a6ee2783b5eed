//! Error types for the Parley framework.

use thiserror::Error;

/// Errors that can occur during context extraction.
///
/// An extraction failure skips the handler that asked for the value; the
/// rest of the chain keeps running.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The event type does not match the expected type.
    #[error("event type mismatch: expected '{expected}', got '{got}'")]
    EventTypeMismatch {
        /// Expected type name.
        expected: &'static str,
        /// Actual event name.
        got: &'static str,
    },

    /// The bot type does not match the expected type.
    #[error("bot type mismatch: expected '{expected}'")]
    BotTypeMismatch {
        /// Expected bot type name.
        expected: &'static str,
    },

    /// The event did not resolve to a registered command.
    #[error("event is not a command")]
    NotACommand,

    /// A got point has not captured its value yet.
    #[error("argument '{0}' has not been collected")]
    MissingArg(String),

    /// Custom extraction error.
    #[error("{0}")]
    Custom(String),
}

impl ExtractError {
    /// Creates a custom extraction error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Returned by an argument filter to reject the collected text.
///
/// The conversation re-asks with `message`, or with the configured default
/// prompt when `message` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .message.as_deref().unwrap_or("validation failed"))]
pub struct ValidateError {
    /// Prompt sent back to the user.
    pub message: Option<String>,
}

impl ValidateError {
    /// A validation failure with a custom prompt.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// A validation failure that falls back to the default prompt.
    pub fn default_prompt() -> Self {
        Self { message: None }
    }
}

/// Errors raised while building commands.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// A command name with no segments.
    #[error("command name must have at least one segment")]
    EmptyName,

    /// A start or separator pattern failed to compile.
    #[error("invalid command pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Compiler message.
        reason: String,
    },
}
