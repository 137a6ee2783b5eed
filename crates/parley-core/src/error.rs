//! Error types shared across crates.
//!
//! Framework-level errors (extraction, validation) live in `parley-framework`.
//! Control-flow signals such as Skip or Reject are not errors and never show
//! up here.

use thiserror::Error;

/// The transport collaborator refused an outbound frame.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The outbound side is gone; nothing more can be written.
    #[error("connection closed: {reason}")]
    ConnectionClosed { reason: String },

    /// A single frame could not be handed over.
    #[error("failed to send frame: {0}")]
    SendFailed(String),
}

/// An inbound frame could not be turned into an event.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    #[error("failed to parse event: {reason}")]
    ParseError { reason: String },

    /// Setup problems, such as an invalid adapter configuration.
    #[error("adapter error: {0}")]
    Internal(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl AdapterError {
    /// Shorthand for a [`AdapterError::ParseError`].
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::ParseError {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err.to_string())
    }
}

/// Why an outbound API call did not produce a payload.
///
/// Timeouts and failure replies are ordinary results for the calling
/// handler; neither one disturbs the dispatch loop.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The connection went away before a reply arrived.
    #[error("bot is not connected")]
    NotConnected,

    /// No reply arrived within the allotted time.
    #[error("API call timed out")]
    Timeout,

    /// The platform answered with a failure status.
    #[error("API call failed ({retcode}): {message}")]
    Failed { retcode: i64, message: String },

    #[error("malformed API payload: {0}")]
    Serialization(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The event does not say where a reply should go.
    #[error("event has no user or group to reply to")]
    MissingSession,
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

pub type AdapterResult<T> = Result<T, AdapterError>;

pub type ApiResult<T> = Result<T, ApiError>;
