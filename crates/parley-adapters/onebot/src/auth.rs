//! Connection authorization.
//!
//! Runs once when a OneBot implementation connects, before any of its frames
//! reach the adapter. The transport passes the connection kind and the
//! request headers; a successful check yields the bot's self id.

use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

/// Why a connection was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("unsupported connection type: {0}")]
    UnsupportedConnection(String),
    #[error("missing X-Self-ID header")]
    MissingSelfId,
    #[error("missing Authorization header")]
    MissingToken,
    #[error("Authorization header is invalid")]
    InvalidToken,
}

impl AuthError {
    /// The HTTP status the transport should answer with.
    pub fn status(&self) -> u16 {
        match self {
            AuthError::UnsupportedConnection(_) => 405,
            AuthError::MissingSelfId => 400,
            AuthError::MissingToken | AuthError::InvalidToken => 403,
        }
    }
}

/// Looks up a header by case-insensitive name.
fn header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Extracts the token from `Bearer <token>` or `Token <token>`.
pub fn bearer_token(authorization: &str) -> Option<&str> {
    let (scheme, token) = authorization.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("token"))
        .then_some(token)
        .filter(|token| !token.is_empty())
}

/// Checks an incoming connection and returns the connecting bot's id.
///
/// `connection` is `"http"` or `"websocket"`. When `access_token` is set,
/// the `Authorization` header must carry exactly that token.
pub fn authorize(
    connection: &str,
    headers: &HashMap<String, String>,
    access_token: Option<&str>,
) -> Result<String, AuthError> {
    if !matches!(connection, "http" | "websocket") {
        warn!(connection, "Unsupported connection type");
        return Err(AuthError::UnsupportedConnection(connection.to_string()));
    }

    let Some(self_id) = header(headers, "x-self-id").filter(|id| !id.is_empty()) else {
        warn!("Missing X-Self-ID header");
        return Err(AuthError::MissingSelfId);
    };

    if let Some(expected) = access_token.filter(|token| !token.is_empty()) {
        match header(headers, "authorization").and_then(bearer_token) {
            None => {
                warn!(self_id, "Missing Authorization header");
                return Err(AuthError::MissingToken);
            }
            Some(token) if token != expected => {
                warn!(self_id, "Authorization header is invalid");
                return Err(AuthError::InvalidToken);
            }
            Some(_) => {}
        }
    }

    Ok(self_id.to_string())
}
