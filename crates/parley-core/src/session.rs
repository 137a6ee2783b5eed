//! Conversation identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one conversation: a user in a private chat, or a user inside
/// a particular group or channel.
///
/// Continuations are scoped to the session that created them, so two users
/// talking in the same group never answer each other's prompts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps an already formatted session string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Builds the session id for an event's origin.
    ///
    /// A group takes precedence over a channel when both are present.
    pub fn from_origin(user: Option<&str>, group: Option<&str>, channel: Option<&str>) -> Self {
        let id = match (user, group, channel) {
            (Some(user), Some(group), _) => format!("group_{group}_{user}"),
            (Some(user), None, Some(channel)) => format!("channel_{channel}_{user}"),
            (Some(user), None, None) => user.to_string(),
            (None, Some(group), _) => format!("group_{group}"),
            (None, None, Some(channel)) => format!("channel_{channel}"),
            (None, None, None) => String::new(),
        };
        Self(id)
    }

    /// Returns the session as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for events that carry no origin at all.
    pub fn is_anonymous(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_formats() {
        assert_eq!(SessionId::from_origin(Some("1"), None, None).as_str(), "1");
        assert_eq!(
            SessionId::from_origin(Some("1"), Some("9"), None).as_str(),
            "group_9_1"
        );
        assert_eq!(
            SessionId::from_origin(Some("1"), None, Some("c")).as_str(),
            "channel_c_1"
        );
        assert_eq!(
            SessionId::from_origin(None, Some("9"), Some("c")).as_str(),
            "group_9"
        );
        assert!(SessionId::from_origin(None, None, None).is_anonymous());
    }
}
