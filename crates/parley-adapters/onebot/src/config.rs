//! Configuration for the OneBot adapter.
//!
//! Read from the `adapters.onebot` table of the runtime configuration:
//!
//! ```toml
//! [adapters.onebot]
//! access_token = "secret"
//! api_timeout_secs = 30
//! nickname = ["parley", "pal"]
//! ```

use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::message::nickname_pattern;

/// OneBot adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OneBotConfig {
    /// Token connecting implementations must present. Empty or absent
    /// disables the check.
    pub access_token: Option<String>,

    /// Seconds to wait for an API reply.
    pub api_timeout_secs: u64,

    /// Names that address the bot when they start a message.
    pub nickname: Vec<String>,
}

impl Default for OneBotConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            api_timeout_secs: 30,
            nickname: Vec::new(),
        }
    }
}

impl OneBotConfig {
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Compiles the nickname list into the prefix pattern used by
    /// preprocessing.
    pub fn nickname_pattern(&self) -> Result<Option<Regex>, regex::Error> {
        nickname_pattern(&self.nickname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: OneBotConfig = serde_json::from_value(json!({ "nickname": ["pal"] })).unwrap();
        assert_eq!(config.api_timeout(), Duration::from_secs(30));
        assert!(config.access_token().is_none());
        assert!(config.nickname_pattern().unwrap().is_some());
    }

    #[test]
    fn test_empty_token_disables_check() {
        let config = OneBotConfig {
            access_token: Some(String::new()),
            ..Default::default()
        };
        assert!(config.access_token().is_none());
    }
}
