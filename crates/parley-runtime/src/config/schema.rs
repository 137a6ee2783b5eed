//! Configuration schema definitions.
//!
//! ```toml
//! [logging]
//! level = "debug"
//! format = "pretty"
//!
//! [logging.filters]
//! parley_framework = "trace"
//!
//! [bot]
//! command_start = ["/", "!"]
//! command_sep = ["."]
//! superusers = ["10001"]
//! session_expire_timeout_secs = 60
//!
//! [runtime]
//! sweep_interval_secs = 30
//!
//! [adapters.onebot]
//! access_token = "secret"
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use parley_framework::{DEFAULT_SESSION_EXPIRE_TIMEOUT, DEFAULT_VALIDATION_FAILURE};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    pub logging: LoggingConfig,
    pub bot: BotConfig,
    pub runtime: RuntimeConfig,
    /// Adapter sections, keyed by adapter name. Each adapter deserializes
    /// its own section.
    pub adapters: HashMap<String, serde_json::Value>,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    #[cfg(feature = "json-log")]
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// How often file output starts a new file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Target file when `output = "file"`.
    pub file_path: Option<PathBuf>,
    pub rotation: LogRotation,
    /// Per-module levels, e.g. `parley_framework = "trace"`.
    pub filters: HashMap<String, LogLevel>,
    pub span_events: SpanEventConfig,
    pub thread_ids: bool,
    /// Include file and line of each event.
    pub file_location: bool,
}

// =============================================================================
// Bot
// =============================================================================

/// Dispatch behaviour shared by every bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Literal command start markers.
    pub command_start: Vec<String>,
    /// Regex start markers, matched at the start of the message.
    pub command_start_patterns: Vec<String>,
    /// Literal separators between command name segments.
    pub command_sep: Vec<String>,
    /// Regex separators between command name segments.
    pub command_sep_patterns: Vec<String>,
    /// User ids allowed through `Permission::superuser`.
    pub superusers: Vec<String>,
    /// How long a suspended conversation waits for its next event.
    pub session_expire_timeout_secs: u64,
    /// Prompt sent when an argument filter rejects input without one.
    pub default_validation_failure: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            command_start: vec!["/".to_string()],
            command_start_patterns: Vec::new(),
            command_sep: vec![".".to_string()],
            command_sep_patterns: Vec::new(),
            superusers: Vec::new(),
            session_expire_timeout_secs: DEFAULT_SESSION_EXPIRE_TIMEOUT.as_secs(),
            default_validation_failure: DEFAULT_VALIDATION_FAILURE.to_string(),
        }
    }
}

impl BotConfig {
    pub fn session_expire_timeout(&self) -> Duration {
        Duration::from_secs(self.session_expire_timeout_secs)
    }
}

// =============================================================================
// Runtime
// =============================================================================

/// Process-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Interval of the background expiry sweep. Absent or 0 leaves expiry
    /// to dispatch.
    pub sweep_interval_secs: Option<u64>,
}

impl RuntimeConfig {
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
