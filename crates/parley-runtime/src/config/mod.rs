//! Configuration for the Parley runtime.
//!
//! Layered loading ([`ConfigLoader`]), the schema ([`ParleyConfig`]) and the
//! conversion of the `[bot]` section into dispatch settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, ENV_PREFIX, Profile, load_config, load_config_from_file};
pub use schema::{
    BotConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, ParleyConfig,
    RuntimeConfig, SpanEventConfig,
};
pub use validation::{dispatch_settings, validate_config};
