//! Parley Runtime - process lifecycle for the Parley dispatch engine.
//!
//! This crate provides:
//! - Layered configuration: defaults, `parley.toml` (plus profile
//!   variants) and `PARLEY_*` environment variables
//! - Logging setup on top of `tracing-subscriber`
//! - [`ParleyRuntime`], which owns the matcher registry and dispatcher,
//!   applies inbound filters, runs the optional expiry sweep and handles
//!   shutdown
//!
//! ```ignore
//! use parley_runtime::ParleyRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = ParleyRuntime::builder().build()?;
//!
//!     runtime.register(on_command("ping").handler(|| async { Outcome::finish("pong") }));
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod logging;
pub mod runtime;

pub use config::{
    BotConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig, ParleyConfig, Profile,
    RuntimeConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use filter::{EventFilter, FilterChain};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{ParleyRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
