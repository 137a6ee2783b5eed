//! # Parley
//!
//! A conversation-aware chat-event dispatch engine.
//!
//! ## Overview
//!
//! Parley routes inbound chat events to prioritized matchers, resolves
//! command invocations, and keeps multi-turn conversations alive across
//! messages by suspending a handler until the user answers.
//!
//! ```text
//! ┌───────────┐    ┌──────────┐    ┌────────────┐    ┌──────────────────────┐
//! │ Transport │───▶│ Adapter  │───▶│ Dispatcher │───▶│ priority 0: replies  │
//! │ (yours)   │◀───│ (OneBot) │    │            │───▶│ priority 1: commands │
//! └───────────┘    └──────────┘    └────────────┘───▶│ ...                  │
//!                                                    └──────────────────────┘
//! ```
//!
//! - **Runtime**: configuration, logging, registry ownership and shutdown
//! - **Adapters**: turn raw frames into events and correlate API replies
//! - **Matchers**: type, permission and rule filters in front of a handler chain
//! - **Handlers**: async functions with extracted parameters, returning an [`Outcome`](prelude::Outcome)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parley::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = ParleyRuntime::builder().build()?;
//!
//!     runtime.register(
//!         on_command("weather")
//!             .got("city", "Which city?")
//!             .handler(|conv: Conversation| async move {
//!                 let city = conv.arg_text("city").unwrap_or_default();
//!                 Outcome::finish(format!("Sunny in {city}"))
//!             }),
//!     );
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `onebot`: OneBot v11 adapter
//! - `toml-config` (default) / `yaml-config`: configuration file formats
//! - `json-log`: JSON log output

pub use parley_core as core;
pub use parley_framework as framework;
pub use parley_runtime as runtime;

#[cfg(feature = "onebot")]
pub use parley_adapter_onebot as onebot;

/// Commonly used types for building bots.
///
/// ```rust,ignore
/// use parley::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use parley_runtime::{ParleyConfig, ParleyRuntime, RuntimeError, RuntimeResult};

    // Matcher builders
    pub use parley_framework::{
        CommandGroup, Matcher, on, on_command, on_keyword, on_message, on_meta, on_notice,
        on_regex, on_request, on_startswith,
    };

    // Handler results and extractors
    pub use parley_framework::{
        Arg, ArgKey, CommandArg, Conversation, FromContext, Outcome, ParleyContext,
        ResolvedCommand,
    };

    // Filters
    pub use parley_framework::argfilter::{self, ArgFilter};
    pub use parley_framework::{Permission, Rule};

    // Core types
    pub use parley_core::{Bot, BoxedBot, BoxedEvent, Event, EventContext, EventType, SessionId};

    // Logging macros
    pub use parley_runtime::prelude::*;
}
