//! # Parley Framework
//!
//! Conversation-aware event dispatch.
//!
//! This layer provides:
//! - Matchers: type filter, permission, rule, priority and a handler chain
//! - A priority-ordered registry that also owns the command table
//! - Axum-style handlers with [`FromContext`] parameter extraction
//! - The five-signal handler state machine (continue, skip, reject, pause,
//!   finish, plus block)
//! - Multi-turn conversations through `got`/`receive` suspension points and
//!   single-use continuation matchers
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use parley_framework::{Conversation, Dispatcher, MatcherRegistry, Outcome, on_command};
//!
//! let registry = Arc::new(MatcherRegistry::new());
//! on_command("greet")
//!     .got("name", "What's your name?")
//!     .handler(|conv: Conversation| async move {
//!         let name = conv.arg_text("name").unwrap_or_default();
//!         Outcome::finish(format!("Hello, {name}!"))
//!     })
//!     .register(&registry);
//!
//! let dispatcher = Dispatcher::new(registry);
//! dispatcher.dispatch(event, bot).await;
//! ```

pub mod argfilter;
pub mod command;
pub mod context;
pub mod continuation;
pub mod dispatcher;
pub mod error;
mod executor;
pub mod extractor;
pub mod handler;
pub mod matcher;
pub mod matcher_builders;
pub mod outcome;
pub mod registry;
pub mod rule;

#[cfg(test)]
mod testing;

pub use command::{
    CommandArg, CommandGroup, CommandName, CommandSyntax, CommandTable, Pattern, ResolvedCommand,
    on_command,
};
pub use context::ParleyContext;
pub use continuation::SuspensionPoint;
pub use dispatcher::{
    DEFAULT_SESSION_EXPIRE_TIMEOUT, DEFAULT_VALIDATION_FAILURE, DispatchSettings, Dispatcher,
};
pub use error::{CommandError, ExtractError, ExtractResult, ValidateError};
pub use executor::CONTINUATION_PRIORITY;
pub use extractor::{Arg, ArgKey, Conversation, FromContext};
pub use handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler, HandlerFn, into_handler};
pub use matcher::{HandlerEntry, Matcher, MatcherTemplate};
pub use matcher_builders::{
    on, on_keyword, on_message, on_meta, on_notice, on_regex, on_request, on_startswith,
};
pub use outcome::{HandlerResult, IntoOutcome, Outcome};
pub use registry::{MatcherId, MatcherRegistry};
pub use rule::{Permission, Rule};
