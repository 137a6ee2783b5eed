//! # Parley Core
//!
//! Shared vocabulary of the Parley chat-event dispatch engine.
//!
//! This crate holds the types every other layer agrees on:
//!
//! - **Events**: type-erased events with runtime downcasting ([`Event`], [`BoxedEvent`])
//! - **Sessions**: conversation identity ([`SessionId`])
//! - **State**: per-conversation key/value store with reserved keys ([`State`])
//! - **Bots**: the outbound side of a connection ([`Bot`])
//! - **Adapters**: protocol glue between raw frames and events ([`Adapter`])
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌───────────┐
//! │  Transport  │────▶│  Adapter   │────▶│Dispatcher │
//! │ (external)  │◀────│  (OneBot)  │◀────│ (matchers)│
//! └─────────────┘     └────────────┘     └───────────┘
//! ```

pub mod adapter;
pub mod bot;
pub mod error;
pub mod event;
pub mod session;
pub mod state;

pub use adapter::{Adapter, BoxedAdapter};
pub use bot::{Bot, BoxedBot, downcast_bot};
pub use error::{
    AdapterError, AdapterResult, ApiError, ApiResult, TransportError, TransportResult,
};
pub use event::{BoxedEvent, Event, EventContext, EventType};
pub use session::SessionId;
pub use state::{State, StateValue};

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        Adapter, ApiError, ApiResult, Bot, BoxedBot, BoxedEvent, Event, EventContext, EventType,
        SessionId, State,
    };
}
