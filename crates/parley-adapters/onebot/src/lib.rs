//! # Parley Adapter for OneBot v11
//!
//! Connects the Parley dispatch engine to OneBot v11 implementations.
//!
//! ## Overview
//!
//! - [`authorize`]: checks an incoming connection and yields the bot id
//! - [`OneBotAdapter`]: turns inbound frames into events and routes API
//!   replies to the calls waiting for them
//! - [`OneBotBot`]: the outbound side, implementing [`parley_core::Bot`]
//! - [`CorrelationTable`]: matches replies to calls by `echo` id
//!
//! ## Event Hierarchy
//!
//! ```text
//! OneBotEvent
//! ├── MessageEvent  (private, group)
//! ├── NoticeEvent
//! ├── RequestEvent
//! └── MetaEvent     (lifecycle, heartbeat)
//! ```
//!
//! Message events are preprocessed before dispatch: a private message, a
//! mention of the bot at either end, or a configured nickname at the start
//! marks the event as addressed to the bot, and the mention is stripped.
//! A reply code is stripped as well; when the quoted message turns out to
//! be the bot's own, the event is addressed to the bot too.

pub mod adapter;
pub mod api_caller;
pub mod auth;
pub mod bot;
pub mod config;
pub mod correlation;
pub mod event;
pub mod message;

pub use adapter::OneBotAdapter;
pub use api_caller::{ApiCaller, CorrelatedApiCaller, DEFAULT_API_TIMEOUT, interpret_reply};
pub use auth::{AuthError, authorize};
pub use bot::OneBotBot;
pub use config::OneBotConfig;
pub use correlation::{CorrelationTable, PendingReply};
pub use event::{MessageEvent, MetaEvent, NoticeEvent, OneBotEvent, RequestEvent, Sender};
