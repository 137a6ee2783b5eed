//! OneBot v11 adapter.
//!
//! One [`OneBotAdapter`] serves one connection. The transport collaborator
//! owns the socket and drives the adapter:
//!
//! ```rust,ignore
//! let self_id = authorize("websocket", &headers, config.access_token())?;
//! let (tx, mut outbound) = mpsc::channel(64);
//! let adapter = OneBotAdapter::connect(self_id, config, tx)?;
//!
//! // inbound frames
//! if let Some(event) = adapter.on_frame(&frame).await {
//!     dispatcher.dispatch(event, adapter.bot()).await;
//! }
//! // outbound frames: write everything received on `outbound`
//! // on close:
//! adapter.on_disconnect();
//! ```
//!
//! Frames carrying an `echo` are replies to API calls and never reach the
//! dispatcher. Everything else is parsed as an event. A message that
//! replies to another one costs a `get_msg` call in
//! [`on_frame`](Adapter::on_frame), which marks it as addressed to the bot
//! when the quoted message is the bot's own.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use parley_core::{Adapter, AdapterError, AdapterResult, Bot, BoxedBot, BoxedEvent};

use crate::api_caller::{ApiCaller, CorrelatedApiCaller};
use crate::bot::OneBotBot;
use crate::config::OneBotConfig;
use crate::event::{MessageEvent, OneBotEvent, parse_preprocessed};

/// The OneBot v11 adapter for one connection.
pub struct OneBotAdapter {
    config: OneBotConfig,
    nickname: Option<Regex>,
    caller: Arc<CorrelatedApiCaller>,
    bot: Arc<OneBotBot>,
}

impl OneBotAdapter {
    /// Sets up an authorized connection for bot `self_id`.
    ///
    /// API requests are written to `outbound` as serialized JSON.
    pub fn connect(
        self_id: impl Into<String>,
        config: OneBotConfig,
        outbound: mpsc::Sender<Vec<u8>>,
    ) -> AdapterResult<Self> {
        let self_id = self_id.into();
        let nickname = config
            .nickname_pattern()
            .map_err(|e| AdapterError::Internal(format!("invalid nickname: {e}")))?;
        let caller =
            Arc::new(CorrelatedApiCaller::new(outbound).with_timeout(config.api_timeout()));
        let bot = Arc::new(OneBotBot::new(
            self_id.clone(),
            Arc::clone(&caller) as Arc<dyn ApiCaller>,
        ));

        info!(bot_id = %self_id, "OneBot connection established");
        Ok(Self {
            config,
            nickname,
            caller,
            bot,
        })
    }

    pub fn config(&self) -> &OneBotConfig {
        &self.config
    }

    /// The bot handlers reply through.
    pub fn bot(&self) -> BoxedBot {
        Arc::clone(&self.bot) as BoxedBot
    }

    pub fn onebot(&self) -> Arc<OneBotBot> {
        Arc::clone(&self.bot)
    }

    /// Number of API calls waiting for a reply.
    pub fn pending_calls(&self) -> usize {
        self.caller.table().pending_count()
    }

    /// Fetches the message `event` replies to, if any, and records it.
    ///
    /// A failed lookup is logged and leaves the event as it was.
    pub async fn check_reply(&self, event: &mut MessageEvent) {
        let Some(id) = event.reply_id().map(str::to_string) else {
            return;
        };
        match self.bot.get_msg(&id).await {
            Ok(replied) => {
                event.set_reply(replied);
                trace!(reply_to = %id, to_me = event.to_me, "Resolved replied-to message");
            }
            Err(e) => {
                warn!(reply_to = %id, error = %e, "Failed to fetch replied-to message");
            }
        }
    }

    fn decode(&self, data: &[u8]) -> Option<OneBotEvent> {
        let value = match serde_json::from_slice::<Value>(data) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Received a frame that is not JSON");
                return None;
            }
        };

        if value.get("echo").is_some() {
            if !self.caller.on_incoming_response(&value) {
                trace!(echo = ?value.get("echo"), "Dropped unmatched API reply");
            }
            return None;
        }

        match parse_preprocessed(value, self.nickname.as_ref()) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(error = %e, "Failed to parse OneBot event");
                None
            }
        }
    }

    fn received(&self, event: OneBotEvent) -> BoxedEvent {
        let event = event.into_boxed();
        let name = event.event_name();
        if name == "onebot.meta_event.heartbeat" {
            trace!(bot_id = %self.bot.id(), "Received heartbeat");
        } else {
            debug!(bot_id = %self.bot.id(), event = %name, "Received event");
        }
        event
    }
}

#[async_trait]
impl Adapter for OneBotAdapter {
    fn name(&self) -> &'static str {
        "onebot"
    }

    fn on_message(&self, data: &[u8]) -> Option<BoxedEvent> {
        self.decode(data).map(|event| self.received(event))
    }

    async fn on_frame(&self, data: &[u8]) -> Option<BoxedEvent> {
        let event = match self.decode(data)? {
            OneBotEvent::Message(mut message) => {
                self.check_reply(&mut message).await;
                OneBotEvent::Message(message)
            }
            other => other,
        };
        Some(self.received(event))
    }

    fn on_disconnect(&self) {
        self.caller.on_disconnect();
        info!(bot_id = %self.bot.id(), "OneBot connection closed");
    }
}
