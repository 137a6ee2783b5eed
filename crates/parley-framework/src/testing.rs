//! Test doubles shared by the crate's unit tests.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use parley_core::{ApiResult, Bot, BoxedBot, BoxedEvent, Event, EventType, State};

use crate::context::ParleyContext;

#[derive(Debug, Clone)]
pub(crate) struct TestEvent {
    kind: EventType,
    user: Option<String>,
    group: Option<String>,
    text: String,
}

impl TestEvent {
    pub(crate) fn private(user: &str, text: &str) -> Self {
        Self {
            kind: EventType::Message,
            user: Some(user.to_string()),
            group: None,
            text: text.to_string(),
        }
    }

    pub(crate) fn group(group: &str, user: &str, text: &str) -> Self {
        Self {
            group: Some(group.to_string()),
            ..Self::private(user, text)
        }
    }

    pub(crate) fn notice(user: &str) -> Self {
        Self {
            kind: EventType::Notice,
            ..Self::private(user, "")
        }
    }
}

impl Event for TestEvent {
    fn event_name(&self) -> &'static str {
        "test.event"
    }

    fn platform(&self) -> &'static str {
        "test"
    }

    fn event_type(&self) -> EventType {
        self.kind
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn user_id(&self) -> Option<String> {
        self.user.clone()
    }

    fn group_id(&self) -> Option<String> {
        self.group.clone()
    }

    fn raw_message(&self) -> String {
        self.text.clone()
    }

    fn plain_text(&self) -> String {
        self.text.clone()
    }
}

pub(crate) fn event(event: TestEvent) -> BoxedEvent {
    BoxedEvent::new(event)
}

pub(crate) fn message(user: &str, text: &str) -> BoxedEvent {
    event(TestEvent::private(user, text))
}

pub(crate) fn notice(user: &str) -> BoxedEvent {
    event(TestEvent::notice(user))
}

/// A bot that records every message it is asked to send.
#[derive(Debug, Default)]
pub(crate) struct RecordingBot {
    sent: Mutex<Vec<String>>,
}

impl RecordingBot {
    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Bot for RecordingBot {
    fn id(&self) -> &str {
        "test-bot"
    }

    async fn call_api(&self, _action: &str, _params: Value) -> ApiResult<Value> {
        Ok(Value::Null)
    }

    async fn send(&self, _event: &dyn Event, message: &str) -> ApiResult<Value> {
        self.sent.lock().push(message.to_string());
        Ok(json!({ "message_id": 1 }))
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub(crate) fn bot() -> Arc<RecordingBot> {
    Arc::new(RecordingBot::default())
}

/// A standalone context with empty state, as a matcher instance would see it.
pub(crate) fn context(event: TestEvent) -> Arc<ParleyContext> {
    let bot: BoxedBot = bot();
    Arc::new(ParleyContext::new(
        BoxedEvent::new(event),
        bot,
        None,
        State::new(),
        false,
    ))
}
