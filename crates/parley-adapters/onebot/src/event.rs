//! OneBot v11 events.
//!
//! ```text
//! OneBotEvent (tagged by post_type)
//! ├── Message     { message_type: private | group }
//! ├── Notice      { notice_type, ... }
//! ├── Request     { request_type, ... }
//! └── MetaEvent   { meta_event_type: lifecycle | heartbeat }
//! ```
//!
//! Each variant is boxed on its own, so handlers downcast straight to
//! [`MessageEvent`], [`NoticeEvent`] and so on.

use std::any::Any;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use parley_core::{AdapterResult, BoxedEvent, Event, EventType};

use crate::message::{self, Addressed};

const PLATFORM: &str = "onebot";

/// Any inbound OneBot event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "post_type", rename_all = "snake_case")]
pub enum OneBotEvent {
    Message(MessageEvent),
    Notice(NoticeEvent),
    Request(RequestEvent),
    MetaEvent(MetaEvent),
}

impl OneBotEvent {
    /// Parses a raw JSON event.
    pub fn parse(value: Value) -> AdapterResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Boxes the inner event for dispatch.
    pub fn into_boxed(self) -> BoxedEvent {
        match self {
            OneBotEvent::Message(e) => BoxedEvent::new(e),
            OneBotEvent::Notice(e) => BoxedEvent::new(e),
            OneBotEvent::Request(e) => BoxedEvent::new(e),
            OneBotEvent::MetaEvent(e) => BoxedEvent::new(e),
        }
    }
}

// ============================================================================
// Message
// ============================================================================

/// Message sender information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sender {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub nickname: Option<String>,
    /// Group card (group nickname).
    #[serde(default)]
    pub card: Option<String>,
    /// Group role ("owner", "admin", "member").
    #[serde(default)]
    pub role: Option<String>,
}

/// A private or group message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub time: i64,
    pub self_id: i64,
    /// "private" or "group".
    pub message_type: String,
    #[serde(default)]
    pub sub_type: String,
    #[serde(default)]
    pub message_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub group_id: Option<i64>,
    /// The message as a CQ-code string.
    pub raw_message: String,
    #[serde(default)]
    pub sender: Sender,

    /// Whether the message addresses the bot. Set by [`preprocess`](Self::preprocess),
    /// and by the adapter when the message replies to one of the bot's own.
    #[serde(skip)]
    pub to_me: bool,
    /// The message this one replies to, as returned by `get_msg`.
    #[serde(skip)]
    pub reply: Option<Value>,
    #[serde(skip)]
    reply_id: Option<String>,
    /// The message with any reply code and mention of the bot removed.
    #[serde(skip)]
    content: Option<String>,
}

impl MessageEvent {
    pub fn is_private(&self) -> bool {
        self.message_type == "private"
    }

    /// Works out whether the message addresses the bot and strips the
    /// mention or nickname that did it. A reply code is taken out first and
    /// its target kept in [`reply_id`](Self::reply_id).
    pub fn preprocess(&mut self, nickname: Option<&Regex>) {
        let raw = match message::take_reply(&self.raw_message) {
            Some(reply) => {
                self.reply_id = Some(reply.id);
                reply.rest
            }
            None => self.raw_message.clone(),
        };
        let Addressed { content, to_me } = message::address(
            &raw,
            &self.self_id.to_string(),
            self.is_private(),
            nickname,
        );
        self.to_me = to_me;
        self.content = Some(content);
    }

    /// Id of the message this one replies to.
    pub fn reply_id(&self) -> Option<&str> {
        self.reply_id.as_deref()
    }

    /// Records the replied-to message fetched from the platform. A reply to
    /// one of the bot's own messages addresses the bot.
    pub fn set_reply(&mut self, replied: Value) {
        let author = replied.pointer("/sender/user_id").map(|id| match id {
            Value::String(id) => id.clone(),
            other => other.to_string(),
        });
        if author == Some(self.self_id.to_string()) {
            self.to_me = true;
        }
        self.reply = Some(replied);
    }

    /// The message as handlers see it, still carrying CQ codes.
    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or(&self.raw_message)
    }
}

impl Event for MessageEvent {
    fn event_name(&self) -> &'static str {
        match self.message_type.as_str() {
            "private" => "onebot.message.private",
            "group" => "onebot.message.group",
            _ => "onebot.message",
        }
    }

    fn platform(&self) -> &'static str {
        PLATFORM
    }

    fn event_type(&self) -> EventType {
        EventType::Message
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn self_id(&self) -> Option<String> {
        Some(self.self_id.to_string())
    }

    fn user_id(&self) -> Option<String> {
        Some(self.user_id.to_string())
    }

    fn group_id(&self) -> Option<String> {
        self.group_id.map(|id| id.to_string())
    }

    fn raw_message(&self) -> String {
        self.raw_message.clone()
    }

    fn plain_text(&self) -> String {
        message::plain_text(self.content())
    }

    fn is_to_me(&self) -> bool {
        self.to_me
    }
}

// ============================================================================
// Notice / Request / Meta
// ============================================================================

/// A notice (recall, membership change, poke, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeEvent {
    #[serde(default)]
    pub time: i64,
    pub self_id: i64,
    pub notice_type: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub group_id: Option<i64>,
    /// Type-specific fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event for NoticeEvent {
    fn event_name(&self) -> &'static str {
        "onebot.notice"
    }

    fn platform(&self) -> &'static str {
        PLATFORM
    }

    fn event_type(&self) -> EventType {
        EventType::Notice
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn self_id(&self) -> Option<String> {
        Some(self.self_id.to_string())
    }

    fn user_id(&self) -> Option<String> {
        self.user_id.map(|id| id.to_string())
    }

    fn group_id(&self) -> Option<String> {
        self.group_id.map(|id| id.to_string())
    }

    fn is_to_me(&self) -> bool {
        // Pokes aimed at the bot carry its id as target.
        self.extra.get("target_id").and_then(Value::as_i64) == Some(self.self_id)
    }
}

/// A friend or group-join request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEvent {
    #[serde(default)]
    pub time: i64,
    pub self_id: i64,
    pub request_type: String,
    pub user_id: i64,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub comment: String,
    /// Token to pass back when approving or rejecting.
    #[serde(default)]
    pub flag: String,
}

impl Event for RequestEvent {
    fn event_name(&self) -> &'static str {
        match self.request_type.as_str() {
            "friend" => "onebot.request.friend",
            "group" => "onebot.request.group",
            _ => "onebot.request",
        }
    }

    fn platform(&self) -> &'static str {
        PLATFORM
    }

    fn event_type(&self) -> EventType {
        EventType::Request
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn self_id(&self) -> Option<String> {
        Some(self.self_id.to_string())
    }

    fn user_id(&self) -> Option<String> {
        Some(self.user_id.to_string())
    }

    fn group_id(&self) -> Option<String> {
        self.group_id.map(|id| id.to_string())
    }
}

/// Lifecycle and heartbeat events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaEvent {
    #[serde(default)]
    pub time: i64,
    pub self_id: i64,
    pub meta_event_type: String,
    #[serde(default)]
    pub sub_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MetaEvent {
    pub fn is_heartbeat(&self) -> bool {
        self.meta_event_type == "heartbeat"
    }
}

impl Event for MetaEvent {
    fn event_name(&self) -> &'static str {
        if self.is_heartbeat() {
            "onebot.meta_event.heartbeat"
        } else {
            "onebot.meta_event.lifecycle"
        }
    }

    fn platform(&self) -> &'static str {
        PLATFORM
    }

    fn event_type(&self) -> EventType {
        EventType::Meta
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn self_id(&self) -> Option<String> {
        Some(self.self_id.to_string())
    }
}

/// Parses an event frame and runs message preprocessing.
pub fn parse_event(value: Value, nickname: Option<&Regex>) -> AdapterResult<BoxedEvent> {
    Ok(parse_preprocessed(value, nickname)?.into_boxed())
}

/// Like [`parse_event`], but leaves the event unboxed for further work.
pub fn parse_preprocessed(value: Value, nickname: Option<&Regex>) -> AdapterResult<OneBotEvent> {
    Ok(match OneBotEvent::parse(value)? {
        OneBotEvent::Message(mut message) => {
            message.preprocess(nickname);
            OneBotEvent::Message(message)
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::SessionId;
    use serde_json::json;

    fn group_message(raw: &str) -> Value {
        json!({
            "post_type": "message",
            "time": 1700000000,
            "self_id": 10,
            "message_type": "group",
            "sub_type": "normal",
            "message_id": 5,
            "user_id": 42,
            "group_id": 7,
            "message": raw,
            "raw_message": raw,
            "font": 0,
            "sender": { "user_id": 42, "nickname": "alice", "role": "member" }
        })
    }

    #[test]
    fn test_parse_group_message() {
        let event = parse_event(group_message("[CQ:at,qq=10] /echo hi"), None).unwrap();
        let message = event.downcast_ref::<MessageEvent>().unwrap();

        assert_eq!(event.event_name(), "onebot.message.group");
        assert_eq!(event.event_type(), EventType::Message);
        assert!(event.is_to_me());
        assert_eq!(event.plain_text(), "/echo hi");
        assert_eq!(event.session_id(), SessionId::from("group_7_42"));
        assert_eq!(message.sender.nickname.as_deref(), Some("alice"));
    }

    #[test]
    fn test_parse_private_message() {
        let event = parse_event(
            json!({
                "post_type": "message",
                "self_id": 10,
                "message_type": "private",
                "user_id": 42,
                "raw_message": "hello &amp; bye",
            }),
            None,
        )
        .unwrap();

        assert!(event.is_to_me());
        assert_eq!(event.plain_text(), "hello & bye");
        assert_eq!(event.session_id(), SessionId::from("42"));
    }

    #[test]
    fn test_parse_notice_and_meta() {
        let notice = parse_event(
            json!({
                "post_type": "notice",
                "self_id": 10,
                "notice_type": "notify",
                "sub_type": "poke",
                "user_id": 42,
                "group_id": 7,
                "target_id": 10,
            }),
            None,
        )
        .unwrap();
        assert_eq!(notice.event_type(), EventType::Notice);
        assert!(notice.is_to_me());
        let notice = notice.downcast_ref::<NoticeEvent>().unwrap();
        assert_eq!(notice.extra["sub_type"], "poke");

        let heartbeat = parse_event(
            json!({
                "post_type": "meta_event",
                "self_id": 10,
                "meta_event_type": "heartbeat",
                "interval": 5000,
            }),
            None,
        )
        .unwrap();
        assert_eq!(heartbeat.event_type(), EventType::Meta);
        assert_eq!(heartbeat.event_name(), "onebot.meta_event.heartbeat");
    }

    #[test]
    fn test_reply_code_is_taken_out() {
        let event = parse_preprocessed(group_message("[CQ:reply,id=55][CQ:at,qq=99] hi"), None)
            .unwrap();
        let OneBotEvent::Message(mut message) = event else {
            panic!("expected a message");
        };

        assert_eq!(message.reply_id(), Some("55"));
        assert!(!message.to_me);
        assert_eq!(message.plain_text(), "hi");

        message.set_reply(json!({ "message_id": 55, "sender": { "user_id": 99 } }));
        assert!(!message.to_me);
        message.set_reply(json!({ "message_id": 55, "sender": { "user_id": "10" } }));
        assert!(message.to_me);
        assert_eq!(message.reply.as_ref().unwrap()["message_id"], 55);
    }

    #[test]
    fn test_unknown_post_type_is_parse_error() {
        assert!(parse_event(json!({ "post_type": "message_sent", "self_id": 1 }), None).is_err());
    }
}
