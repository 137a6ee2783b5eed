//! OneBot v11 Bot implementation.
//!
//! [`OneBotBot`] is the outbound half of a connection. Calls go through an
//! [`ApiCaller`], so the bot does not care how requests travel.
//!
//! ```rust,ignore
//! async fn handler(bot: Arc<OneBotBot>, event: EventContext<MessageEvent>) {
//!     bot.send_with(event.as_event(), "pong", true).await.ok();
//! }
//! ```

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use parley_core::{ApiError, ApiResult, Bot, Event};

use crate::api_caller::ApiCaller;
use crate::message;

/// A OneBot v11 bot account.
pub struct OneBotBot {
    id: String,
    caller: Arc<dyn ApiCaller>,
}

impl OneBotBot {
    pub fn new(id: impl Into<String>, caller: Arc<dyn ApiCaller>) -> Self {
        Self {
            id: id.into(),
            caller,
        }
    }

    /// Replies to `event`, mentioning the sender first when `at_sender` is
    /// set and the reply goes to a group.
    pub async fn send_with(
        &self,
        event: &dyn Event,
        message: &str,
        at_sender: bool,
    ) -> ApiResult<Value> {
        let params = reply_params(event, message, at_sender)?;
        self.caller.call("send_msg", params).await
    }

    pub async fn send_private_msg(&self, user_id: i64, message: &str) -> ApiResult<Value> {
        self.caller
            .call(
                "send_private_msg",
                json!({ "user_id": user_id, "message": message }),
            )
            .await
    }

    pub async fn send_group_msg(&self, group_id: i64, message: &str) -> ApiResult<Value> {
        self.caller
            .call(
                "send_group_msg",
                json!({ "group_id": group_id, "message": message }),
            )
            .await
    }

    /// Fetches a message by id.
    pub async fn get_msg(&self, message_id: &str) -> ApiResult<Value> {
        self.caller
            .call(
                "get_msg",
                json!({ "message_id": id_value(message_id.to_string()) }),
            )
            .await
    }

    pub async fn get_login_info(&self) -> ApiResult<Value> {
        self.caller.call("get_login_info", json!({})).await
    }
}

impl std::fmt::Debug for OneBotBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OneBotBot")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Bot for OneBotBot {
    fn id(&self) -> &str {
        &self.id
    }

    async fn call_api(&self, action: &str, params: Value) -> ApiResult<Value> {
        self.caller.call(action, params).await
    }

    async fn send(&self, event: &dyn Event, message: &str) -> ApiResult<Value> {
        self.send_with(event, message, false).await
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Ids are numbers on the wire; anything else is passed through as text.
fn id_value(id: String) -> Value {
    id.parse::<i64>().map_or(Value::String(id), Value::from)
}

/// Builds `send_msg` parameters replying to `event`.
///
/// The message type follows the event: group when it has a group, private
/// when it only has a user.
///
/// # Errors
/// [`ApiError::MissingSession`] when the event has neither.
pub fn reply_params(event: &dyn Event, message: &str, at_sender: bool) -> ApiResult<Value> {
    let user_id = event.user_id();
    let (message_type, mut params) = match (event.group_id(), user_id.clone()) {
        (Some(group), _) => ("group", json!({ "group_id": id_value(group) })),
        (None, Some(user)) => ("private", json!({ "user_id": id_value(user) })),
        (None, None) => return Err(ApiError::MissingSession),
    };
    params["message_type"] = json!(message_type);
    if let Some(user) = &user_id {
        params["user_id"] = id_value(user.clone());
    }

    let message = match user_id {
        Some(user) if at_sender && message_type == "group" => {
            format!("{} {message}", message::at(&user))
        }
        _ => message.to_string(),
    };
    params["message"] = json!(message);
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use parley_core::downcast_bot;

    use crate::event::OneBotEvent;

    /// Records calls and answers with a fixed message id.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl ApiCaller for Recorder {
        async fn call(&self, action: &str, params: Value) -> ApiResult<Value> {
            self.calls.lock().push((action.to_string(), params));
            Ok(json!({ "message_id": 1 }))
        }
    }

    fn event(value: Value) -> parley_core::BoxedEvent {
        OneBotEvent::parse(value).unwrap().into_boxed()
    }

    fn group_event() -> parley_core::BoxedEvent {
        event(json!({
            "post_type": "message", "self_id": 10, "message_type": "group",
            "user_id": 42, "group_id": 7, "raw_message": "hi"
        }))
    }

    #[tokio::test]
    async fn test_send_replies_to_group() {
        let recorder = Arc::new(Recorder::default());
        let bot = OneBotBot::new("10", recorder.clone());

        bot.send(&*group_event(), "pong").await.unwrap();

        let calls = recorder.calls.lock();
        assert_eq!(calls[0].0, "send_msg");
        assert_eq!(calls[0].1["message_type"], "group");
        assert_eq!(calls[0].1["group_id"], 7);
        assert_eq!(calls[0].1["message"], "pong");
    }

    #[test]
    fn test_at_sender_only_in_groups() {
        let params = reply_params(&*group_event(), "pong", true).unwrap();
        assert_eq!(params["message"], "[CQ:at,qq=42] pong");

        let private = event(json!({
            "post_type": "message", "self_id": 10, "message_type": "private",
            "user_id": 42, "raw_message": "hi"
        }));
        let params = reply_params(&*private, "pong", true).unwrap();
        assert_eq!(params["message_type"], "private");
        assert_eq!(params["message"], "pong");
    }

    #[test]
    fn test_event_without_origin_cannot_be_answered() {
        let meta = event(json!({
            "post_type": "meta_event", "self_id": 10, "meta_event_type": "heartbeat"
        }));
        assert!(matches!(
            reply_params(&*meta, "x", false),
            Err(ApiError::MissingSession)
        ));
    }

    #[test]
    fn test_downcast_from_boxed_bot() {
        let bot: parley_core::BoxedBot =
            Arc::new(OneBotBot::new("10", Arc::new(Recorder::default())));
        assert!(downcast_bot::<OneBotBot>(bot).is_some());
    }
}
