//! Bot trait and related types.
//!
//! A [`Bot`] is the outbound half of a connection: handlers use it to reply
//! and to call platform APIs.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiResult;
use crate::event::Event;

/// An active bot account.
///
/// - `call_api`: raw API call with an action name and JSON parameters
/// - `send`: reply to wherever an event came from
///
/// Concrete implementations provide strongly-typed API methods on top of
/// `call_api`.
#[async_trait]
pub trait Bot: Send + Sync + 'static {
    /// Returns the bot's unique identifier.
    fn id(&self) -> &str;

    /// Calls a raw API with the given action name and parameters.
    ///
    /// Resolves with the reply payload, or fails with
    /// [`ApiError::Timeout`](crate::ApiError::Timeout) when no reply
    /// arrives in time.
    async fn call_api(&self, action: &str, params: Value) -> ApiResult<Value>;

    /// Sends `message` to the conversation `event` came from.
    async fn send(&self, event: &dyn Event, message: &str) -> ApiResult<Value>;

    /// Returns self as an `Arc<dyn Any>` for safe downcasting.
    ///
    /// Implementors should simply return `self`.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A shared Bot trait object.
pub type BoxedBot = Arc<dyn Bot>;

/// Downcasts a [`BoxedBot`] to a concrete bot type.
pub fn downcast_bot<T: Bot>(bot: BoxedBot) -> Option<Arc<T>> {
    bot.as_any().downcast::<T>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    struct Silent;

    #[async_trait]
    impl Bot for Silent {
        fn id(&self) -> &str {
            "silent"
        }

        async fn call_api(&self, _action: &str, _params: Value) -> ApiResult<Value> {
            Err(ApiError::NotConnected)
        }

        async fn send(&self, _event: &dyn Event, _message: &str) -> ApiResult<Value> {
            Err(ApiError::NotConnected)
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    struct Other;

    #[async_trait]
    impl Bot for Other {
        fn id(&self) -> &str {
            "other"
        }

        async fn call_api(&self, _action: &str, _params: Value) -> ApiResult<Value> {
            Ok(Value::Null)
        }

        async fn send(&self, _event: &dyn Event, _message: &str) -> ApiResult<Value> {
            Ok(Value::Null)
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    #[tokio::test]
    async fn test_downcast_bot() {
        let bot: BoxedBot = Arc::new(Silent);
        assert!(matches!(
            bot.call_api("noop", Value::Null).await,
            Err(ApiError::NotConnected)
        ));

        assert!(downcast_bot::<Other>(Arc::clone(&bot)).is_none());
        let silent = downcast_bot::<Silent>(bot).expect("downcast should succeed");
        assert_eq!(silent.id(), "silent");
    }
}
