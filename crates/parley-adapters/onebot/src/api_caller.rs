//! How a [`OneBotBot`](crate::bot::OneBotBot) reaches the other side.
//!
//! The bot only knows the [`ApiCaller`] trait. [`CorrelatedApiCaller`] is the
//! implementation for full-duplex connections: requests are written to the
//! transport's outbound channel tagged with an `echo` id, and the reply is
//! routed back through the [`CorrelationTable`].

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::debug;

use parley_core::{ApiError, ApiResult, TransportError};

use crate::correlation::CorrelationTable;

/// Default time to wait for an API reply.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport-specific API call mechanism.
#[async_trait]
pub trait ApiCaller: Send + Sync {
    /// Makes an API call and returns the reply's `data` payload.
    ///
    /// # Errors
    /// Fails when the request cannot be sent, no reply arrives in time, the
    /// connection goes away, or the reply carries a failure status.
    async fn call(&self, action: &str, params: Value) -> ApiResult<Value>;

    /// Offers an inbound frame that may be a reply.
    ///
    /// Returns `true` if it resolved a pending call.
    fn on_incoming_response(&self, _data: &Value) -> bool {
        false
    }

    /// Called when the connection closes. Pending calls must fail.
    fn on_disconnect(&self) {}
}

/// [`ApiCaller`] that multiplexes calls over one connection using `echo` ids.
#[derive(Debug)]
pub struct CorrelatedApiCaller {
    outbound: mpsc::Sender<Vec<u8>>,
    table: CorrelationTable,
    api_timeout: Duration,
}

impl CorrelatedApiCaller {
    /// Creates a caller writing requests to `outbound`.
    pub fn new(outbound: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            outbound,
            table: CorrelationTable::new(),
            api_timeout: DEFAULT_API_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, api_timeout: Duration) -> Self {
        self.api_timeout = api_timeout;
        self
    }

    pub fn api_timeout(&self) -> Duration {
        self.api_timeout
    }

    pub fn table(&self) -> &CorrelationTable {
        &self.table
    }
}

#[async_trait]
impl ApiCaller for CorrelatedApiCaller {
    async fn call(&self, action: &str, params: Value) -> ApiResult<Value> {
        let echo = self.table.next_id();
        // Registered before sending so a fast reply cannot be missed.
        let pending = self.table.register(echo);

        let request = json!({
            "action": action,
            "params": params,
            "echo": echo,
        });
        debug!(action = %action, echo, "Calling OneBot API");

        let bytes = serde_json::to_vec(&request)?;
        self.outbound
            .send(bytes)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;

        let reply = pending.wait(self.api_timeout).await?;
        interpret_reply(reply)
    }

    fn on_incoming_response(&self, data: &Value) -> bool {
        self.table.deliver(data)
    }

    fn on_disconnect(&self) {
        self.table.fail_all();
    }
}

/// Turns a reply envelope into the call's result.
///
/// `status == "failed"` becomes [`ApiError::Failed`] with the reply's
/// `retcode`; anything else yields the `data` field.
pub fn interpret_reply(reply: Value) -> ApiResult<Value> {
    let Value::Object(mut reply) = reply else {
        return Ok(Value::Null);
    };
    if reply.get("status").and_then(Value::as_str) == Some("failed") {
        let retcode = reply.get("retcode").and_then(Value::as_i64).unwrap_or(-1);
        let message = ["wording", "message", "msg"]
            .iter()
            .find_map(|key| reply.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();
        return Err(ApiError::Failed { retcode, message });
    }
    Ok(reply.remove("data").unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_interpret_reply() {
        let ok = interpret_reply(json!({
            "status": "ok", "retcode": 0, "data": { "message_id": 7 }, "echo": 1
        }))
        .unwrap();
        assert_eq!(ok, json!({ "message_id": 7 }));

        let err = interpret_reply(json!({
            "status": "failed", "retcode": 1400, "wording": "bad request"
        }))
        .unwrap_err();
        match err {
            ApiError::Failed { retcode, message } => {
                assert_eq!(retcode, 1400);
                assert_eq!(message, "bad request");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(interpret_reply(json!({ "status": "async" })).unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_call_round_trip_through_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let caller = Arc::new(CorrelatedApiCaller::new(tx));

        let call = tokio::spawn({
            let caller = Arc::clone(&caller);
            async move { caller.call("get_login_info", json!({})).await }
        });

        let request: Value = serde_json::from_slice(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(request["action"], "get_login_info");
        let echo = request["echo"].clone();

        assert!(caller.on_incoming_response(&json!({
            "status": "ok", "retcode": 0, "data": { "user_id": 10 }, "echo": echo
        })));
        let data = call.await.unwrap().unwrap();
        assert_eq!(data["user_id"], 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_times_out() {
        let (tx, _rx) = mpsc::channel(4);
        let caller = CorrelatedApiCaller::new(tx).with_timeout(Duration::from_secs(5));

        let err = caller.call("get_status", json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout));
        assert_eq!(caller.table().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_channel_is_transport_error() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let caller = CorrelatedApiCaller::new(tx);

        let err = caller.call("get_status", json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(caller.table().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_fails_pending_call() {
        let (tx, mut rx) = mpsc::channel(4);
        let caller = Arc::new(CorrelatedApiCaller::new(tx));

        let call = tokio::spawn({
            let caller = Arc::clone(&caller);
            async move { caller.call("get_status", json!({})).await }
        });
        rx.recv().await.unwrap();

        caller.on_disconnect();
        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(err, ApiError::NotConnected));
    }
}
