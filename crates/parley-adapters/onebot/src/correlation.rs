//! Request/response correlation for a multiplexed connection.
//!
//! Every outbound call is tagged with a numeric id (the OneBot `echo`). The
//! reply comes back on the same connection as any other frame; the adapter
//! hands frames that carry an id to [`CorrelationTable::deliver`], which
//! resolves the matching [`PendingReply`].
//!
//! ```text
//! next_id() ──▶ register(id) ──▶ send request ──▶ wait(timeout)
//!                    │                                 ▲
//!                    └──── slot ◀──── deliver(reply) ──┘
//! ```
//!
//! A slot lives until it is resolved, its wait times out, or its
//! [`PendingReply`] is dropped. Delivery is at-most-once: replies for unknown
//! or already-removed ids are dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, trace};

use parley_core::{ApiError, ApiResult};

/// Ids wrap around at this bound.
pub const ID_BOUND: u64 = i64::MAX as u64;

type Slots = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

/// Pending outbound calls of one connection, keyed by correlation id.
#[derive(Debug)]
pub struct CorrelationTable {
    counter: AtomicU64,
    slots: Slots,
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the current counter value and advances it.
    ///
    /// Ids still waiting for a reply are skipped, so a live slot is never
    /// shadowed after the counter wraps.
    pub fn next_id(&self) -> u64 {
        loop {
            let id = match self
                .counter
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    Some((n + 1) % ID_BOUND)
                }) {
                Ok(id) | Err(id) => id,
            };
            if !self.slots.lock().contains_key(&id) {
                return id;
            }
        }
    }

    /// Installs a single-resolution slot for `id`.
    ///
    /// Must be called before the request is sent so a fast reply is never
    /// missed. Registering an id that is already pending replaces the old
    /// slot; its waiter sees [`ApiError::NotConnected`].
    pub fn register(&self, id: u64) -> PendingReply {
        let (tx, rx) = oneshot::channel();
        if self.slots.lock().insert(id, tx).is_some() {
            debug!(echo = id, "Replaced pending slot with the same id");
        }
        PendingReply {
            id,
            rx,
            slots: Arc::clone(&self.slots),
        }
    }

    /// Registers `id` and waits up to `limit` for its reply.
    pub async fn await_reply(&self, id: u64, limit: Duration) -> ApiResult<Value> {
        self.register(id).wait(limit).await
    }

    /// Routes an inbound reply to the call waiting for it.
    ///
    /// Returns `false` when the message carries no id or nobody is waiting
    /// for it any more.
    pub fn deliver(&self, message: &Value) -> bool {
        let Some(id) = correlation_id(message) else {
            return false;
        };
        let Some(tx) = self.slots.lock().remove(&id) else {
            debug!(echo = id, "Dropping reply with no pending call (timed out?)");
            return false;
        };
        // The waiter may have been dropped between removal and send.
        let delivered = tx.send(message.clone()).is_ok();
        trace!(echo = id, delivered, "Delivered API reply");
        delivered
    }

    /// Fails every pending call with [`ApiError::NotConnected`].
    ///
    /// Returns the number of calls that were waiting.
    pub fn fail_all(&self) -> usize {
        let mut slots = self.slots.lock();
        let count = slots.len();
        if count > 0 {
            debug!(count, "Clearing pending API calls");
        }
        slots.clear();
        count
    }

    pub fn pending_count(&self) -> usize {
        self.slots.lock().len()
    }
}

/// The receiving half of a registered slot.
///
/// Dropping it removes the slot, so an abandoned call leaves nothing behind.
#[derive(Debug)]
pub struct PendingReply {
    id: u64,
    rx: oneshot::Receiver<Value>,
    slots: Slots,
}

impl PendingReply {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits for the reply.
    ///
    /// # Errors
    /// [`ApiError::Timeout`] when nothing arrives within `limit`, and
    /// [`ApiError::NotConnected`] when the slot was cleared.
    pub async fn wait(mut self, limit: Duration) -> ApiResult<Value> {
        match timeout(limit, &mut self.rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(ApiError::NotConnected),
            Err(_) => {
                debug!(echo = self.id, timeout = ?limit, "API call timed out");
                Err(ApiError::Timeout)
            }
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.rx.close();
        let mut slots = self.slots.lock();
        // Only remove our own slot; a replacement registered under the same
        // id belongs to someone else.
        if slots.get(&self.id).is_some_and(|tx| tx.is_closed()) {
            slots.remove(&self.id);
        }
    }
}

/// Reads the correlation id of an inbound frame.
///
/// Accepts both `"echo": 7` and `"echo": {"seq": 7}`.
pub fn correlation_id(message: &Value) -> Option<u64> {
    match message.get("echo")? {
        Value::Object(echo) => echo.get("seq").and_then(Value::as_u64),
        echo => echo.as_u64(),
    }
}
