//! Adapter trait.
//!
//! An adapter sits between a raw connection and the dispatcher. It turns
//! inbound frames into events and routes API replies to whoever is waiting
//! for them. Owning the socket is left to the transport collaborator.

use std::sync::Arc;

use async_trait::async_trait;

use crate::event::BoxedEvent;

/// Protocol adapter for one connection.
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// Returns the adapter's name (e.g., "onebot").
    fn name(&self) -> &'static str;

    /// Handles one inbound frame.
    ///
    /// Replies to pending API calls are consumed here and yield `None`.
    /// Frames that parse as events are returned for dispatch. Malformed
    /// frames are logged and dropped.
    fn on_message(&self, data: &[u8]) -> Option<BoxedEvent>;

    /// Handles one inbound frame, including preprocessing that has to call
    /// back into the platform before the event can be dispatched.
    ///
    /// The default implementation is [`on_message`](Self::on_message).
    /// While this future is pending, API replies must still reach
    /// `on_message`, so a read loop awaiting it inline will stall until the
    /// call times out.
    async fn on_frame(&self, data: &[u8]) -> Option<BoxedEvent> {
        self.on_message(data)
    }

    /// Called by the transport when the connection is lost.
    ///
    /// Implementations fail every outstanding API call. The default
    /// implementation does nothing.
    fn on_disconnect(&self) {}
}

/// A shared Adapter trait object.
pub type BoxedAdapter = Arc<dyn Adapter>;
