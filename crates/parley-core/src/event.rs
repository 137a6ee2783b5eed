//! Event system for the Parley engine.
//!
//! - [`Event`] - Base trait every adapter event implements
//! - [`EventType`] - Coarse classification used by matcher type filters
//! - [`BoxedEvent`] - Type-erased, cheaply cloneable event handle
//! - [`EventContext<T>`] - Typed view over a downcast event
//!
//! Events are shared, never copied: a handler that captures an event into
//! conversation state holds the same allocation the dispatcher received.

use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::session::SessionId;

// ============================================================================
// Event Type Classification
// ============================================================================

/// Classification of event types.
///
/// Matchers filter on this value without knowing the concrete event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Private or group chat messages.
    Message,
    /// Notices (membership changes, recalls, pokes).
    Notice,
    /// Requests (friend or group join requests).
    Request,
    /// Lifecycle and heartbeat events.
    #[serde(alias = "meta_event")]
    Meta,
    /// Anything an adapter cannot classify.
    Other,
}

impl EventType {
    /// Returns the lowercase wire name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Message => "message",
            EventType::Notice => "notice",
            EventType::Request => "request",
            EventType::Meta => "meta",
            EventType::Other => "other",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "message" => EventType::Message,
            "notice" => EventType::Notice,
            "request" => EventType::Request,
            "meta" | "meta_event" => EventType::Meta,
            _ => EventType::Other,
        })
    }
}

// ============================================================================
// Core Event Trait
// ============================================================================

/// The base trait for all events flowing through the engine.
///
/// Only [`event_name`](Event::event_name), [`platform`](Event::platform) and
/// [`as_any`](Event::as_any) are required. Everything else has a neutral
/// default so that non-message events stay small.
pub trait Event: Any + Send + Sync {
    /// Returns the human-readable name of this event type.
    fn event_name(&self) -> &'static str;

    /// Returns the platform/adapter name (e.g., "onebot").
    fn platform(&self) -> &'static str;

    /// Returns the high-level event type classification.
    fn event_type(&self) -> EventType {
        EventType::Other
    }

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// The id of the bot account that received this event.
    fn self_id(&self) -> Option<String> {
        None
    }

    /// The id of the user who caused the event.
    fn user_id(&self) -> Option<String> {
        None
    }

    /// The group the event happened in, if any.
    fn group_id(&self) -> Option<String> {
        None
    }

    /// The channel the event happened in, if any.
    fn channel_id(&self) -> Option<String> {
        None
    }

    /// The message as received, including any platform markup.
    fn raw_message(&self) -> String {
        String::new()
    }

    /// The message with platform markup removed.
    ///
    /// Command resolution and argument capture both work on this form.
    fn plain_text(&self) -> String {
        String::new()
    }

    /// Whether the event was addressed to the bot.
    fn is_to_me(&self) -> bool {
        false
    }

    /// The conversation this event belongs to.
    fn session_id(&self) -> SessionId {
        SessionId::from_origin(
            self.user_id().as_deref(),
            self.group_id().as_deref(),
            self.channel_id().as_deref(),
        )
    }
}

// ============================================================================
// Event Context
// ============================================================================

/// Typed wrapper around a downcast event.
///
/// Handlers ask for `EventContext<T>` to receive their concrete event type;
/// fields are reachable through `Deref`.
#[derive(Clone)]
pub struct EventContext<T: Event + Clone> {
    data: T,
}

impl<T: Event + Clone> EventContext<T> {
    /// Creates a new EventContext with the given data.
    pub fn new(data: T) -> Self {
        Self { data }
    }

    /// Returns a reference to the event as a trait object.
    pub fn as_event(&self) -> &dyn Event {
        &self.data
    }

    /// Unwraps the inner event.
    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<T: Event + Clone> Deref for EventContext<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T: Event + Clone + fmt::Debug> fmt::Debug for EventContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventContext")
            .field("data", &self.data)
            .finish()
    }
}

// ============================================================================
// Boxed Event
// ============================================================================

/// A type-erased container for events that supports runtime downcasting.
///
/// `BoxedEvent` derefs to `dyn Event`, so trait methods are callable
/// directly:
///
/// ```rust,ignore
/// let event: BoxedEvent = /* ... */;
/// let text = event.plain_text();
/// let session = event.session_id();
/// ```
#[derive(Clone)]
pub struct BoxedEvent {
    inner: Arc<dyn Event>,
}

impl BoxedEvent {
    /// Creates a new `BoxedEvent` from any type implementing `Event`.
    pub fn new<E: Event + 'static>(event: E) -> Self {
        Self {
            inner: Arc::new(event),
        }
    }

    /// Returns the inner `Arc<dyn Event>`.
    pub fn inner(&self) -> &Arc<dyn Event> {
        &self.inner
    }

    /// Attempts to downcast to a concrete event type.
    pub fn downcast_ref<E: Event + 'static>(&self) -> Option<&E> {
        self.inner.as_any().downcast_ref()
    }

    /// Returns `true` if the event is of type `E`.
    pub fn is<E: Event + 'static>(&self) -> bool {
        self.inner.as_any().is::<E>()
    }

    /// Returns `true` if both handles point at the same event.
    pub fn ptr_eq(&self, other: &BoxedEvent) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Deref for BoxedEvent {
    type Target = dyn Event;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl fmt::Debug for BoxedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedEvent")
            .field("event_name", &self.event_name())
            .field("platform", &self.platform())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Ping {
        user: &'static str,
    }

    impl Event for Ping {
        fn event_name(&self) -> &'static str {
            "test.ping"
        }

        fn platform(&self) -> &'static str {
            "test"
        }

        fn event_type(&self) -> EventType {
            EventType::Message
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn user_id(&self) -> Option<String> {
            Some(self.user.to_string())
        }
    }

    #[test]
    fn test_event_type_from_str() {
        assert_eq!("Message".parse::<EventType>(), Ok(EventType::Message));
        assert_eq!("meta_event".parse::<EventType>(), Ok(EventType::Meta));
        assert_eq!("bogus".parse::<EventType>(), Ok(EventType::Other));
    }

    #[test]
    fn test_boxed_event_downcast_and_identity() {
        let event = BoxedEvent::new(Ping { user: "42" });
        let copy = event.clone();

        assert!(event.is::<Ping>());
        assert_eq!(event.downcast_ref::<Ping>().map(|p| p.user), Some("42"));
        assert!(event.ptr_eq(&copy));
        assert!(!event.ptr_eq(&BoxedEvent::new(Ping { user: "42" })));
    }

    #[test]
    fn test_default_session_id_uses_user() {
        let event = BoxedEvent::new(Ping { user: "42" });
        assert_eq!(event.session_id().as_str(), "42");
    }
}
