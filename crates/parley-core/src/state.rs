//! Per-conversation state.
//!
//! A [`State`] is a string-keyed map owned by one matcher instance. It is
//! copied into every continuation the instance spawns, which is how answers
//! collected over several messages reach the handler that asked for them.
//!
//! Captured values are only ever inserted or overwritten, so a value
//! captured early in a conversation stays visible to every later step of
//! it. The two bookkeeping keys, `@target` and `@reask`, are dropped once
//! the point they name has captured an event.
//!
//! A handful of keys are reserved for the suspension machinery:
//!
//! | Key                | Holds                                          |
//! |--------------------|------------------------------------------------|
//! | `receive:<id>`     | event captured by a `receive` point            |
//! | `@last_receive`    | the most recent event captured by any receive  |
//! | `arg:<key>`        | event captured by a `got` point                |
//! | `arg_str:<key>`    | plain text of that event, after filters        |
//! | `@target`          | marker of the point awaiting the next event    |
//! | `@reask`           | marker of a point asked again over its answer  |

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::event::BoxedEvent;

/// Prefix of keys written by `receive` points.
pub const RECEIVE_KEY_PREFIX: &str = "receive:";
/// Key holding the most recently received event.
///
/// Lives outside [`RECEIVE_KEY_PREFIX`] so that no receive id can alias it.
pub const LAST_RECEIVE_KEY: &str = "@last_receive";
/// Prefix of keys holding events captured by `got` points.
pub const ARG_KEY_PREFIX: &str = "arg:";
/// Prefix of keys holding the text captured by `got` points.
pub const ARG_STR_KEY_PREFIX: &str = "arg_str:";
/// Key naming the suspension point that owns the next event.
pub const REJECT_TARGET: &str = "@target";
/// Key naming a point whose existing answer is to be replaced.
pub const REASK_TARGET: &str = "@reask";

/// Returns the state key for receive point `id`.
pub fn receive_key(id: &str) -> String {
    format!("{RECEIVE_KEY_PREFIX}{id}")
}

/// Returns the state key for the event of got point `key`.
pub fn arg_key(key: &str) -> String {
    format!("{ARG_KEY_PREFIX}{key}")
}

/// Returns the state key for the text of got point `key`.
pub fn arg_str_key(key: &str) -> String {
    format!("{ARG_STR_KEY_PREFIX}{key}")
}

/// A single state entry.
#[derive(Debug, Clone)]
pub enum StateValue {
    /// A captured event.
    Event(BoxedEvent),
    /// Plain text.
    Text(String),
    /// Arbitrary structured data written by handlers or rules.
    Json(Value),
}

impl StateValue {
    /// Returns the event if this entry holds one.
    pub fn as_event(&self) -> Option<&BoxedEvent> {
        match self {
            StateValue::Event(event) => Some(event),
            _ => None,
        }
    }

    /// Returns the text if this entry holds text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StateValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<BoxedEvent> for StateValue {
    fn from(event: BoxedEvent) -> Self {
        StateValue::Event(event)
    }
}

impl From<String> for StateValue {
    fn from(text: String) -> Self {
        StateValue::Text(text)
    }
}

impl From<&str> for StateValue {
    fn from(text: &str) -> Self {
        StateValue::Text(text.to_string())
    }
}

impl From<Value> for StateValue {
    fn from(value: Value) -> Self {
        StateValue::Json(value)
    }
}

/// String-keyed conversation state.
#[derive(Debug, Clone, Default)]
pub struct State {
    values: HashMap<String, StateValue>,
}

impl State {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry stored under `key`.
    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.values.get(key)
    }

    /// Returns `true` if `key` has been set.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Inserts or overwrites an entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<StateValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Serializes `value` and stores it under `key`.
    pub fn insert_json<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        self.values.insert(key.into(), StateValue::Json(value));
        Ok(())
    }

    /// Deserializes the JSON entry under `key`.
    ///
    /// Returns `None` when the key is absent, holds a non-JSON entry, or
    /// does not deserialize into `T`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.values.get(key)? {
            StateValue::Json(value) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }

    /// Returns the event stored under `key`.
    pub fn get_event(&self, key: &str) -> Option<&BoxedEvent> {
        self.values.get(key).and_then(StateValue::as_event)
    }

    /// Returns the text stored under `key`.
    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(StateValue::as_text)
    }

    /// Copies every entry of `other` into `self`, overwriting on conflict.
    pub fn merge(&mut self, other: State) {
        self.values.extend(other.values);
    }

    /// Iterates over the keys currently set.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    // ------------------------------------------------------------------
    // Reserved keys
    // ------------------------------------------------------------------

    /// The marker of the point that owns the next event, if any.
    pub fn target(&self) -> Option<&str> {
        self.get_text(REJECT_TARGET)
    }

    /// Points the next event at the given marker.
    pub fn set_target(&mut self, marker: impl Into<String>) {
        self.values
            .insert(REJECT_TARGET.to_string(), StateValue::Text(marker.into()));
    }

    /// Points the next event at `marker` even if that point already holds
    /// an answer.
    pub fn set_reask_target(&mut self, marker: impl Into<String>) {
        let marker = marker.into();
        self.values
            .insert(REASK_TARGET.to_string(), StateValue::Text(marker.clone()));
        self.set_target(marker);
    }

    /// Returns `true` if `marker` was asked again and has not captured yet.
    pub fn is_reasked(&self, marker: &str) -> bool {
        self.get_text(REASK_TARGET) == Some(marker)
    }

    /// Drops the target once its point has captured an event.
    pub fn clear_target(&mut self) {
        self.values.remove(REJECT_TARGET);
        self.values.remove(REASK_TARGET);
    }

    /// The event captured by receive point `id`.
    pub fn received(&self, id: &str) -> Option<&BoxedEvent> {
        self.get_event(&receive_key(id))
    }

    /// The event captured by the most recent receive point.
    pub fn last_received(&self) -> Option<&BoxedEvent> {
        self.get_event(LAST_RECEIVE_KEY)
    }

    /// Records `event` as the answer to receive point `id`.
    ///
    /// An anonymous point (`None`) only updates the last-received slot.
    pub fn set_received(&mut self, id: Option<&str>, event: BoxedEvent) {
        if let Some(id) = id {
            self.values
                .insert(receive_key(id), StateValue::Event(event.clone()));
        }
        self.values
            .insert(LAST_RECEIVE_KEY.to_string(), StateValue::Event(event));
    }

    /// The event captured by got point `key`.
    pub fn arg(&self, key: &str) -> Option<&BoxedEvent> {
        self.get_event(&arg_key(key))
    }

    /// The text captured by got point `key`.
    pub fn arg_text(&self, key: &str) -> Option<&str> {
        self.get_text(&arg_str_key(key))
    }

    /// Records `event` and its text as the answer to got point `key`.
    pub fn set_arg(&mut self, key: &str, event: BoxedEvent, text: impl Into<String>) {
        self.values.insert(arg_key(key), StateValue::Event(event));
        self.values
            .insert(arg_str_key(key), StateValue::Text(text.into()));
    }
}
