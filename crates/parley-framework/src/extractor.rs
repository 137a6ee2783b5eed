//! Extractor system for the Parley framework.
//!
//! [`FromContext`] defines how a handler parameter is pulled out of a
//! [`ParleyContext`]. Built-in extractors:
//!
//! | Type                    | Yields                                          |
//! |-------------------------|-------------------------------------------------|
//! | [`BoxedEvent`]          | the event, type-erased                          |
//! | [`EventContext<T>`]     | the event downcast to `T` (skips otherwise)     |
//! | [`BoxedBot`]            | the bot, type-erased                            |
//! | `Arc<T: Bot>`           | the bot downcast to `T` (skips otherwise)       |
//! | [`SessionId`]           | the conversation id                             |
//! | [`Conversation`]        | state, captured answers, replies, propagation   |
//! | [`CommandArg`](crate::CommandArg) | text after a resolved command         |
//! | `Option<T>`             | `T`, or `None` instead of skipping              |

use std::ops::Deref;
use std::sync::Arc;

use parley_core::{Bot, BoxedBot, BoxedEvent, Event, EventContext, SessionId, downcast_bot};

use crate::context::ParleyContext;
use crate::error::{ExtractError, ExtractResult};
use crate::outcome::Outcome;

/// A trait for types that can be extracted from a [`ParleyContext`].
///
/// When extraction fails the handler is skipped rather than failed.
///
/// ```rust,ignore
/// struct Nickname(String);
///
/// impl FromContext for Nickname {
///     fn from_context(ctx: &Arc<ParleyContext>) -> ExtractResult<Self> {
///         ctx.state()
///             .get_text("nickname")
///             .map(|n| Nickname(n.to_string()))
///             .ok_or_else(|| ExtractError::custom("no nickname yet"))
///     }
/// }
/// ```
pub trait FromContext: Sized {
    /// Attempts to extract this type from the given context.
    fn from_context(ctx: &Arc<ParleyContext>) -> ExtractResult<Self>;
}

impl FromContext for BoxedEvent {
    fn from_context(ctx: &Arc<ParleyContext>) -> ExtractResult<Self> {
        Ok(ctx.event().clone())
    }
}

impl<T: Event + Clone> FromContext for EventContext<T> {
    fn from_context(ctx: &Arc<ParleyContext>) -> ExtractResult<Self> {
        ctx.event()
            .downcast_ref::<T>()
            .cloned()
            .map(EventContext::new)
            .ok_or_else(|| ExtractError::EventTypeMismatch {
                expected: std::any::type_name::<T>(),
                got: ctx.event().event_name(),
            })
    }
}

impl FromContext for BoxedBot {
    fn from_context(ctx: &Arc<ParleyContext>) -> ExtractResult<Self> {
        Ok(ctx.bot_arc())
    }
}

impl<T: Bot> FromContext for Arc<T> {
    fn from_context(ctx: &Arc<ParleyContext>) -> ExtractResult<Self> {
        downcast_bot::<T>(ctx.bot_arc()).ok_or(ExtractError::BotTypeMismatch {
            expected: std::any::type_name::<T>(),
        })
    }
}

impl FromContext for SessionId {
    fn from_context(ctx: &Arc<ParleyContext>) -> ExtractResult<Self> {
        Ok(ctx.session_id().clone())
    }
}

impl<T: FromContext> FromContext for Option<T> {
    fn from_context(ctx: &Arc<ParleyContext>) -> ExtractResult<Self> {
        Ok(T::from_context(ctx).ok())
    }
}

// ============================================================================
// Conversation
// ============================================================================

/// A handler's view of the running matcher instance.
///
/// Derefs to [`ParleyContext`], so state, captured answers and
/// [`send`](ParleyContext::send) are all reachable from it.
///
/// ```rust,ignore
/// on_command("age")
///     .got("years", "How old are you?")
///     .handler(|conv: Conversation| async move {
///         let years = conv.arg_text("years").unwrap_or_default();
///         if years.parse::<u8>().is_err() {
///             return conv.reject_arg("years", "Please send a number.");
///         }
///         Outcome::finish(format!("You are {years}."))
///     })
/// ```
#[derive(Clone, Debug)]
pub struct Conversation(Arc<ParleyContext>);

impl Conversation {
    /// Asks for got point `key` again, even if it already holds a value.
    pub fn reject_arg(&self, key: &str, prompt: impl Into<String>) -> Outcome {
        self.0.retarget_arg(key);
        Outcome::Reject(non_empty(prompt.into()))
    }

    /// Asks for receive point `id` again.
    pub fn reject_receive(&self, id: &str, prompt: impl Into<String>) -> Outcome {
        self.0.retarget_receive(id);
        Outcome::Reject(non_empty(prompt.into()))
    }

    /// Asks for an anonymous receive point again.
    pub fn reject_receive_any(&self, prompt: impl Into<String>) -> Outcome {
        self.0.retarget_receive_any();
        Outcome::Reject(non_empty(prompt.into()))
    }

    /// Returns the underlying context.
    pub fn context(&self) -> &Arc<ParleyContext> {
        &self.0
    }
}

fn non_empty(prompt: String) -> Option<String> {
    (!prompt.is_empty()).then_some(prompt)
}

impl Deref for Conversation {
    type Target = ParleyContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromContext for Conversation {
    fn from_context(ctx: &Arc<ParleyContext>) -> ExtractResult<Self> {
        Ok(Conversation(Arc::clone(ctx)))
    }
}

/// The text captured by a got point, by key.
///
/// Implement this on a marker type to pull one argument directly:
///
/// ```rust,ignore
/// struct City;
/// impl ArgKey for City { const KEY: &'static str = "city"; }
///
/// async fn forecast(city: Arg<City>) { /* city.value */ }
/// ```
pub trait ArgKey: Send + Sync + 'static {
    const KEY: &'static str;
}

/// Extracts the text captured by got point `K::KEY`.
pub struct Arg<K: ArgKey> {
    pub value: String,
    _key: std::marker::PhantomData<fn() -> K>,
}

impl<K: ArgKey> Clone for Arg<K> {
    fn clone(&self) -> Self {
        Arg {
            value: self.value.clone(),
            _key: std::marker::PhantomData,
        }
    }
}

impl<K: ArgKey> std::fmt::Debug for Arg<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arg")
            .field("key", &K::KEY)
            .field("value", &self.value)
            .finish()
    }
}

impl<K: ArgKey> Deref for Arg<K> {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<K: ArgKey> FromContext for Arg<K> {
    fn from_context(ctx: &Arc<ParleyContext>) -> ExtractResult<Self> {
        ctx.arg_text(K::KEY)
            .map(|value| Arg {
                value,
                _key: std::marker::PhantomData,
            })
            .ok_or_else(|| ExtractError::MissingArg(K::KEY.to_string()))
    }
}
