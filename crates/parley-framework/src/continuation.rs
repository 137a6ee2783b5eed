//! Suspension points attached to handlers.
//!
//! A handler may declare that it needs one or more answers before it runs:
//!
//! - `receive(id)` wants the next event of the conversation, and
//!   `receive_any()` does the same without naming it,
//! - `got(key, prompt)` wants a value for `key`, asking with `prompt` when
//!   none has been collected yet.
//!
//! Points are checked in declaration order each time the handler is about to
//! run. The first unsatisfied point marks itself as the target, which makes
//! the executor send the prompt and suspend with the handler still at the
//! front of the chain. When the next event arrives the targeted point
//! captures it, clears the target and checking moves on to the following
//! point. A point that already holds a value is satisfied whatever the
//! target says. Asking again goes through [`ParleyContext::retarget_arg`]
//! or [`ParleyContext::retarget_receive`], which let the next event
//! overwrite the answer.

use std::fmt;

use tracing::debug;

use parley_core::state::{LAST_RECEIVE_KEY, arg_key, receive_key};

use crate::argfilter::{ArgFilter, run_filters};
use crate::context::ParleyContext;
use crate::outcome::Outcome;

/// A value a handler waits for.
#[derive(Clone)]
pub enum SuspensionPoint {
    /// The next event, stored under `receive:<id>`. Without an id only the
    /// last-received slot is written.
    Receive { id: Option<String> },
    /// A value for `key`, stored as event and text.
    Got {
        key: String,
        prompt: Option<String>,
        filters: Vec<ArgFilter>,
    },
}

impl SuspensionPoint {
    pub fn receive(id: impl Into<String>) -> Self {
        SuspensionPoint::Receive {
            id: Some(id.into()),
        }
    }

    pub fn receive_any() -> Self {
        SuspensionPoint::Receive { id: None }
    }

    pub fn got(key: impl Into<String>, prompt: Option<String>, filters: Vec<ArgFilter>) -> Self {
        SuspensionPoint::Got {
            key: key.into(),
            prompt: prompt.filter(|p| !p.is_empty()),
            filters,
        }
    }

    /// The state key this point writes, which doubles as its target marker.
    pub fn marker(&self) -> String {
        match self {
            SuspensionPoint::Receive { id: Some(id) } => receive_key(id),
            SuspensionPoint::Receive { id: None } => LAST_RECEIVE_KEY.to_string(),
            SuspensionPoint::Got { key, .. } => arg_key(key),
        }
    }

    /// Checks this point against the current event.
    ///
    /// Returns `None` when satisfied and `Some` with the outcome that
    /// suspends the conversation otherwise.
    pub(crate) fn resolve(&self, ctx: &ParleyContext, validation_failure: &str) -> Option<Outcome> {
        let marker = self.marker();
        let mut state = ctx.state();

        if state.contains(&marker) && !state.is_reasked(&marker) {
            return None;
        }

        if state.target() == Some(marker.as_str()) {
            let event = ctx.event().clone();
            match self {
                SuspensionPoint::Receive { id } => {
                    debug!(receive = ?id, "Captured event for receive point");
                    state.set_received(id.as_deref(), event);
                }
                SuspensionPoint::Got { key, filters, .. } => {
                    match run_filters(filters, event.plain_text()) {
                        Ok(text) => {
                            debug!(arg = %key, "Captured argument");
                            state.set_arg(key, event, text);
                        }
                        Err(err) => {
                            debug!(arg = %key, error = %err, "Argument rejected by filter");
                            let prompt = err
                                .message
                                .unwrap_or_else(|| validation_failure.to_string());
                            return Some(Outcome::Reject(Some(prompt)));
                        }
                    }
                }
            }
            state.clear_target();
            return None;
        }

        state.set_target(marker);
        let prompt = match self {
            SuspensionPoint::Receive { .. } => None,
            SuspensionPoint::Got { prompt, .. } => prompt.clone(),
        };
        Some(Outcome::Reject(prompt))
    }
}

impl fmt::Debug for SuspensionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuspensionPoint::Receive { id } => f.debug_struct("Receive").field("id", id).finish(),
            SuspensionPoint::Got {
                key,
                prompt,
                filters,
            } => f
                .debug_struct("Got")
                .field("key", key)
                .field("prompt", prompt)
                .field("filters", &filters.len())
                .finish(),
        }
    }
}
