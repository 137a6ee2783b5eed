//! Per-instance execution context.
//!
//! One [`ParleyContext`] exists per matcher instance per event. It carries the
//! event, the bot that received it, the instance's private [`State`] and the
//! instance's block flag. Permission checks, rules and every handler in the
//! chain see the same context, so state written by a rule is visible to the
//! handlers that follow it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;

use parley_core::{ApiResult, BoxedBot, BoxedEvent, SessionId, State};

use crate::command::ResolvedCommand;

/// The context object passed to rules, permissions and handlers.
///
/// The state lock is synchronous. Take it, read or write, and let the guard
/// drop before the next `.await`.
pub struct ParleyContext {
    event: BoxedEvent,
    bot: BoxedBot,
    session: SessionId,
    command: Option<ResolvedCommand>,
    state: Mutex<State>,
    blocking: AtomicBool,
}

impl ParleyContext {
    pub(crate) fn new(
        event: BoxedEvent,
        bot: BoxedBot,
        command: Option<ResolvedCommand>,
        state: State,
        block: bool,
    ) -> Self {
        let session = event.session_id();
        Self {
            event,
            bot,
            session,
            command,
            state: Mutex::new(state),
            blocking: AtomicBool::new(block),
        }
    }

    /// Returns the event being handled.
    pub fn event(&self) -> &BoxedEvent {
        &self.event
    }

    /// Returns the bot that received the event.
    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }

    /// Returns a clone of the bot handle.
    pub fn bot_arc(&self) -> BoxedBot {
        Arc::clone(&self.bot)
    }

    /// Returns the session the event belongs to.
    pub fn session_id(&self) -> &SessionId {
        &self.session
    }

    /// Returns the command the event resolved to, if any.
    pub fn command(&self) -> Option<&ResolvedCommand> {
        self.command.as_ref()
    }

    /// Locks the instance state.
    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock()
    }

    /// Returns a copy of the instance state.
    pub fn snapshot_state(&self) -> State {
        self.state.lock().clone()
    }

    /// Stops lower-priority groups from seeing this event.
    ///
    /// Handlers after the current one in this chain still run.
    pub fn stop_propagation(&self) {
        self.blocking.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once the instance blocks further propagation.
    pub fn is_blocking(&self) -> bool {
        self.blocking.load(Ordering::SeqCst)
    }

    /// Replies to the conversation the event came from.
    pub async fn send(&self, message: &str) -> ApiResult<Value> {
        self.bot.send(&*self.event, message).await
    }

    /// The text captured by got point `key`.
    pub fn arg_text(&self, key: &str) -> Option<String> {
        self.state.lock().arg_text(key).map(str::to_string)
    }

    /// The event captured by got point `key`.
    pub fn arg(&self, key: &str) -> Option<BoxedEvent> {
        self.state.lock().arg(key).cloned()
    }

    /// The event captured by receive point `id`.
    pub fn received(&self, id: &str) -> Option<BoxedEvent> {
        self.state.lock().received(id).cloned()
    }

    /// The event captured by the most recent receive point.
    pub fn last_received(&self) -> Option<BoxedEvent> {
        self.state.lock().last_received().cloned()
    }

    /// Aims the next event at got point `key`, replacing the answer it
    /// holds once the event arrives.
    ///
    /// Return [`Outcome::Reject`](crate::Outcome::Reject) afterwards to ask
    /// again.
    pub fn retarget_arg(&self, key: &str) {
        self.state
            .lock()
            .set_reask_target(parley_core::state::arg_key(key));
    }

    /// Aims the next event at receive point `id`.
    pub fn retarget_receive(&self, id: &str) {
        self.state
            .lock()
            .set_reask_target(parley_core::state::receive_key(id));
    }

    /// Aims the next event at an anonymous receive point.
    pub fn retarget_receive_any(&self) {
        self.state
            .lock()
            .set_reask_target(parley_core::state::LAST_RECEIVE_KEY);
    }
}

impl std::fmt::Debug for ParleyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParleyContext")
            .field("event", &self.event)
            .field("session", &self.session)
            .field("command", &self.command)
            .field("is_blocking", &self.is_blocking())
            .finish_non_exhaustive()
    }
}
