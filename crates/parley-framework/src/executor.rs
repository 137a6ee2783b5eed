//! The handler state machine.
//!
//! Runs one [`MatcherInstance`] to completion or suspension:
//!
//! | Signal      | Effect                                                       |
//! |-------------|--------------------------------------------------------------|
//! | `Continue`  | next handler                                                 |
//! | `Skip`      | next handler                                                 |
//! | `Block`     | set the block flag, next handler                             |
//! | `Reject`    | put the handler back, suspend                                |
//! | `Pause`     | suspend with the remaining handlers                          |
//! | `Finish`    | drop the remaining handlers                                  |
//! | error       | log, drop the remaining handlers, no continuation            |
//!
//! Suspending sends the prompt first, then registers a single-use
//! continuation at priority 0 that blocks, carries a copy of the instance
//! state, and only accepts the same session until it expires.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, error, trace, warn};

use parley_core::EventType;

use crate::context::ParleyContext;
use crate::dispatcher::DispatchSettings;
use crate::matcher::{HandlerEntry, MatcherInstance, MatcherTemplate};
use crate::outcome::Outcome;
use crate::registry::MatcherRegistry;
use crate::rule::{Permission, Rule};

/// Priority continuations are registered at.
pub const CONTINUATION_PRIORITY: i32 = 0;

pub(crate) struct Executor<'a> {
    registry: &'a MatcherRegistry,
    settings: &'a DispatchSettings,
}

impl<'a> Executor<'a> {
    pub(crate) fn new(registry: &'a MatcherRegistry, settings: &'a DispatchSettings) -> Self {
        Self { registry, settings }
    }

    /// Runs the instance. Returns the block flag it ended with.
    pub(crate) async fn run(&self, mut instance: MatcherInstance) -> bool {
        let ctx = Arc::clone(&instance.ctx);
        let matcher = instance.template.label().to_string();

        while let Some(entry) = instance.handlers.pop_front() {
            let handler = entry.name();
            let signal = match self.check_points(&entry, &ctx) {
                Some(outcome) => Ok(outcome),
                None => {
                    trace!(matcher = %matcher, handler, "Running handler");
                    entry.handler().call(Arc::clone(&ctx)).await
                }
            };

            match signal {
                Ok(Outcome::Continue) => {}
                Ok(Outcome::Skip) => {
                    debug!(matcher = %matcher, handler, "Handler skipped");
                }
                Ok(Outcome::Block) => {
                    ctx.stop_propagation();
                }
                Ok(Outcome::Reject(prompt)) => {
                    debug!(matcher = %matcher, handler, "Handler rejected, waiting for next event");
                    instance.handlers.push_front(entry);
                    self.suspend(instance, prompt).await;
                    return ctx.is_blocking();
                }
                Ok(Outcome::Pause(prompt)) => {
                    debug!(matcher = %matcher, handler, "Handler paused, waiting for next event");
                    self.suspend(instance, prompt).await;
                    return ctx.is_blocking();
                }
                Ok(Outcome::Finish(message)) => {
                    debug!(matcher = %matcher, handler, "Conversation finished");
                    send_prompt(&ctx, message).await;
                    return ctx.is_blocking();
                }
                Err(err) => {
                    error!(
                        matcher = %matcher,
                        handler,
                        error = ?err,
                        "Handler failed, abandoning remaining handlers"
                    );
                    return ctx.is_blocking();
                }
            }
        }

        trace!(matcher = %matcher, "Handler chain complete");
        ctx.is_blocking()
    }

    fn check_points(
        &self,
        entry: &HandlerEntry,
        ctx: &ParleyContext,
    ) -> Option<Outcome> {
        entry
            .points()
            .iter()
            .find_map(|point| point.resolve(ctx, &self.settings.default_validation_failure))
    }

    /// Sends the prompt, then registers the continuation.
    async fn suspend(&self, instance: MatcherInstance, prompt: Option<String>) {
        let MatcherInstance {
            template,
            handlers,
            ctx,
        } = instance;

        send_prompt(&ctx, prompt).await;

        let continuation = continuation_of(
            &template,
            &ctx,
            handlers.into_iter().collect(),
            Instant::now() + self.settings.session_expire_timeout,
        );
        let handle = self.registry.register(continuation);
        debug!(
            matcher = template.label(),
            continuation = handle.id(),
            session = %ctx.session_id(),
            "Registered continuation"
        );
    }
}

fn continuation_of(
    template: &MatcherTemplate,
    ctx: &ParleyContext,
    handlers: Vec<HandlerEntry>,
    expire_at: Instant,
) -> MatcherTemplate {
    let event_type = match &template.type_updater {
        Some(update) => update(ctx),
        None => EventType::Message,
    };
    let permission = match &template.permission_updater {
        Some(update) => update(ctx, &template.permission),
        None => Permission::session(ctx.session_id().clone(), template.permission.clone()),
    };

    MatcherTemplate {
        id: 0,
        name: template.name.clone(),
        type_filter: Some(event_type),
        rule: Rule::new(),
        permission,
        handlers,
        priority: CONTINUATION_PRIORITY,
        block: true,
        temp: true,
        expire_at: Some(expire_at),
        default_state: ctx.snapshot_state(),
        type_updater: template.type_updater.clone(),
        permission_updater: template.permission_updater.clone(),
        owner: Some(ctx.session_id().clone()),
        commands: Vec::new(),
    }
}

async fn send_prompt(ctx: &ParleyContext, prompt: Option<String>) {
    let Some(prompt) = prompt.filter(|p| !p.is_empty()) else {
        return;
    };
    if let Err(err) = ctx.send(&prompt).await {
        warn!(error = %err, session = %ctx.session_id(), "Failed to send prompt");
    }
}
