//! Event dispatcher for the Parley framework.
//!
//! The [`Dispatcher`] walks the registry's priority groups in ascending order
//! for every event:
//!
//! 1. Message events are resolved against the command table once, up front.
//! 2. Within a group, each live template whose type filter, permission and
//!    rule accept the event gets a fresh instance, run to completion or
//!    suspension. Single-use templates are removed before they run.
//! 3. If any instance in the group ended with its block flag set, lower
//!    groups are skipped.
//!
//! Handler failures are logged and never escape `dispatch`.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{Instrument, debug, debug_span, trace};

use parley_core::{BoxedBot, BoxedEvent, EventType};

use crate::command::CommandSyntax;
use crate::context::ParleyContext;
use crate::executor::Executor;
use crate::matcher::MatcherInstance;
use crate::registry::MatcherRegistry;

/// Default lifetime of a suspended conversation.
pub const DEFAULT_SESSION_EXPIRE_TIMEOUT: Duration = Duration::from_secs(120);

/// Default prompt when an argument filter rejects input without a message.
pub const DEFAULT_VALIDATION_FAILURE: &str =
    "That doesn't look right. Please check your input and send it again.";

/// Tunables shared by every dispatch.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// How long a continuation waits for the next event.
    pub session_expire_timeout: Duration,
    /// Start markers and separators for command resolution.
    pub syntax: CommandSyntax,
    /// Prompt used when an argument filter fails without one.
    pub default_validation_failure: String,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            session_expire_timeout: DEFAULT_SESSION_EXPIRE_TIMEOUT,
            syntax: CommandSyntax::default(),
            default_validation_failure: DEFAULT_VALIDATION_FAILURE.to_string(),
        }
    }
}

/// The central event dispatcher.
///
/// Cheap to clone; clones share the registry and settings.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<MatcherRegistry>,
    settings: Arc<DispatchSettings>,
}

impl Dispatcher {
    /// Creates a dispatcher with default settings.
    pub fn new(registry: Arc<MatcherRegistry>) -> Self {
        Self::with_settings(registry, DispatchSettings::default())
    }

    pub fn with_settings(registry: Arc<MatcherRegistry>, settings: DispatchSettings) -> Self {
        Self {
            registry,
            settings: Arc::new(settings),
        }
    }

    pub fn registry(&self) -> &Arc<MatcherRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Dispatches an event to the registered matchers.
    ///
    /// Returns `true` if at least one matcher ran.
    pub async fn dispatch(&self, event: BoxedEvent, bot: BoxedBot) -> bool {
        let span = debug_span!(
            "dispatch",
            event_name = event.event_name(),
            session = %event.session_id(),
        );
        self.dispatch_inner(event, bot).instrument(span).await
    }

    async fn dispatch_inner(&self, event: BoxedEvent, bot: BoxedBot) -> bool {
        let event_type = event.event_type();
        let command = match event_type {
            EventType::Message => self
                .registry
                .commands()
                .resolve(&self.settings.syntax, &event.plain_text()),
            _ => None,
        };
        if let Some(command) = &command {
            debug!(command = %command.name, "Resolved command");
        }

        let executor = Executor::new(&self.registry, &self.settings);
        let mut handled = false;

        for (priority, group) in self.registry.snapshot_by_priority() {
            let mut stop = false;

            for template in group {
                if template.is_expired(Instant::now()) || !template.accepts(event_type) {
                    continue;
                }

                let ctx = Arc::new(ParleyContext::new(
                    event.clone(),
                    Arc::clone(&bot),
                    command.clone(),
                    template.default_state.clone(),
                    template.block,
                ));

                if !template.permission.allows(&ctx).await {
                    trace!(matcher = template.label(), "Permission denied");
                    continue;
                }
                if !template.rule.matches(&ctx).await {
                    trace!(matcher = template.label(), "Rule not matched");
                    continue;
                }
                // Another dispatch may have consumed the same continuation.
                if template.temp && !self.registry.remove(template.handle()) {
                    continue;
                }

                debug!(
                    matcher = template.label(),
                    priority,
                    "Matcher triggered"
                );
                handled = true;
                stop |= executor
                    .run(MatcherInstance::new(Arc::clone(&template), ctx))
                    .await;
            }

            if stop {
                debug!(priority, "Propagation stopped");
                break;
            }
        }

        handled
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("matcher_count", &self.registry.len())
            .field("settings", &self.settings)
            .finish()
    }
}
