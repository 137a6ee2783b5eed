//! Matcher system for the Parley framework.
//!
//! A [`MatcherTemplate`] is a registered recipe: which events it wants
//! (type filter, [`Permission`], [`Rule`]), where it sits (priority, block),
//! and the ordered chain of [`HandlerEntry`]s to run. Every event that
//! passes the checks gets its own [`MatcherInstance`] with a private copy of
//! the handler chain and state.
//!
//! Templates are built with [`Matcher`]:
//!
//! ```rust,ignore
//! use parley_framework::{on_command, Conversation, Outcome};
//!
//! on_command("weather")
//!     .priority(5)
//!     .block(true)
//!     .got("city", "Which city?")
//!     .handler(|conv: Conversation| async move {
//!         let city = conv.arg_text("city").unwrap_or_default();
//!         Outcome::finish(format!("Sunny in {city}"))
//!     })
//!     .register(&registry);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

use parley_core::{EventType, SessionId, State};

use crate::argfilter::ArgFilter;
use crate::command::CommandName;
use crate::context::ParleyContext;
use crate::continuation::SuspensionPoint;
use crate::handler::{BoxedHandler, Handler, into_handler};
use crate::registry::{MatcherId, MatcherRegistry};
use crate::rule::{Permission, Rule};

/// Chooses the event type a continuation listens for.
pub type TypeUpdater = Arc<dyn Fn(&ParleyContext) -> EventType + Send + Sync>;

/// Chooses the permission a continuation requires.
///
/// Receives the suspending instance's context and its template permission.
pub type PermissionUpdater = Arc<dyn Fn(&ParleyContext, &Permission) -> Permission + Send + Sync>;

/// Default priority for new matchers.
pub const DEFAULT_PRIORITY: i32 = 1;

// ============================================================================
// Handler Entry
// ============================================================================

/// A handler plus the suspension points that guard it.
#[derive(Clone)]
pub struct HandlerEntry {
    handler: BoxedHandler,
    points: Vec<SuspensionPoint>,
}

impl HandlerEntry {
    pub fn new(handler: BoxedHandler) -> Self {
        Self {
            handler,
            points: Vec::new(),
        }
    }

    pub fn with_points(handler: BoxedHandler, points: Vec<SuspensionPoint>) -> Self {
        Self { handler, points }
    }

    pub fn handler(&self) -> &BoxedHandler {
        &self.handler
    }

    pub fn points(&self) -> &[SuspensionPoint] {
        &self.points
    }

    pub fn name(&self) -> &'static str {
        self.handler.name()
    }
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("handler", &self.name())
            .field("points", &self.points)
            .finish()
    }
}

// ============================================================================
// Matcher Template
// ============================================================================

/// A registered matcher.
#[derive(Clone)]
pub struct MatcherTemplate {
    pub(crate) id: u64,
    pub(crate) name: Option<String>,
    pub(crate) type_filter: Option<EventType>,
    pub(crate) rule: Rule,
    pub(crate) permission: Permission,
    pub(crate) handlers: Vec<HandlerEntry>,
    pub(crate) priority: i32,
    pub(crate) block: bool,
    pub(crate) temp: bool,
    pub(crate) expire_at: Option<Instant>,
    pub(crate) default_state: State,
    pub(crate) type_updater: Option<TypeUpdater>,
    pub(crate) permission_updater: Option<PermissionUpdater>,
    pub(crate) owner: Option<SessionId>,
    pub(crate) commands: Vec<(CommandName, Vec<String>)>,
}

impl Default for MatcherTemplate {
    fn default() -> Self {
        Self {
            id: 0,
            name: None,
            type_filter: None,
            rule: Rule::new(),
            permission: Permission::everyone(),
            handlers: Vec::new(),
            priority: DEFAULT_PRIORITY,
            block: false,
            temp: false,
            expire_at: None,
            default_state: State::new(),
            type_updater: None,
            permission_updater: None,
            owner: None,
            commands: Vec::new(),
        }
    }
}

impl MatcherTemplate {
    /// The handle that removes this template from its registry.
    pub fn handle(&self) -> MatcherId {
        MatcherId::new(self.id, self.priority)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_blocking(&self) -> bool {
        self.block
    }

    /// Single-use templates are removed the moment they are triggered.
    pub fn is_temp(&self) -> bool {
        self.temp
    }

    pub fn type_filter(&self) -> Option<EventType> {
        self.type_filter
    }

    pub fn expire_at(&self) -> Option<Instant> {
        self.expire_at
    }

    /// The session a continuation belongs to.
    pub fn owner(&self) -> Option<&SessionId> {
        self.owner.as_ref()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn default_state(&self) -> &State {
        &self.default_state
    }

    /// Whether the template is past its expiry at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expire_at.is_some_and(|at| now > at)
    }

    /// Whether the template accepts events of type `event_type`.
    pub fn accepts(&self, event_type: EventType) -> bool {
        self.type_filter.is_none_or(|t| t == event_type)
    }
}

impl fmt::Debug for MatcherTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherTemplate")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type_filter", &self.type_filter)
            .field("priority", &self.priority)
            .field("block", &self.block)
            .field("temp", &self.temp)
            .field("expire_at", &self.expire_at)
            .field("handlers", &self.handlers)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Matcher Instance
// ============================================================================

/// One run of a template against one event.
///
/// The handler chain is a private copy; suspending hands what is left of it
/// to a continuation template.
pub(crate) struct MatcherInstance {
    pub(crate) template: Arc<MatcherTemplate>,
    pub(crate) handlers: VecDeque<HandlerEntry>,
    pub(crate) ctx: Arc<ParleyContext>,
}

impl MatcherInstance {
    pub(crate) fn new(template: Arc<MatcherTemplate>, ctx: Arc<ParleyContext>) -> Self {
        let handlers = template.handlers.iter().cloned().collect();
        Self {
            template,
            handlers,
            ctx,
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`MatcherTemplate`]s.
///
/// Suspension points declared with [`got`](Matcher::got) and
/// [`receive`](Matcher::receive) attach to the next
/// [`handler`](Matcher::handler) call.
#[derive(Clone, Default)]
pub struct Matcher {
    template: MatcherTemplate,
    pending: Vec<SuspensionPoint>,
}

impl Matcher {
    /// Creates a matcher that accepts every event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a name for logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.template.name = Some(name.into());
        self
    }

    /// Only accept events of `event_type`.
    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.template.type_filter = Some(event_type);
        self
    }

    /// Adds `rule` to the conjunction of rules.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.template.rule = std::mem::take(&mut self.template.rule).and(rule);
        self
    }

    /// Shorthand for a synchronous rule.
    pub fn check<F>(self, f: F) -> Self
    where
        F: Fn(&ParleyContext) -> bool + Send + Sync + 'static,
    {
        self.rule(Rule::sync(f))
    }

    /// Replaces the permission.
    pub fn permission(mut self, permission: Permission) -> Self {
        self.template.permission = permission;
        self
    }

    /// Lower values run first. Defaults to 1.
    pub fn priority(mut self, priority: i32) -> Self {
        self.template.priority = priority;
        self
    }

    /// When set, lower-priority groups never see events this matcher runs on.
    pub fn block(mut self, block: bool) -> Self {
        self.template.block = block;
        self
    }

    /// Removes the matcher after its first run.
    pub fn temp(mut self, temp: bool) -> Self {
        self.template.temp = temp;
        self
    }

    /// Drops the matcher once `at` has passed.
    pub fn expire_at(mut self, at: Instant) -> Self {
        self.template.expire_at = Some(at);
        self
    }

    /// Drops the matcher once `after` has elapsed from now.
    pub fn expire_after(self, after: Duration) -> Self {
        self.expire_at(Instant::now() + after)
    }

    /// Seeds every instance's state.
    pub fn default_state(mut self, state: State) -> Self {
        self.template.default_state = state;
        self
    }

    /// Decides the event type continuations listen for.
    pub fn type_updater<F>(mut self, f: F) -> Self
    where
        F: Fn(&ParleyContext) -> EventType + Send + Sync + 'static,
    {
        self.template.type_updater = Some(Arc::new(f));
        self
    }

    /// Decides the permission continuations require.
    pub fn permission_updater<F>(mut self, f: F) -> Self
    where
        F: Fn(&ParleyContext, &Permission) -> Permission + Send + Sync + 'static,
    {
        self.template.permission_updater = Some(Arc::new(f));
        self
    }

    /// Waits for the next event, stored under receive point `id`.
    pub fn receive(mut self, id: impl Into<String>) -> Self {
        self.pending.push(SuspensionPoint::receive(id));
        self
    }

    /// Waits for the next event without naming it; read it back with
    /// `last_received`. Satisfied at once if any receive point has already
    /// captured an event in this conversation.
    pub fn receive_any(mut self) -> Self {
        self.pending.push(SuspensionPoint::receive_any());
        self
    }

    /// Asks for `key` with `prompt` unless it was already collected.
    ///
    /// An empty prompt waits silently.
    pub fn got(self, key: impl Into<String>, prompt: impl Into<String>) -> Self {
        self.got_with(key, Some(prompt.into()), Vec::new())
    }

    /// Like [`got`](Self::got), running `filters` over the captured text.
    pub fn got_with(
        mut self,
        key: impl Into<String>,
        prompt: Option<String>,
        filters: Vec<ArgFilter>,
    ) -> Self {
        self.pending
            .push(SuspensionPoint::got(key, prompt, filters));
        self
    }

    /// Appends a handler, guarded by any points declared since the last one.
    pub fn handler<F, T>(mut self, f: F) -> Self
    where
        F: Handler<T>,
        T: 'static,
    {
        let points = std::mem::take(&mut self.pending);
        self.template
            .handlers
            .push(HandlerEntry::with_points(into_handler(f), points));
        self
    }

    /// Appends a pre-built entry.
    pub fn handler_entry(mut self, entry: HandlerEntry) -> Self {
        self.template.handlers.push(entry);
        self
    }

    /// Registers `name` in the command table alongside this matcher.
    pub(crate) fn command(mut self, name: CommandName, aliases: Vec<String>) -> Self {
        self.template.commands.push((name, aliases));
        self
    }

    /// Adds an alias for every command this matcher answers to.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        for (_, aliases) in &mut self.template.commands {
            aliases.push(alias.clone());
        }
        self
    }

    /// Finishes the template.
    pub fn build(self) -> MatcherTemplate {
        if !self.pending.is_empty() {
            warn!(
                matcher = self.template.label(),
                points = self.pending.len(),
                "Suspension points declared after the last handler are ignored"
            );
        }
        self.template
    }

    /// Builds and registers the template, returning its handle.
    pub fn register(self, registry: &MatcherRegistry) -> MatcherId {
        registry.register(self.build())
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("template", &self.template)
            .field("pending", &self.pending)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_attach_to_next_handler() {
        let template = Matcher::new()
            .handler(|| async {})
            .got("a", "A?")
            .receive("r")
            .receive_any()
            .handler(|| async {})
            .build();

        assert_eq!(template.handler_count(), 2);
        assert!(template.handlers[0].points().is_empty());
        let markers: Vec<String> = template.handlers[1]
            .points()
            .iter()
            .map(SuspensionPoint::marker)
            .collect();
        assert_eq!(markers, vec!["arg:a", "receive:r", "@last_receive"]);
    }

    #[test]
    fn test_defaults() {
        let template = Matcher::new().build();
        assert_eq!(template.priority(), DEFAULT_PRIORITY);
        assert!(!template.is_blocking());
        assert!(!template.is_temp());
        assert!(template.accepts(EventType::Notice));
        assert!(!template.is_expired(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_is_strictly_after_deadline() {
        let template = Matcher::new()
            .event_type(EventType::Message)
            .expire_after(Duration::from_secs(10))
            .build();
        let deadline = template.expire_at().unwrap();

        assert!(!template.accepts(EventType::Notice));
        assert!(!template.is_expired(deadline));
        assert!(template.is_expired(deadline + Duration::from_millis(1)));
    }
}
