//! The matcher registry.
//!
//! Templates live in priority groups, ascending. Within a group they keep
//! registration order. Continuations are registered into group 0 at
//! runtime, so the registry is shared and internally locked; no lock is
//! ever held across an `.await`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::{debug, trace};

use parley_core::SessionId;

use crate::command::CommandTable;
use crate::matcher::MatcherTemplate;

/// Handle returned by [`MatcherRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatcherId {
    id: u64,
    priority: i32,
}

impl MatcherId {
    pub(crate) fn new(id: u64, priority: i32) -> Self {
        Self { id, priority }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }
}

/// A snapshot of one priority group.
pub type PriorityGroup = (i32, Vec<Arc<MatcherTemplate>>);

/// Registered matchers plus the command table they answer to.
#[derive(Debug)]
pub struct MatcherRegistry {
    groups: RwLock<BTreeMap<i32, Vec<Arc<MatcherTemplate>>>>,
    next_id: AtomicU64,
    commands: CommandTable,
}

impl Default for MatcherRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MatcherRegistry {
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            commands: CommandTable::new(),
        }
    }

    /// The command table consulted when resolving message events.
    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    /// Adds a template to its priority group.
    ///
    /// Commands attached to the template are entered into the command table.
    pub fn register(&self, mut template: MatcherTemplate) -> MatcherId {
        template.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        for (name, aliases) in std::mem::take(&mut template.commands) {
            for alias in &aliases {
                self.commands.alias(alias, name.clone());
            }
            self.commands.insert(name);
        }

        let handle = template.handle();
        debug!(
            matcher = template.label(),
            id = handle.id(),
            priority = handle.priority(),
            temp = template.temp,
            "Registered matcher"
        );
        self.groups
            .write()
            .entry(handle.priority())
            .or_default()
            .push(Arc::new(template));
        handle
    }

    /// Removes a template. Returns `false` if it was already gone.
    pub fn remove(&self, handle: MatcherId) -> bool {
        let mut groups = self.groups.write();
        let Some(group) = groups.get_mut(&handle.priority) else {
            return false;
        };
        let before = group.len();
        group.retain(|m| m.id != handle.id);
        let removed = group.len() != before;
        if group.is_empty() {
            groups.remove(&handle.priority);
        }
        removed
    }

    pub fn contains(&self, handle: MatcherId) -> bool {
        self.groups
            .read()
            .get(&handle.priority)
            .is_some_and(|g| g.iter().any(|m| m.id == handle.id))
    }

    /// Returns the live groups in ascending priority.
    ///
    /// Expired templates are dropped on the way, so callers never see one.
    pub fn snapshot_by_priority(&self) -> Vec<PriorityGroup> {
        let now = Instant::now();
        let mut groups = self.groups.write();
        let mut snapshot = Vec::with_capacity(groups.len());
        groups.retain(|priority, group| {
            group.retain(|m| keep_unexpired(m, now));
            if group.is_empty() {
                return false;
            }
            snapshot.push((*priority, group.clone()));
            true
        });
        snapshot
    }

    /// Drops expired templates. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        self.retain(|m| keep_unexpired(m, now))
    }

    /// Drops every continuation owned by `session`.
    pub fn cancel_session(&self, session: &SessionId) -> usize {
        let removed = self.retain(|m| !(m.temp && m.owner.as_ref() == Some(session)));
        if removed > 0 {
            debug!(session = %session, removed, "Cancelled pending conversation");
        }
        removed
    }

    /// Total number of registered templates.
    pub fn len(&self) -> usize {
        self.groups.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }

    fn retain(&self, mut keep: impl FnMut(&MatcherTemplate) -> bool) -> usize {
        let mut groups = self.groups.write();
        let mut removed = 0;
        groups.retain(|_, group| {
            let before = group.len();
            group.retain(|m| keep(m));
            removed += before - group.len();
            !group.is_empty()
        });
        removed
    }
}

fn keep_unexpired(template: &MatcherTemplate, now: Instant) -> bool {
    let expired = template.is_expired(now);
    if expired {
        trace!(
            matcher = template.label(),
            id = template.id,
            "Dropping expired matcher"
        );
    }
    !expired
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::command::CommandName;
    use crate::matcher::Matcher;

    #[test]
    fn test_groups_are_ascending_and_keep_order() {
        let registry = MatcherRegistry::new();
        let late = Matcher::new().name("late").priority(10).register(&registry);
        let first = Matcher::new().name("first").priority(-1).register(&registry);
        let second = Matcher::new().name("second").priority(-1).register(&registry);

        let snapshot = registry.snapshot_by_priority();
        let layout: Vec<(i32, Vec<u64>)> = snapshot
            .iter()
            .map(|(p, g)| (*p, g.iter().map(|m| m.handle().id()).collect()))
            .collect();
        assert_eq!(
            layout,
            vec![(-1, vec![first.id(), second.id()]), (10, vec![late.id()])]
        );
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = MatcherRegistry::new();
        let handle = Matcher::new().register(&registry);

        assert!(registry.contains(handle));
        assert!(registry.remove(handle));
        assert!(!registry.remove(handle));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_fills_command_table() {
        let registry = MatcherRegistry::new();
        crate::on_command(("say", "hi"))
            .alias("hi")
            .register(&registry);

        let name = CommandName::from(("say", "hi"));
        assert!(registry.commands().contains(&name));
        assert_eq!(registry.commands().alias_target("HI"), Some(name));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_templates_are_never_listed() {
        let registry = MatcherRegistry::new();
        Matcher::new()
            .temp(true)
            .expire_after(Duration::from_secs(1))
            .register(&registry);
        Matcher::new().priority(5).register(&registry);

        assert_eq!(registry.snapshot_by_priority().len(), 2);
        tokio::time::advance(Duration::from_secs(2)).await;

        let snapshot = registry.snapshot_by_priority();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0, 5);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_expired() {
        let registry = MatcherRegistry::new();
        Matcher::new()
            .expire_after(Duration::from_secs(1))
            .register(&registry);

        assert_eq!(registry.sweep_expired(), 0);
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(registry.sweep_expired(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_cancel_session_only_touches_owned_continuations() {
        let registry = MatcherRegistry::new();
        let session = SessionId::new("42");

        let mut owned = Matcher::new().temp(true).build();
        owned.owner = Some(session.clone());
        registry.register(owned);

        let mut other = Matcher::new().temp(true).build();
        other.owner = Some(SessionId::new("7"));
        registry.register(other);

        Matcher::new().register(&registry);

        assert_eq!(registry.cancel_session(&session), 1);
        assert_eq!(registry.len(), 2);
    }
}
