//! Command matchers and command groups.

use parley_core::EventType;

use super::table::CommandName;
use crate::matcher::Matcher;
use crate::rule::{Permission, Rule};

/// Creates a matcher for the command `name`.
///
/// The name is entered into the registry's command table on registration;
/// aliases added with [`Matcher::alias`] go with it.
///
/// ```rust,ignore
/// on_command(("weather", "today"))
///     .alias("wt")
///     .handler(|arg: CommandArg| async move { /* ... */ })
///     .register(&registry);
/// ```
pub fn on_command(name: impl Into<CommandName>) -> Matcher {
    let name = name.into();
    Matcher::new()
        .name(format!("command:{name}"))
        .event_type(EventType::Message)
        .rule(Rule::command([name.clone()]))
        .command(name, Vec::new())
}

/// Commands sharing a name prefix and defaults.
///
/// ```rust,ignore
/// let admin = CommandGroup::new("admin").permission(superusers).priority(5);
/// admin.command("ban").handler(ban).register(&registry);   // /admin.ban
/// admin.command("kick").handler(kick).register(&registry); // /admin.kick
/// ```
#[derive(Debug, Clone)]
pub struct CommandGroup {
    prefix: CommandName,
    permission: Option<Permission>,
    priority: Option<i32>,
    block: Option<bool>,
}

impl CommandGroup {
    pub fn new(prefix: impl Into<CommandName>) -> Self {
        Self {
            prefix: prefix.into(),
            permission: None,
            priority: None,
            block: None,
        }
    }

    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn block(mut self, block: bool) -> Self {
        self.block = Some(block);
        self
    }

    /// The full name of `name` inside this group.
    pub fn full_name(&self, name: impl Into<CommandName>) -> CommandName {
        self.prefix.join(&name.into())
    }

    /// Creates a command matcher for `prefix.name` with the group defaults.
    pub fn command(&self, name: impl Into<CommandName>) -> Matcher {
        let mut matcher = on_command(self.full_name(name));
        if let Some(permission) = &self.permission {
            matcher = matcher.permission(permission.clone());
        }
        if let Some(priority) = self.priority {
            matcher = matcher.priority(priority);
        }
        if let Some(block) = self.block {
            matcher = matcher.block(block);
        }
        matcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MatcherRegistry;

    #[test]
    fn test_group_prefixes_and_defaults() {
        let registry = MatcherRegistry::new();
        let group = CommandGroup::new("admin").priority(5).block(true);

        let handle = group.command("ban").register(&registry);

        assert_eq!(handle.priority(), 5);
        assert!(
            registry
                .commands()
                .contains(&CommandName::from(("admin", "ban")))
        );
        let snapshot = registry.snapshot_by_priority();
        assert!(snapshot[0].1[0].is_blocking());
        assert_eq!(snapshot[0].1[0].name(), Some("command:admin.ban"));
    }
}
