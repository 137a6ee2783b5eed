//! Rules and permissions.
//!
//! Both are lists of async predicates over a [`ParleyContext`]:
//!
//! - a [`Rule`] passes when **every** checker passes (empty passes),
//! - a [`Permission`] passes when **any** checker passes (empty passes).
//!
//! The dispatcher evaluates the permission first and the rule second, and
//! both see the instance context, so a rule may stash data in state for the
//! handlers behind it.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use regex::Regex;

use parley_core::{EventType, SessionId};

use crate::command::CommandName;
use crate::context::ParleyContext;
use crate::handler::BoxFuture;

/// A type-erased async predicate.
pub type CheckFn = Arc<dyn Fn(Arc<ParleyContext>) -> BoxFuture<'static, bool> + Send + Sync>;

fn erase<F, Fut>(f: F) -> CheckFn
where
    F: Fn(Arc<ParleyContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    Arc::new(move |ctx| f(ctx).boxed())
}

fn erase_sync<F>(f: F) -> CheckFn
where
    F: Fn(&ParleyContext) -> bool + Send + Sync + 'static,
{
    Arc::new(move |ctx| {
        let passed = f(&ctx);
        async move { passed }.boxed()
    })
}

// ============================================================================
// Rule
// ============================================================================

/// Conjunction of checkers deciding whether a matcher wants an event.
#[derive(Clone, Default)]
pub struct Rule {
    checkers: Vec<CheckFn>,
}

impl Rule {
    /// A rule that always passes.
    pub fn new() -> Self {
        Self::default()
    }

    /// A rule from an async predicate.
    pub fn check<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<ParleyContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Self {
            checkers: vec![erase(f)],
        }
    }

    /// A rule from a synchronous predicate.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&ParleyContext) -> bool + Send + Sync + 'static,
    {
        Self {
            checkers: vec![erase_sync(f)],
        }
    }

    /// Requires both `self` and `other`.
    pub fn and(mut self, other: Rule) -> Self {
        self.checkers.extend(other.checkers);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }

    /// Runs every checker in order, stopping at the first failure.
    pub async fn matches(&self, ctx: &Arc<ParleyContext>) -> bool {
        for checker in &self.checkers {
            if !checker(Arc::clone(ctx)).await {
                return false;
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Built-ins
    // ------------------------------------------------------------------

    /// Events addressed to the bot.
    pub fn to_me() -> Self {
        Self::sync(|ctx| ctx.event().is_to_me())
    }

    /// Events that resolved to one of `names`.
    pub fn command(names: impl IntoIterator<Item = CommandName>) -> Self {
        let names: HashSet<CommandName> = names.into_iter().collect();
        Self::sync(move |ctx| ctx.command().is_some_and(|c| names.contains(&c.name)))
    }

    /// Messages containing any of `keywords`.
    pub fn keyword<S: Into<String>>(keywords: impl IntoIterator<Item = S>) -> Self {
        let keywords: Vec<String> = keywords.into_iter().map(Into::into).collect();
        Self::sync(move |ctx| {
            if ctx.event().event_type() != EventType::Message {
                return false;
            }
            let text = ctx.event().plain_text();
            keywords.iter().any(|k| text.contains(k.as_str()))
        })
    }

    /// Messages starting with any of `prefixes`.
    pub fn starts_with<S: Into<String>>(prefixes: impl IntoIterator<Item = S>) -> Self {
        let prefixes: Vec<String> = prefixes.into_iter().map(Into::into).collect();
        Self::sync(move |ctx| {
            if ctx.event().event_type() != EventType::Message {
                return false;
            }
            let text = ctx.event().plain_text();
            prefixes.iter().any(|p| text.starts_with(p.as_str()))
        })
    }

    /// Messages whose text matches `re`.
    pub fn regex(re: Regex) -> Self {
        Self::sync(move |ctx| {
            ctx.event().event_type() == EventType::Message
                && re.is_match(&ctx.event().plain_text())
        })
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("checkers", &self.checkers.len())
            .finish()
    }
}

// ============================================================================
// Permission
// ============================================================================

/// Disjunction of checkers deciding who may trigger a matcher.
#[derive(Clone, Default)]
pub struct Permission {
    checkers: Vec<CheckFn>,
}

impl Permission {
    /// A permission everyone has.
    pub fn everyone() -> Self {
        Self::default()
    }

    /// A permission from an async predicate.
    pub fn check<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<ParleyContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Self {
            checkers: vec![erase(f)],
        }
    }

    /// A permission from a synchronous predicate.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&ParleyContext) -> bool + Send + Sync + 'static,
    {
        Self {
            checkers: vec![erase_sync(f)],
        }
    }

    /// Allows anyone allowed by `self` or `other`.
    pub fn or(mut self, other: Permission) -> Self {
        self.checkers.extend(other.checkers);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }

    /// Runs checkers in order, stopping at the first success.
    pub async fn allows(&self, ctx: &Arc<ParleyContext>) -> bool {
        if self.checkers.is_empty() {
            return true;
        }
        for checker in &self.checkers {
            if checker(Arc::clone(ctx)).await {
                return true;
            }
        }
        false
    }

    // ------------------------------------------------------------------
    // Built-ins
    // ------------------------------------------------------------------

    /// Only `session`, and only if `base` also allows the event.
    ///
    /// Continuations default to this so that a prompt is answered by the
    /// person who was asked.
    pub fn session(session: SessionId, base: Permission) -> Self {
        Self::check(move |ctx| {
            let session = session.clone();
            let base = base.clone();
            async move { *ctx.session_id() == session && base.allows(&ctx).await }
        })
    }

    /// Events from one of `user_ids`.
    pub fn superuser<S: Into<String>>(user_ids: impl IntoIterator<Item = S>) -> Self {
        let users: HashSet<String> = user_ids.into_iter().map(Into::into).collect();
        Self::sync(move |ctx| ctx.event().user_id().is_some_and(|u| users.contains(&u)))
    }

    /// Private messages.
    pub fn private() -> Self {
        Self::sync(|ctx| {
            let event = ctx.event();
            event.event_type() == EventType::Message
                && event.group_id().is_none()
                && event.channel_id().is_none()
        })
    }

    /// Group messages.
    pub fn group() -> Self {
        Self::sync(|ctx| {
            let event = ctx.event();
            event.event_type() == EventType::Message && event.group_id().is_some()
        })
    }
}

impl fmt::Debug for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permission")
            .field("checkers", &self.checkers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, TestEvent};

    #[tokio::test]
    async fn test_rule_is_conjunction() {
        let ctx = testing::context(TestEvent::private("1", "hello world"));

        assert!(Rule::new().matches(&ctx).await);
        assert!(
            Rule::keyword(["hello"])
                .and(Rule::starts_with(["hel"]))
                .matches(&ctx)
                .await
        );
        assert!(
            !Rule::keyword(["hello"])
                .and(Rule::keyword(["absent"]))
                .matches(&ctx)
                .await
        );
    }

    #[tokio::test]
    async fn test_permission_is_disjunction() {
        let ctx = testing::context(TestEvent::private("1", "hi"));

        assert!(Permission::everyone().allows(&ctx).await);
        assert!(!Permission::group().allows(&ctx).await);
        assert!(Permission::group().or(Permission::private()).allows(&ctx).await);
        assert!(Permission::superuser(["1"]).allows(&ctx).await);
        assert!(!Permission::superuser(["2"]).allows(&ctx).await);
    }

    #[tokio::test]
    async fn test_session_permission_wraps_base() {
        let ctx = testing::context(TestEvent::group("9", "1", "hi"));
        let session = SessionId::new("group_9_1");

        assert!(
            Permission::session(session.clone(), Permission::everyone())
                .allows(&ctx)
                .await
        );
        assert!(
            !Permission::session(session, Permission::private())
                .allows(&ctx)
                .await
        );
        assert!(
            !Permission::session(SessionId::new("group_9_2"), Permission::everyone())
                .allows(&ctx)
                .await
        );
    }

    #[tokio::test]
    async fn test_rule_may_write_state() {
        let ctx = testing::context(TestEvent::private("1", "hi"));
        let rule = Rule::sync(|ctx| {
            ctx.state().insert("seen", "yes");
            true
        });

        assert!(rule.matches(&ctx).await);
        assert_eq!(ctx.state().get_text("seen"), Some("yes"));
    }
}
