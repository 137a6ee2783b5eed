//! Inbound event filters.
//!
//! Filters run before dispatch, highest priority first. The first one that
//! returns `false` drops the event and no matcher sees it.

use std::sync::Arc;

use parking_lot::RwLock;

use parley_core::BoxedEvent;

/// A predicate deciding whether an event reaches the dispatcher.
pub type EventFilter = Arc<dyn Fn(&BoxedEvent) -> bool + Send + Sync>;

/// Filters kept sorted by descending priority.
///
/// Filters sharing a priority run in the order they were added.
#[derive(Default)]
pub struct FilterChain {
    filters: RwLock<Vec<(i32, EventFilter)>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `filter` at `priority`.
    pub fn add<F>(&self, priority: i32, filter: F)
    where
        F: Fn(&BoxedEvent) -> bool + Send + Sync + 'static,
    {
        let mut filters = self.filters.write();
        let at = filters.partition_point(|(p, _)| *p >= priority);
        filters.insert(at, (priority, Arc::new(filter)));
    }

    /// Runs the filters in order. Returns the priority of the one that
    /// dropped the event, or `None` if every filter passed.
    pub fn rejected_by(&self, event: &BoxedEvent) -> Option<i32> {
        // Clone out so a filter may add another one without deadlocking.
        let filters = self.filters.read().clone();
        filters
            .iter()
            .find(|(_, filter)| !filter(event))
            .map(|(priority, _)| *priority)
    }

    pub fn len(&self) -> usize {
        self.filters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.read().is_empty()
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.len())
            .finish()
    }
}
