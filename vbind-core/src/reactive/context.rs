//! Tracking Context
//!
//! The tracking context is the active-read marker: it names the watcher
//! that is currently resolving its expression, so that every observed
//! property read during that resolution can register the watcher in its
//! dependency registry.
//!
//! # Implementation
//!
//! We use a thread-local stack rather than a single global slot. Entering a
//! context pushes an entry and returns a guard; dropping the guard pops it.
//! Because the pop lives in `Drop`, the marker is cleared on every exit
//! path, including an early `?` return from a failed resolution and a panic
//! inside a callback.
//!
//! # Modes
//!
//! A watcher's first read *collects*: every observed property read
//! registers it. Re-reads during an update *extend*: a property registers
//! the watcher only if it is not already subscribed there. Extension picks
//! up properties of containers assigned after construction without ever
//! duplicating or dropping an existing registration.

use std::cell::RefCell;
use std::sync::Arc;

use super::dep::{Dep, DepId};
use super::watcher::{Watcher, WatcherId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// How reads register the current watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackMode {
    /// Register on every property read.
    Collect,
    /// Register only on properties the watcher is not subscribed to yet.
    Extend,
}

/// An entry in the tracking stack.
struct ContextEntry {
    watcher: Arc<Watcher>,
    mode: TrackMode,
    /// Registries the watcher joined during this read, in order.
    dependencies: Vec<DepId>,
}

/// Guard that pops the tracking entry when dropped.
pub struct TrackingContext {
    watcher_id: WatcherId,
}

impl TrackingContext {
    /// Enter a collecting read on behalf of `watcher`.
    pub fn enter(watcher: Arc<Watcher>) -> Self {
        Self::enter_with_mode(watcher, TrackMode::Collect)
    }

    /// Enter an extending read on behalf of `watcher`.
    pub fn extend(watcher: Arc<Watcher>) -> Self {
        Self::enter_with_mode(watcher, TrackMode::Extend)
    }

    fn enter_with_mode(watcher: Arc<Watcher>, mode: TrackMode) -> Self {
        let watcher_id = watcher.id();
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                watcher,
                mode,
                dependencies: Vec::new(),
            });
        });

        Self { watcher_id }
    }

    /// Check if a watcher is currently tracking reads.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The watcher currently tracking reads, if any.
    pub fn current_watcher() -> Option<Arc<Watcher>> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().map(|entry| Arc::clone(&entry.watcher)))
    }

    /// Mode of the innermost read, if any.
    pub fn current_mode() -> Option<TrackMode> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().map(|entry| entry.mode))
    }

    /// Register the current watcher on `dep`, honoring the current mode.
    ///
    /// Called by observed properties when they are read. Returns whether a
    /// registration was made.
    pub fn register(dep: &Dep) -> bool {
        let Some(watcher) = Self::current_watcher() else {
            return false;
        };
        if Self::current_mode() == Some(TrackMode::Extend) && dep.contains(watcher.id()) {
            return false;
        }
        if !dep.add_subscriber(watcher) {
            return false;
        }
        Self::track_dependency(dep.id());
        true
    }

    /// Record that the current watcher joined `dep`.
    pub fn track_dependency(dep: DepId) {
        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                entry.dependencies.push(dep);
            }
        });
    }

    /// Registries recorded so far in the innermost read.
    pub fn dependencies() -> Vec<DepId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| entry.dependencies.clone())
                .unwrap_or_default()
        })
    }

    /// Current nesting depth of the stack.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for TrackingContext {
    fn drop(&mut self) {
        // Take the entry out first so releasing the watcher's `Arc` never
        // runs while the stack is borrowed.
        let popped = CONTEXT_STACK.with(|stack| stack.borrow_mut().pop());

        if let Some(entry) = popped {
            debug_assert_eq!(
                entry.watcher.id(),
                self.watcher_id,
                "TrackingContext mismatch"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Object;

    fn idle_watcher() -> Arc<Watcher> {
        Watcher::new(&Object::new(), "missing", |_| Ok(())).unwrap()
    }

    #[test]
    fn context_tracks_watcher() {
        let watcher = idle_watcher();

        assert!(!TrackingContext::is_active());
        assert!(TrackingContext::current_watcher().is_none());

        {
            let _ctx = TrackingContext::enter(Arc::clone(&watcher));

            assert!(TrackingContext::is_active());
            assert_eq!(
                TrackingContext::current_watcher().map(|w| w.id()),
                Some(watcher.id())
            );
            assert_eq!(TrackingContext::current_mode(), Some(TrackMode::Collect));
        }

        // Marker is cleared once the guard drops
        assert!(!TrackingContext::is_active());
        assert!(TrackingContext::current_watcher().is_none());
        assert_eq!(TrackingContext::depth(), 0);
    }

    #[test]
    fn register_records_dependencies() {
        let _ctx = TrackingContext::enter(idle_watcher());
        let deps = [Dep::new(), Dep::new()];

        for dep in &deps {
            assert!(TrackingContext::register(dep));
        }

        let ids: Vec<_> = deps.iter().map(Dep::id).collect();
        assert_eq!(TrackingContext::dependencies(), ids);
    }

    #[test]
    fn collect_mode_keeps_duplicates() {
        let watcher = idle_watcher();
        let _ctx = TrackingContext::enter(Arc::clone(&watcher));
        let dep = Dep::new();

        TrackingContext::register(&dep);
        TrackingContext::register(&dep);
        assert_eq!(dep.occurrences(watcher.id()), 2);
    }

    #[test]
    fn extend_mode_skips_existing_registrations() {
        let watcher = idle_watcher();
        let known = Dep::new();
        known.add_subscriber(Arc::clone(&watcher));
        let fresh = Dep::new();

        let _ctx = TrackingContext::extend(Arc::clone(&watcher));
        assert!(!TrackingContext::register(&known));
        assert!(TrackingContext::register(&fresh));

        assert_eq!(known.occurrences(watcher.id()), 1);
        assert_eq!(fresh.occurrences(watcher.id()), 1);
        assert_eq!(TrackingContext::dependencies(), vec![fresh.id()]);
    }

    #[test]
    fn nested_contexts() {
        let outer = idle_watcher();
        let inner = idle_watcher();

        {
            let _outer = TrackingContext::enter(Arc::clone(&outer));
            {
                let _inner = TrackingContext::extend(Arc::clone(&inner));
                assert_eq!(TrackingContext::current_watcher().map(|w| w.id()), Some(inner.id()));
            }
            assert_eq!(TrackingContext::current_watcher().map(|w| w.id()), Some(outer.id()));
        }

        assert!(TrackingContext::current_watcher().is_none());
    }

    #[test]
    fn marker_cleared_on_early_return() {
        fn failing_read(watcher: Arc<Watcher>) -> Result<(), ()> {
            let _ctx = TrackingContext::enter(watcher);
            Err(())
        }

        assert!(failing_read(idle_watcher()).is_err());
        assert!(!TrackingContext::is_active());
    }
}
