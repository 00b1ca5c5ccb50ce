//! Dependency Registry
//!
//! Every observed property owns one `Dep`. A `Dep` is an ordered list of
//! watchers: reading the property inside a tracking context appends the
//! current watcher, and writing a different value calls [`Dep::notify`],
//! which updates each watcher synchronously in registration order.
//!
//! There is no removal operation. Duplicates are kept unless the registry
//! was created in deduplicating mode.
//!
//! # Re-entrancy
//!
//! A watcher callback may write data, which notifies again before the
//! outer notify has returned. A per-thread depth counter turns a write
//! cycle into a `ReentrantUpdate` error instead of a stack overflow.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{BindError, Result};

use super::watcher::{Watcher, WatcherId};

thread_local! {
    static NOTIFY_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Unique identifier for a dependency registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepId(u64);

impl DepId {
    /// Generate a new unique registry ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for DepId {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-property collection of subscribed watchers.
#[derive(Clone)]
pub struct Dep {
    id: DepId,
    subscribers: Arc<RwLock<Vec<Arc<Watcher>>>>,
    config: Config,
}

impl Dep {
    /// Create an empty registry with default settings.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create an empty registry with the given settings.
    pub fn with_config(config: Config) -> Self {
        Self {
            id: DepId::new(),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            config,
        }
    }

    pub fn id(&self) -> DepId {
        self.id
    }

    /// Settings this registry was created with.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Append a watcher.
    ///
    /// Returns `false` only in deduplicating mode when the watcher is
    /// already present.
    pub fn add_subscriber(&self, watcher: Arc<Watcher>) -> bool {
        let mut subscribers = self.subscribers.write();
        if self.config.dedupe_subscribers && subscribers.iter().any(|w| w.id() == watcher.id()) {
            return false;
        }
        tracing::trace!(dep = ?self.id, watcher = ?watcher.id(), "subscribe");
        subscribers.push(watcher);
        true
    }

    /// Update every subscriber in registration order.
    ///
    /// The list is snapshotted first, so watchers registered by a callback
    /// during this notify are not visited until the next one. The first
    /// error aborts the remaining updates and is returned to the writer.
    pub fn notify(&self) -> Result<()> {
        let _depth = NotifyDepth::enter(self.config.max_notify_depth)?;
        let subscribers = self.subscribers.read().clone();

        tracing::trace!(dep = ?self.id, count = subscribers.len(), "notify");

        for watcher in subscribers {
            watcher.update()?;
        }
        Ok(())
    }

    /// Number of registrations, duplicates included.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Whether `watcher` is registered at least once.
    pub fn contains(&self, watcher: WatcherId) -> bool {
        self.subscribers.read().iter().any(|w| w.id() == watcher)
    }

    /// How many times `watcher` is registered.
    pub fn occurrences(&self, watcher: WatcherId) -> usize {
        self.subscribers
            .read()
            .iter()
            .filter(|w| w.id() == watcher)
            .count()
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Guard counting nested notifications on this thread.
struct NotifyDepth;

impl NotifyDepth {
    fn enter(limit: usize) -> Result<Self> {
        NOTIFY_DEPTH.with(|depth| {
            let current = depth.get();
            if current >= limit {
                tracing::warn!(limit, "notify chain re-entered past limit");
                return Err(BindError::ReentrantUpdate { limit });
            }
            depth.set(current + 1);
            Ok(Self)
        })
    }
}

impl Drop for NotifyDepth {
    fn drop(&mut self) {
        NOTIFY_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}
