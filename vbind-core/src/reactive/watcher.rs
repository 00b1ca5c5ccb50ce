//! Watcher Implementation
//!
//! A Watcher binds an expression, a data root, and a callback.
//!
//! # Lifecycle
//!
//! 1. On construction the watcher enters a tracking context and resolves
//!    its expression once. Every observed property read during that
//!    resolution registers the watcher. The result becomes `old_value`.
//!
//! 2. When any of those properties notifies, [`Watcher::update`] resolves
//!    the expression again. If the result is strictly different from
//!    `old_value`, it is stored and the callback runs with it.
//!
//! Registrations are never dropped or repeated after construction. The
//! re-read in an update only *extends*: it subscribes the watcher to
//! properties on its path it was not yet subscribed to, which is how a
//! watcher on `a.x` follows `a` being replaced by a fresh object. Stale
//! registrations on the replaced object stay in place.
//!
//! The watcher holds the data root weakly, so it never keeps data alive on
//! its own; once the root is dropped, updates do nothing.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::error::Result;
use crate::resolve::{self, Path};

use super::context::TrackingContext;
use super::dep::DepId;
use super::value::{Object, Value, WeakObject};

/// Unique identifier for a watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatcherId(u64);

impl WatcherId {
    /// Generate a new unique watcher ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for WatcherId {
    fn default() -> Self {
        Self::new()
    }
}

/// Callback invoked with the new value when a watched expression changes.
pub type Callback = Box<dyn Fn(Option<&Value>) -> Result<()> + Send + Sync>;

/// A subscriber that re-evaluates an expression when its dependencies
/// notify, and fires its callback when the value changed.
pub struct Watcher {
    id: WatcherId,
    this: Weak<Watcher>,
    root: WeakObject,
    path: Path,
    callback: Callback,
    old_value: RwLock<Option<Value>>,
    dependencies: RwLock<Vec<DepId>>,
    disposed: AtomicBool,
    fire_count: AtomicUsize,
}

impl Watcher {
    /// Create a watcher on `expression` and perform its tracked read.
    ///
    /// If the read fails the watcher is disposed before the error is
    /// returned, so registrations made before the failure stay inert.
    pub fn new<F>(root: &Object, expression: &str, callback: F) -> Result<Arc<Self>>
    where
        F: Fn(Option<&Value>) -> Result<()> + Send + Sync + 'static,
    {
        Self::with_path(root, Path::parse(expression)?, callback)
    }

    /// Create a watcher on an already parsed path.
    pub fn with_path<F>(root: &Object, path: Path, callback: F) -> Result<Arc<Self>>
    where
        F: Fn(Option<&Value>) -> Result<()> + Send + Sync + 'static,
    {
        let watcher = Arc::new_cyclic(|this| Self {
            id: WatcherId::new(),
            this: this.clone(),
            root: root.downgrade(),
            path,
            callback: Box::new(callback),
            old_value: RwLock::new(None),
            dependencies: RwLock::new(Vec::new()),
            disposed: AtomicBool::new(false),
            fire_count: AtomicUsize::new(0),
        });

        let initial = {
            let _ctx = TrackingContext::enter(Arc::clone(&watcher));
            let value = resolve::resolve(root, &watcher.path);
            *watcher.dependencies.write() = TrackingContext::dependencies();
            value
        };

        match initial {
            Ok(value) => {
                tracing::trace!(
                    watcher = ?watcher.id,
                    expression = %watcher.path,
                    dependencies = watcher.dependency_count(),
                    "watcher tracked"
                );
                *watcher.old_value.write() = value;
                Ok(watcher)
            }
            Err(err) => {
                watcher.dispose();
                Err(err)
            }
        }
    }

    pub fn id(&self) -> WatcherId {
        self.id
    }

    /// The watched expression.
    pub fn expression(&self) -> &Path {
        &self.path
    }

    /// The last value seen by this watcher.
    pub fn old_value(&self) -> Option<Value> {
        self.old_value.read().clone()
    }

    /// Registries this watcher joined, in order.
    pub fn dependencies(&self) -> Vec<DepId> {
        self.dependencies.read().clone()
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies.read().len()
    }

    /// Number of times the callback has run.
    pub fn fire_count(&self) -> usize {
        self.fire_count.load(Ordering::SeqCst)
    }

    /// Re-evaluate and fire the callback if the value changed.
    ///
    /// Called by a dependency registry's notify.
    pub fn update(&self) -> Result<()> {
        if self.is_disposed() {
            return Ok(());
        }
        let Some(root) = self.root.upgrade() else {
            return Ok(());
        };

        let Some(this) = self.this.upgrade() else {
            return Ok(());
        };

        let value = {
            let _ctx = TrackingContext::extend(this);
            let value = resolve::resolve(&root, &self.path);
            self.dependencies.write().extend(TrackingContext::dependencies());
            value?
        };

        {
            let mut old_value = self.old_value.write();
            let unchanged = match (old_value.as_ref(), value.as_ref()) {
                (None, None) => true,
                (Some(old), Some(new)) => old.strict_eq(new),
                _ => false,
            };
            if unchanged {
                return Ok(());
            }
            *old_value = value.clone();
        }

        tracing::trace!(watcher = ?self.id, expression = %self.path, "watcher fired");
        self.fire_count.fetch_add(1, Ordering::SeqCst);
        (self.callback)(value.as_ref())
    }

    /// Stop reacting. Registries keep the entry, but updates do nothing.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.id)
            .field("expression", &self.path.as_str())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
