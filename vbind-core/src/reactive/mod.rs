//! Reactive Primitives
//!
//! This module implements the dependency-tracking protocol: observed data,
//! per-property dependency registries, and watchers.
//!
//! # Concepts
//!
//! ## Observed Properties
//!
//! Observing a data root wraps each entry in a [`Property`]. A property read
//! inside a tracking context registers the current watcher; a property
//! write with a strictly different value notifies every registered watcher.
//!
//! ## Dependency Registries
//!
//! A [`Dep`] is the ordered subscriber list of one property. Notification is
//! synchronous and in registration order.
//!
//! ## Watchers
//!
//! A [`Watcher`] resolves an expression once inside a tracking context to
//! collect its dependencies, then re-evaluates on every notification and
//! fires its callback when the value changed.
//!
//! # Implementation Notes
//!
//! The active-read marker is a thread-local stack managed by the
//! [`TrackingContext`] guard, so it is cleared on every exit path.
//! Every write propagates immediately; there is no batching or scheduling.

mod context;
mod dep;
mod observer;
mod value;
mod watcher;

pub use context::{TrackMode, TrackingContext};
pub use dep::{Dep, DepId};
pub use observer::{observe, Observer};
pub use value::{Array, Object, Property, Value, WeakObject};
pub use watcher::{Callback, Watcher, WatcherId};
