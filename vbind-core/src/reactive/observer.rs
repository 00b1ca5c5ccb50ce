//! Property Interceptor
//!
//! Observation walks a value tree and replaces every plain slot with a
//! [`Property`], giving each entry its own dependency registry. Children are
//! observed before the entry that holds them is wrapped, so a container is
//! fully reactive by the time its parent key can notify about it.
//!
//! Scalars are wrapped with no recursion. Arrays are walked like keyed
//! objects, one property per index.
//!
//! Observation is idempotent: an entry that is already observed keeps its
//! registry (and its subscribers), and only its value is walked for plain
//! descendants.
//!
//! Each container is entered at most once per walk, so shared and cyclic
//! data are observed once and the walk terminates.

use std::collections::HashSet;

use crate::config::Config;

use super::dep::Dep;
use super::value::{Array, Object, Property, Slot, Value};

/// Containers already entered during one walk, by storage address.
type Visited = HashSet<usize>;

/// Makes value trees reactive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Observer {
    config: Config,
}

impl Observer {
    /// Create an observer whose registries use `config`.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Observe `value` and everything reachable from it.
    ///
    /// Returns the number of slots that became observed.
    pub fn observe(&self, value: &Value) -> usize {
        self.walk(value, &mut Visited::new())
    }

    /// Observe every entry of `object`, recursively.
    pub fn observe_object(&self, object: &Object) -> usize {
        self.walk_object(object, &mut Visited::new())
    }

    /// Observe every index of `array`, recursively.
    pub fn observe_array(&self, array: &Array) -> usize {
        self.walk_array(array, &mut Visited::new())
    }

    fn walk(&self, value: &Value, visited: &mut Visited) -> usize {
        match value {
            Value::Object(object) => self.walk_object(object, visited),
            Value::Array(array) => self.walk_array(array, visited),
            _ => 0,
        }
    }

    fn walk_object(&self, object: &Object, visited: &mut Visited) -> usize {
        // The slots stay write-locked for the walk; re-entering would deadlock.
        if !visited.insert(object.addr()) {
            return 0;
        }
        object.with_slots_mut(|entries| {
            entries
                .iter_mut()
                .map(|(key, slot)| {
                    let wrapped = self.define_reactive(slot, visited);
                    if wrapped > 0 {
                        tracing::trace!(key = %key, "observed property");
                    }
                    wrapped
                })
                .sum()
        })
    }

    fn walk_array(&self, array: &Array, visited: &mut Visited) -> usize {
        if !visited.insert(array.addr()) {
            return 0;
        }
        array.with_slots_mut(|items| {
            items
                .iter_mut()
                .map(|slot| self.define_reactive(slot, visited))
                .sum()
        })
    }

    fn define_reactive(&self, slot: &mut Slot, visited: &mut Visited) -> usize {
        match slot {
            Slot::Plain(value) => {
                let nested = self.walk(value, visited);
                let value = std::mem::replace(value, Value::Null);
                *slot = Slot::Observed(Property::new(value, Dep::with_config(self.config)));
                nested + 1
            }
            Slot::Observed(property) => self.walk(&property.peek(), visited),
        }
    }
}

/// Observe `value` with default settings.
pub fn observe(value: &Value) -> usize {
    Observer::default().observe(value)
}
