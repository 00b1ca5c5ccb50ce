//! Data Model
//!
//! A data root is a tree of [`Value`]s. Containers ([`Object`] and
//! [`Array`]) are shared handles: cloning one clones the handle, not the
//! contents, and two handles are strictly equal only when they point at the
//! same container.
//!
//! # Slots
//!
//! A container does not store values directly. Each entry is a slot that is
//! either *plain* (stored as-is, reads and writes are inert) or *observed*
//! (wrapped in a [`Property`] that owns a dependency registry). The
//! [`Observer`](super::Observer) turns plain slots into observed ones.
//! Entries added after observation stay plain until observed again.
//!
//! # Strict Equality
//!
//! Writes compare old and new values with [`Value::strict_eq`]: scalars
//! compare by value (`NaN` never equals itself) and containers by identity.

use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::{BindError, Result};

use super::context::TrackingContext;
use super::dep::Dep;
use super::observer::Observer;

/// A node in a data root.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(Object),
    Array(Array),
}

impl Value {
    /// Strict equality: by value for scalars, by identity for containers.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_))
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Parse a JSON document into a fresh, unobserved value tree.
    pub fn parse_json(json: &str) -> Result<Self> {
        let parsed: serde_json::Value = serde_json::from_str(json)?;
        Ok(Self::from(parsed))
    }

    /// Snapshot this value as JSON. Reads are untracked.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Object(object) => object.to_json(),
            Value::Array(array) => array.to_json(),
        }
    }
}

/// Text shown by a rendering sink: strings verbatim, integral numbers
/// without a fraction, containers as compact JSON.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Object(_) | Value::Array(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_eq(other)
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(Array::from_values(items.into_iter().map(Value::from)))
            }
            serde_json::Value::Object(map) => Value::Object(Object::from(map)),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl From<Array> for Value {
    fn from(array: Array) -> Self {
        Value::Array(array)
    }
}

// ----------------------------------------------------------------------------
// Slots and Properties
// ----------------------------------------------------------------------------

/// Storage for one container entry.
#[derive(Clone)]
pub(crate) enum Slot {
    Plain(Value),
    Observed(Property),
}

impl Slot {
    /// Read through the slot. Observed reads are tracked.
    fn read(&self) -> Value {
        match self {
            Slot::Plain(value) => value.clone(),
            Slot::Observed(property) => property.read(),
        }
    }

    /// Read without tracking.
    pub(crate) fn peek(&self) -> Value {
        match self {
            Slot::Plain(value) => value.clone(),
            Slot::Observed(property) => property.peek(),
        }
    }
}

/// An observed value: the read/write capability pair that replaces direct
/// storage once a container entry is observed.
///
/// Reading inside a tracking context registers the current watcher in this
/// property's registry. Writing a strictly different value observes the new
/// value, stores it, and notifies the registry.
#[derive(Clone)]
pub struct Property {
    value: Arc<RwLock<Value>>,
    dep: Dep,
}

impl Property {
    pub(crate) fn new(value: Value, dep: Dep) -> Self {
        Self {
            value: Arc::new(RwLock::new(value)),
            dep,
        }
    }

    /// Tracked read.
    pub fn read(&self) -> Value {
        TrackingContext::register(&self.dep);
        self.value.read().clone()
    }

    /// Untracked read.
    pub fn peek(&self) -> Value {
        self.value.read().clone()
    }

    /// Write through the capability.
    ///
    /// A strictly equal value is a no-op: nothing is stored and nobody is
    /// notified. Otherwise the new value is observed before it is stored, so
    /// freshly assigned sub-objects become reactive.
    pub fn write(&self, new_value: Value) -> Result<()> {
        if self.value.read().strict_eq(&new_value) {
            return Ok(());
        }

        Observer::new(self.dep.config()).observe(&new_value);
        *self.value.write() = new_value;

        self.dep.notify()
    }

    /// The registry owned by this property.
    pub fn dep(&self) -> &Dep {
        &self.dep
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.peek())
            .field("dep", &self.dep)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Object
// ----------------------------------------------------------------------------

type Entries = IndexMap<String, Slot>;

/// Shared, insertion-ordered mapping from keys to slots.
#[derive(Clone, Default)]
pub struct Object {
    entries: Arc<RwLock<Entries>>,
}

/// Non-owning handle to an [`Object`].
#[derive(Clone)]
pub struct WeakObject {
    entries: Weak<RwLock<Entries>>,
}

impl WeakObject {
    pub fn upgrade(&self) -> Option<Object> {
        self.entries.upgrade().map(|entries| Object { entries })
    }
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object into a fresh, unobserved object.
    pub fn parse_json(json: &str) -> Result<Self> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        Ok(Self::from(map))
    }

    /// Define `key` as a plain entry, replacing whatever slot was there.
    ///
    /// The entry is not reactive until the object is observed again.
    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.entries.write().insert(key.into(), Slot::Plain(value));
    }

    /// Read `key`. Reads of observed entries are tracked.
    pub fn get(&self, key: &str) -> Option<Value> {
        let slot = self.entries.read().get(key).cloned();
        slot.map(|slot| slot.read())
    }

    /// Read `key` without tracking.
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).map(Slot::peek)
    }

    /// Assign `key`.
    ///
    /// Observed entries go through their write capability and may notify.
    /// Plain entries are overwritten, and absent keys are added as plain
    /// entries.
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        let property = {
            let mut entries = self.entries.write();
            match entries.get_mut(key) {
                Some(Slot::Observed(property)) => property.clone(),
                Some(Slot::Plain(slot)) => {
                    *slot = value;
                    return Ok(());
                }
                None => {
                    entries.insert(key.to_string(), Slot::Plain(value));
                    return Ok(());
                }
            }
        };
        // The entries lock is released before notifying.
        property.write(value)
    }

    /// The property behind `key`, if that entry is observed.
    pub fn property(&self, key: &str) -> Option<Property> {
        match self.entries.read().get(key) {
            Some(Slot::Observed(property)) => Some(property.clone()),
            _ => None,
        }
    }

    pub fn is_observed(&self, key: &str) -> bool {
        self.property(key).is_some()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    /// Address of the shared storage, stable for the object's lifetime.
    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.entries) as *const () as usize
    }

    pub fn downgrade(&self) -> WeakObject {
        WeakObject {
            entries: Arc::downgrade(&self.entries),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let entries = self.entries.read();
        serde_json::Value::Object(
            entries
                .iter()
                .map(|(key, slot)| (key.clone(), slot.peek().to_json()))
                .collect(),
        )
    }

    /// Run `f` over the raw slots while holding the write lock.
    pub(crate) fn with_slots_mut<R>(&self, f: impl FnOnce(&mut Entries) -> R) -> R {
        f(&mut self.entries.write())
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Object {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        let entries = map
            .into_iter()
            .map(|(key, value)| (key, Slot::Plain(Value::from(value))))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|(key, value)| (key.into(), Slot::Plain(value)))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read();
        f.debug_map()
            .entries(entries.iter().map(|(key, slot)| (key, slot.peek())))
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Array
// ----------------------------------------------------------------------------

/// Shared sequence of slots, observed index by index.
///
/// There is no insert/remove tracking: `push` adds a plain slot and only
/// writes to existing observed indices notify.
#[derive(Clone, Default)]
pub struct Array {
    items: Arc<RwLock<Vec<Slot>>>,
}

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            items: Arc::new(RwLock::new(values.into_iter().map(Slot::Plain).collect())),
        }
    }

    /// Read index `index`. Reads of observed items are tracked.
    pub fn get(&self, index: usize) -> Option<Value> {
        let slot = self.items.read().get(index).cloned();
        slot.map(|slot| slot.read())
    }

    /// Assign index `index`.
    ///
    /// Assigning one past the end appends a plain slot; further out is a
    /// resolution error.
    pub fn set(&self, index: usize, value: Value) -> Result<()> {
        let property = {
            let mut items = self.items.write();
            let len = items.len();
            match items.get_mut(index) {
                Some(Slot::Observed(property)) => property.clone(),
                Some(Slot::Plain(slot)) => {
                    *slot = value;
                    return Ok(());
                }
                None if index == len => {
                    items.push(Slot::Plain(value));
                    return Ok(());
                }
                None => {
                    return Err(BindError::PathResolution {
                        path: format!("[{index}]"),
                        segment: index.to_string(),
                    });
                }
            }
        };
        property.write(value)
    }

    /// Append a plain, unobserved item.
    pub fn push(&self, value: Value) {
        self.items.write().push(Slot::Plain(value));
    }

    pub fn property(&self, index: usize) -> Option<Property> {
        match self.items.read().get(index) {
            Some(Slot::Observed(property)) => Some(property.clone()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.items) as *const () as usize
    }

    pub fn to_json(&self) -> serde_json::Value {
        let items = self.items.read();
        serde_json::Value::Array(items.iter().map(|slot| slot.peek().to_json()).collect())
    }

    pub(crate) fn with_slots_mut<R>(&self, f: impl FnOnce(&mut Vec<Slot>) -> R) -> R {
        f(&mut self.items.write())
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items = self.items.read();
        f.debug_list().entries(items.iter().map(Slot::peek)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_equality_rules() {
        assert!(Value::from(1).strict_eq(&Value::from(1.0)));
        assert!(!Value::from(f64::NAN).strict_eq(&Value::from(f64::NAN)));
        assert!(!Value::from("1").strict_eq(&Value::from(1)));

        let a = Object::new();
        let b = Object::new();
        assert!(Value::from(a.clone()).strict_eq(&Value::from(a)));
        assert!(!Value::from(Object::new()).strict_eq(&Value::from(b)));
    }

    #[test]
    fn display_formats_for_sinks() {
        assert_eq!(Value::from(30).to_string(), "30");
        assert_eq!(Value::from(1.5).to_string(), "1.5");
        assert_eq!(Value::from(-0.0).to_string(), "0");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from(f64::INFINITY).to_string(), "Infinity");

        let nested = Value::parse_json(r#"{"a":[1,2],"b":"x"}"#).unwrap();
        assert_eq!(nested.to_string(), r#"{"a":[1,2],"b":"x"}"#);
    }

    #[test]
    fn object_preserves_insertion_order() {
        let object = Object::parse_json(r#"{"z":1,"a":2,"m":3}"#).unwrap();
        assert_eq!(object.keys(), vec!["z", "a", "m"]);
    }

    #[test]
    fn plain_set_adds_and_overwrites() {
        let object = Object::new();
        object.set("k", Value::from(1)).unwrap();
        assert_eq!(object.get("k"), Some(Value::from(1)));

        object.set("k", Value::from(2)).unwrap();
        assert_eq!(object.get("k"), Some(Value::from(2)));
        assert!(!object.is_observed("k"));
    }

    #[test]
    fn array_set_bounds() {
        let array = Array::from_values([Value::from(1)]);
        array.set(0, Value::from(5)).unwrap();
        array.set(1, Value::from(6)).unwrap();
        assert_eq!(array.len(), 2);

        let err = array.set(5, Value::from(7)).unwrap_err();
        assert_eq!(err.segment(), Some("5"));
    }

    #[test]
    fn weak_object_upgrade() {
        let object = Object::new();
        let weak = object.downgrade();
        assert!(weak.upgrade().is_some_and(|o| o.ptr_eq(&object)));

        drop(object);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn json_round_trip_keeps_integers() {
        let value = Value::parse_json(r#"{"n":30,"f":1.5,"s":null}"#).unwrap();
        assert_eq!(value.to_json(), serde_json::json!({"n": 30, "f": 1.5, "s": null}));
    }
}
