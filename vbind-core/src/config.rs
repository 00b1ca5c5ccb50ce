//! Engine configuration.
//!
//! Both settings default to the permissive behavior: duplicate
//! registrations are kept and the notify depth guard only trips on chains
//! that would otherwise overflow the stack.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default nesting limit for notify chains on one thread.
pub const DEFAULT_MAX_NOTIFY_DEPTH: usize = 64;

/// Settings applied to every dependency registry created while observing
/// a data root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ignore a watcher that is already registered on a property.
    pub dedupe_subscribers: bool,

    /// Nested notifications allowed before `ReentrantUpdate` is raised.
    pub max_notify_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dedupe_subscribers: false,
            max_notify_depth: DEFAULT_MAX_NOTIFY_DEPTH,
        }
    }
}

impl Config {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Strict mode: deduplicated registries.
    pub fn strict() -> Self {
        Self {
            dedupe_subscribers: true,
            ..Self::default()
        }
    }
}
