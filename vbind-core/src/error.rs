//! Error Types
//!
//! Every fault in the engine is local and synchronous: it surfaces to the
//! caller that triggered the read, write, or compile, and nothing retries.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BindError>;

/// Errors raised while resolving expressions, compiling templates, or
/// propagating updates.
#[derive(Error, Debug)]
pub enum BindError {
    /// A path descended through an absent value, or an assignment targeted
    /// something that cannot hold the final segment.
    #[error("cannot resolve segment `{segment}` of path `{path}`")]
    PathResolution { path: String, segment: String },

    /// The expression is empty or contains an empty segment (`a..b`).
    #[error("invalid expression `{0}`")]
    InvalidExpression(String),

    /// A `v-<name>` attribute named a directive nobody registered.
    #[error("unknown directive `v-{name}` on {node}")]
    DirectiveNotFound { name: String, node: String },

    /// A notify chain re-entered itself past the configured depth.
    #[error("update chain exceeded {limit} nested notifications")]
    ReentrantUpdate { limit: usize },

    /// The construction selector matched no node.
    #[error("mount target `{0}` not found")]
    TargetNotFound(String),

    /// Configuration or data JSON could not be parsed.
    #[error(transparent)]
    Config(#[from] serde_json::Error),
}

impl BindError {
    /// The path segment that failed to resolve, if this is a resolution error.
    pub fn segment(&self) -> Option<&str> {
        match self {
            Self::PathResolution { segment, .. } => Some(segment),
            _ => None,
        }
    }
}
