//! View Model
//!
//! The root context owns a data root and a rendering target. Constructing
//! one makes the data reactive and compiles the target's subtree, leaving
//! the live, compiled children attached at the target.
//!
//! # Example
//!
//! ```rust
//! use vbind_core::dom::{Node, RenderNode};
//! use vbind_core::reactive::Object;
//! use vbind_core::vm::{Options, ViewModel};
//!
//! let app = Node::element("div").with_children([
//!     Node::element("input").with_attr("v-model", "name"),
//!     Node::element("p").with_child(Node::text("Hello {{ name }}")),
//! ]);
//! let data = Object::parse_json(r#"{"name": "Ann"}"#)?;
//!
//! let vm = ViewModel::new(Options::new(app.clone(), data))?;
//! assert_eq!(app.text_content(), "Hello Ann");
//!
//! vm.set("name", "Bob")?;
//! assert_eq!(app.text_content(), "Hello Bob");
//! # Ok::<(), vbind_core::BindError>(())
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use crate::compile::{Compiler, DirectiveRegistry};
use crate::config::Config;
use crate::dom::RenderNode;
use crate::error::{BindError, Result};
use crate::reactive::{Object, Observer, Value, Watcher};
use crate::resolve;

/// Where a view model mounts.
#[derive(Debug, Clone)]
pub enum Target<N: RenderNode> {
    /// A direct reference to the root node.
    Node(N),
    /// The first node under `document` matching `selector` (`#id` or a tag
    /// name).
    Selector { document: N, selector: String },
}

impl<N: RenderNode> Target<N> {
    fn resolve(self) -> Result<N> {
        match self {
            Target::Node(node) => Ok(node),
            Target::Selector { document, selector } => document
                .query_selector(&selector)
                .ok_or(BindError::TargetNotFound(selector)),
        }
    }
}

/// Construction options.
#[derive(Debug, Clone)]
pub struct Options<N: RenderNode> {
    pub target: Target<N>,
    pub data: Object,
    pub config: Config,
}

impl<N: RenderNode> Options<N> {
    /// Mount directly on `target`.
    pub fn new(target: N, data: Object) -> Self {
        Self {
            target: Target::Node(target),
            data,
            config: Config::default(),
        }
    }

    /// Mount on the node matching `selector` within `document`.
    pub fn with_selector(document: N, selector: impl Into<String>, data: Object) -> Self {
        Self {
            target: Target::Selector {
                document,
                selector: selector.into(),
            },
            data,
            config: Config::default(),
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }
}

/// A data root bound to a compiled template.
pub struct ViewModel<N: RenderNode> {
    target: N,
    data: Object,
    config: Config,
    watchers: Mutex<Vec<Arc<Watcher>>>,
}

impl<N: RenderNode> ViewModel<N> {
    /// Observe the data and compile the target with the built-in directives.
    pub fn new(options: Options<N>) -> Result<Self> {
        Self::with_directives(options, &DirectiveRegistry::with_builtins())
    }

    /// Observe the data and compile the target with `registry`.
    pub fn with_directives(options: Options<N>, registry: &DirectiveRegistry<N>) -> Result<Self> {
        let Options {
            target,
            data,
            config,
        } = options;
        let target = target.resolve()?;

        let observed = Observer::new(config).observe_object(&data);
        let binding = Compiler::new(registry, &data).compile(&target)?;

        tracing::debug!(
            target = %target.describe(),
            observed,
            watchers = binding.len(),
            "view model mounted"
        );

        Ok(Self {
            target,
            data,
            config,
            watchers: Mutex::new(binding.into_watchers()),
        })
    }

    pub fn data(&self) -> &Object {
        &self.data
    }

    pub fn target(&self) -> &N {
        &self.target
    }

    pub fn config(&self) -> Config {
        self.config
    }

    /// Resolve `expression` against the data.
    pub fn get(&self, expression: &str) -> Result<Option<Value>> {
        resolve::resolve_path(&self.data, expression)
    }

    /// Assign through `expression`, notifying dependents synchronously.
    pub fn set(&self, expression: &str, value: impl Into<Value>) -> Result<()> {
        resolve::assign_path(&self.data, expression, value.into())
    }

    /// Expand `{{ }}` markers in `text` against the data.
    pub fn expand(&self, text: &str) -> Result<String> {
        resolve::expand_template(&self.data, text)
    }

    /// Watch `expression` from application code.
    ///
    /// The watcher lives as long as the view model unless disposed.
    pub fn watch<F>(&self, expression: &str, callback: F) -> Result<Arc<Watcher>>
    where
        F: Fn(Option<&Value>) -> Result<()> + Send + Sync + 'static,
    {
        let watcher = Watcher::new(&self.data, expression, callback)?;
        self.watchers.lock().push(Arc::clone(&watcher));
        Ok(watcher)
    }

    /// Watchers created by compilation and by [`ViewModel::watch`].
    pub fn watcher_count(&self) -> usize {
        self.watchers.lock().len()
    }

    /// Dispose every watcher this view model created. Input listeners stay
    /// attached but no longer write to the data.
    pub fn dispose(&self) {
        let watchers = std::mem::take(&mut *self.watchers.lock());
        tracing::debug!(watchers = watchers.len(), "view model disposed");
        for watcher in watchers {
            watcher.dispose();
        }
    }
}

impl<N: RenderNode + std::fmt::Debug> std::fmt::Debug for ViewModel<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewModel")
            .field("target", &self.target)
            .field("data", &self.data)
            .field("watcher_count", &self.watcher_count())
            .finish()
    }
}
