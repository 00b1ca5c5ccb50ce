//! Directive Dispatch
//!
//! A directive wires one node to the data root: it renders the current
//! value into the node, creates the watchers that keep it current, and
//! hooks up any input listeners. Directives are looked up by keyword in a
//! [`DirectiveRegistry`], so new binding kinds are added by registering a
//! handler rather than by changing the compiler.
//!
//! Two handlers are built in:
//!
//! - `model`: two-way value binding. The node's value follows the data,
//!   and input events write the raw reported string back through the path
//!   for as long as the binding's watcher is live.
//! - `text`: text interpolation. One watcher per marker; any of them firing
//!   re-expands the whole text.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::dom::RenderNode;
use crate::error::{BindError, Result};
use crate::reactive::{Object, Value, Watcher};
use crate::resolve::{self, Path};

/// Watchers created by one directive, or by a whole compile.
#[derive(Debug, Default)]
pub struct Binding {
    watchers: Vec<Arc<Watcher>>,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, watcher: Arc<Watcher>) {
        self.watchers.push(watcher);
    }

    pub fn extend(&mut self, other: Binding) {
        self.watchers.extend(other.watchers);
    }

    pub fn watchers(&self) -> &[Arc<Watcher>] {
        &self.watchers
    }

    pub fn into_watchers(self) -> Vec<Arc<Watcher>> {
        self.watchers
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    /// Dispose every watcher in this binding.
    pub fn dispose(&self) {
        for watcher in &self.watchers {
            watcher.dispose();
        }
    }
}

impl From<Vec<Arc<Watcher>>> for Binding {
    fn from(watchers: Vec<Arc<Watcher>>) -> Self {
        Self { watchers }
    }
}

/// Handler for one directive keyword.
pub trait Directive<N: RenderNode>: Send + Sync {
    /// Bind `node` to `expression` within `data`.
    fn bind(&self, node: &N, expression: &str, data: &Object) -> Result<Binding>;
}

impl<N, F> Directive<N> for F
where
    N: RenderNode,
    F: Fn(&N, &str, &Object) -> Result<Binding> + Send + Sync,
{
    fn bind(&self, node: &N, expression: &str, data: &Object) -> Result<Binding> {
        self(node, expression, data)
    }
}

/// Two-way value binding (`v-model`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelDirective;

impl<N: RenderNode> Directive<N> for ModelDirective {
    fn bind(&self, node: &N, expression: &str, data: &Object) -> Result<Binding> {
        let path = Path::parse(expression)?;
        let value = resolve::resolve(data, &path)?;

        let sink = node.clone();
        let watcher = Watcher::with_path(data, path.clone(), move |value| {
            sink.set_value(&resolve::display(value));
            Ok(())
        })?;

        // Input writes the raw string back; no coercion. The listener stops
        // once the watcher is disposed or dropped.
        let root = data.downgrade();
        let owner = Arc::downgrade(&watcher);
        node.add_input_listener(Arc::new(move |raw: &str| {
            let live = owner.upgrade().is_some_and(|watcher| !watcher.is_disposed());
            match root.upgrade() {
                Some(root) if live => resolve::assign(&root, &path, Value::from(raw)),
                _ => Ok(()),
            }
        }));

        node.set_value(&resolve::display(value.as_ref()));
        Ok(Binding::from(vec![watcher]))
    }
}

/// Text interpolation (`{{ }}` in text, or `v-text`).
///
/// An expression without markers is treated as a single path, which is
/// what makes `v-text="name"` work like `{{ name }}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDirective;

impl<N: RenderNode> Directive<N> for TextDirective {
    fn bind(&self, node: &N, expression: &str, data: &Object) -> Result<Binding> {
        let template: Arc<str> = if resolve::has_markers(expression) {
            Arc::from(expression)
        } else {
            let path = Path::parse(expression)?;
            Arc::from(format!("{{{{{path}}}}}"))
        };

        let mut binding = Binding::new();
        for marker in resolve::markers(&template) {
            let sink = node.clone();
            let root = data.downgrade();
            let text = Arc::clone(&template);
            let watcher = Watcher::new(data, marker.expression, move |_| {
                let Some(root) = root.upgrade() else {
                    return Ok(());
                };
                sink.set_text_content(&resolve::expand_template(&root, &text)?);
                Ok(())
            });

            match watcher {
                Ok(watcher) => binding.push(watcher),
                Err(err) => {
                    binding.dispose();
                    return Err(err);
                }
            }
        }

        match resolve::expand_template(data, &template) {
            Ok(text) => {
                node.set_text_content(&text);
                Ok(binding)
            }
            Err(err) => {
                binding.dispose();
                Err(err)
            }
        }
    }
}

/// Mapping from directive keyword to handler.
pub struct DirectiveRegistry<N: RenderNode> {
    directives: IndexMap<String, Arc<dyn Directive<N>>>,
}

impl<N: RenderNode> DirectiveRegistry<N> {
    /// An empty registry. Even `text` must be registered before
    /// interpolation can compile.
    pub fn empty() -> Self {
        Self {
            directives: IndexMap::new(),
        }
    }

    /// A registry holding `model` and `text`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("model", ModelDirective);
        registry.register("text", TextDirective);
        registry
    }

    /// Register `directive` under `name`, returning any handler it replaces.
    pub fn register<D>(&mut self, name: impl Into<String>, directive: D) -> Option<Arc<dyn Directive<N>>>
    where
        D: Directive<N> + 'static,
    {
        self.directives.insert(name.into(), Arc::new(directive))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Directive<N>>> {
        self.directives.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.directives.contains_key(name)
    }

    /// Registered keywords in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.directives.keys().map(String::as_str).collect()
    }

    /// Look up `name` and bind `node` with it.
    pub fn dispatch(&self, name: &str, node: &N, expression: &str, data: &Object) -> Result<Binding> {
        let directive = self
            .directives
            .get(name)
            .ok_or_else(|| BindError::DirectiveNotFound {
                name: name.to_string(),
                node: node.describe(),
            })?;

        tracing::trace!(directive = name, node = %node.describe(), expression, "dispatch");
        directive.bind(node, expression, data)
    }
}

impl<N: RenderNode> Default for DirectiveRegistry<N> {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Node;
    use crate::reactive::observe;

    fn reactive(json: &str) -> Object {
        let root = Object::parse_json(json).unwrap();
        observe(&Value::from(root.clone()));
        root
    }

    #[test]
    fn model_renders_and_writes_back() {
        let data = reactive(r#"{"name":"x"}"#);
        let input = Node::element("input");

        let binding = ModelDirective.bind(&input, "name", &data).unwrap();
        assert_eq!(binding.len(), 1);
        assert_eq!(input.value(), "x");

        input.dispatch_input("y").unwrap();
        assert_eq!(data.peek("name"), Some(Value::from("y")));

        data.set("name", Value::from("z")).unwrap();
        assert_eq!(input.value(), "z");
    }

    #[test]
    fn model_passes_raw_strings_through() {
        let data = reactive(r#"{"count":1}"#);
        let input = Node::element("input");
        let _binding = ModelDirective.bind(&input, "count", &data).unwrap();
        assert_eq!(input.value(), "1");

        input.dispatch_input("2").unwrap();
        assert_eq!(data.peek("count"), Some(Value::from("2")));
    }

    #[test]
    fn disposed_model_stops_writing_back() {
        let data = reactive(r#"{"name":"x"}"#);
        let input = Node::element("input");
        let binding = ModelDirective.bind(&input, "name", &data).unwrap();

        binding.dispose();
        input.dispatch_input("late").unwrap();
        assert_eq!(data.peek("name"), Some(Value::from("x")));
        assert_eq!(input.value(), "late");
    }

    #[test]
    fn model_with_bad_path_adds_no_listener() {
        let data = reactive(r#"{"a":{}}"#);
        let input = Node::element("input");
        assert!(ModelDirective.bind(&input, "a.b.c", &data).is_err());
        assert_eq!(input.listener_count(), 0);
    }

    #[test]
    fn text_creates_one_watcher_per_marker() {
        let data = reactive(r#"{"first":"Ann","last":"Lee"}"#);
        let text = Node::text("{{first}} {{last}}");

        let binding = TextDirective.bind(&text, &text.text_content(), &data).unwrap();
        assert_eq!(binding.len(), 2);
        assert_eq!(text.text_content(), "Ann Lee");

        data.set("last", Value::from("Kim")).unwrap();
        assert_eq!(text.text_content(), "Ann Kim");
    }

    #[test]
    fn text_alias_without_markers() {
        let data = reactive(r#"{"title":"Hi"}"#);
        let heading = Node::element("h1");
        TextDirective.bind(&heading, "title", &data).unwrap();
        assert_eq!(heading.text_content(), "Hi");

        data.set("title", Value::from("Bye")).unwrap();
        assert_eq!(heading.text_content(), "Bye");
    }

    #[test]
    fn text_failure_disposes_partial_binding() {
        let data = reactive(r#"{"ok":"a","a":{}}"#);
        let text = Node::text("{{ok}} {{a.b.c}}");
        let err = TextDirective.bind(&text, &text.text_content(), &data).unwrap_err();
        assert_eq!(err.segment(), Some("c"));

        // The watcher created for `ok` is inert
        let ok = data.property("ok").unwrap();
        data.set("ok", Value::from("b")).unwrap();
        assert_eq!(text.text_content(), "{{ok}} {{a.b.c}}");
        assert_eq!(ok.dep().subscriber_count(), 1);
    }

    #[test]
    fn registry_dispatch_and_unknown() {
        let registry = DirectiveRegistry::<Node>::with_builtins();
        assert_eq!(registry.names(), ["model", "text"]);

        let data = reactive(r#"{"x":1}"#);
        let node = Node::element("span").with_attr("id", "s");
        let err = registry.dispatch("unknown", &node, "x", &data).unwrap_err();
        match err {
            BindError::DirectiveNotFound { name, node } => {
                assert_eq!(name, "unknown");
                assert_eq!(node, r#"<span id="s">"#);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn closures_register_as_directives() {
        let mut registry = DirectiveRegistry::<Node>::empty();
        registry.register("upper", |node: &Node, expression: &str, data: &Object| -> Result<Binding> {
            let value = resolve::resolve_path(data, expression)?;
            node.set_text_content(&resolve::display(value.as_ref()).to_uppercase());
            Ok(Binding::new())
        });

        let data = reactive(r#"{"x":"loud"}"#);
        let node = Node::element("b");
        registry.dispatch("upper", &node, "x", &data).unwrap();
        assert_eq!(node.text_content(), "LOUD");
    }
}
