//! Rendering Sink
//!
//! The engine never renders anything itself. It needs a tree of nodes it
//! can walk during compilation and a handful of capabilities on each node:
//! read and write text content, read and write a value, and listen for
//! input. [`RenderNode`] is that contract; [`Node`] is an in-memory
//! implementation used by tests, benches, and headless hosts.
//!
//! Node handles are cheap to clone and shared: a clone refers to the same
//! node, which is what lets a watcher callback hold on to the node it
//! renders into.

mod node;

pub use node::Node;

use std::sync::Arc;

use crate::error::Result;

/// Callback receiving the raw value reported by an input event.
pub type InputListener = Arc<dyn Fn(&str) -> Result<()> + Send + Sync>;

/// Classification used by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Carries attributes and children.
    Element,
    /// Carries text only.
    Text,
}

/// Capabilities the engine requires from a concrete UI node type.
pub trait RenderNode: Clone + Send + Sync + 'static {
    fn kind(&self) -> NodeKind;

    /// Tag name of an element, `None` for text.
    fn tag_name(&self) -> Option<String>;

    /// Attributes in document order.
    fn attributes(&self) -> Vec<(String, String)>;

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes()
            .into_iter()
            .find_map(|(key, value)| (key == name).then_some(value))
    }

    /// Children in document order.
    fn children(&self) -> Vec<Self>;

    fn text_content(&self) -> String;
    fn set_text_content(&self, text: &str);

    fn value(&self) -> String;
    fn set_value(&self, value: &str);

    /// Register a listener fired with the raw new value on each input event.
    fn add_input_listener(&self, listener: InputListener);

    /// Detach and return all children.
    fn take_children(&self) -> Vec<Self>;

    /// Attach `children` after any existing ones, in one operation.
    fn append_children(&self, children: Vec<Self>);

    /// Short human-readable description for error messages.
    fn describe(&self) -> String {
        match self.kind() {
            NodeKind::Text => "#text".to_string(),
            NodeKind::Element => {
                let tag = self.tag_name().unwrap_or_default();
                match self.attribute("id") {
                    Some(id) => format!("<{tag} id=\"{id}\">"),
                    None => format!("<{tag}>"),
                }
            }
        }
    }

    /// First node in this subtree (self included, depth-first) matching
    /// `#id` or a tag name.
    fn query_selector(&self, selector: &str) -> Option<Self> {
        let matches = match selector.strip_prefix('#') {
            Some(id) => self.attribute("id").as_deref() == Some(id),
            None => self.tag_name().as_deref() == Some(selector),
        };
        if matches {
            return Some(self.clone());
        }
        self.children()
            .into_iter()
            .find_map(|child| child.query_selector(selector))
    }
}
