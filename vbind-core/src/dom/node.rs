//! In-memory render tree.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::Result;

use super::{InputListener, NodeKind, RenderNode};

/// A shared handle to an element or text node.
#[derive(Clone)]
pub struct Node {
    inner: Arc<RwLock<NodeData>>,
}

struct NodeData {
    content: Content,
    listeners: Vec<InputListener>,
}

enum Content {
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
        children: Vec<Node>,
        value: String,
    },
    Text(String),
}

impl Node {
    fn from_content(content: Content) -> Self {
        Self {
            inner: Arc::new(RwLock::new(NodeData {
                content,
                listeners: Vec::new(),
            })),
        }
    }

    pub fn element(tag: impl Into<String>) -> Self {
        Self::from_content(Content::Element {
            tag: tag.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
            value: String::new(),
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::from_content(Content::Text(text.into()))
    }

    /// Builder form of [`Node::set_attribute`].
    pub fn with_attr(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder form of [`Node::append_child`].
    pub fn with_child(self, child: Node) -> Self {
        self.append_child(child);
        self
    }

    pub fn with_children(self, children: impl IntoIterator<Item = Node>) -> Self {
        self.append_children(children.into_iter().collect());
        self
    }

    /// Set an attribute. Ignored on text nodes.
    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        if let Content::Element { attributes, .. } = &mut self.inner.write().content {
            attributes.insert(name.into(), value.into());
        }
    }

    /// Append a child. Ignored on text nodes.
    pub fn append_child(&self, child: Node) {
        if let Content::Element { children, .. } = &mut self.inner.write().content {
            children.push(child);
        }
    }

    /// Simulate an input event: store `value` on the node, then fire every
    /// input listener with it. The first listener error is returned.
    pub fn dispatch_input(&self, value: &str) -> Result<()> {
        self.set_value(value);
        // Listeners may render back into this node, so none run under the lock.
        let listeners = self.inner.read().listeners.clone();
        for listener in listeners {
            listener(value)?;
        }
        Ok(())
    }

    pub fn listener_count(&self) -> usize {
        self.inner.read().listeners.len()
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Serialize the subtree as markup. Values are not included.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String) {
        let data = self.inner.read();
        match &data.content {
            Content::Text(text) => out.push_str(text),
            Content::Element {
                tag,
                attributes,
                children,
                ..
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    out.push_str(&format!(" {name}=\"{value}\""));
                }
                out.push('>');
                for child in children {
                    child.write_markup(out);
                }
                out.push_str(&format!("</{tag}>"));
            }
        }
    }
}

impl RenderNode for Node {
    fn kind(&self) -> NodeKind {
        match self.inner.read().content {
            Content::Element { .. } => NodeKind::Element,
            Content::Text(_) => NodeKind::Text,
        }
    }

    fn tag_name(&self) -> Option<String> {
        match &self.inner.read().content {
            Content::Element { tag, .. } => Some(tag.clone()),
            Content::Text(_) => None,
        }
    }

    fn attributes(&self) -> Vec<(String, String)> {
        match &self.inner.read().content {
            Content::Element { attributes, .. } => attributes
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            Content::Text(_) => Vec::new(),
        }
    }

    fn children(&self) -> Vec<Self> {
        match &self.inner.read().content {
            Content::Element { children, .. } => children.clone(),
            Content::Text(_) => Vec::new(),
        }
    }

    /// Text nodes return their text; elements concatenate their descendants.
    fn text_content(&self) -> String {
        let children = match &self.inner.read().content {
            Content::Text(text) => return text.clone(),
            Content::Element { children, .. } => children.clone(),
        };
        children.iter().map(RenderNode::text_content).collect()
    }

    /// On an element this replaces all children with one text node.
    fn set_text_content(&self, text: &str) {
        match &mut self.inner.write().content {
            Content::Text(current) => *current = text.to_string(),
            Content::Element { children, .. } => *children = vec![Node::text(text)],
        }
    }

    fn value(&self) -> String {
        match &self.inner.read().content {
            Content::Element { value, .. } => value.clone(),
            Content::Text(_) => String::new(),
        }
    }

    fn set_value(&self, new_value: &str) {
        if let Content::Element { value, .. } = &mut self.inner.write().content {
            *value = new_value.to_string();
        }
    }

    fn add_input_listener(&self, listener: InputListener) {
        self.inner.write().listeners.push(listener);
    }

    fn take_children(&self) -> Vec<Self> {
        match &mut self.inner.write().content {
            Content::Element { children, .. } => std::mem::take(children),
            Content::Text(_) => Vec::new(),
        }
    }

    fn append_children(&self, mut new_children: Vec<Self>) {
        if let Content::Element { children, .. } = &mut self.inner.write().content {
            children.append(&mut new_children);
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markup())
    }
}
