//! Template Compiler
//!
//! The compiler walks a target's subtree and turns declarative markup into
//! live bindings.
//!
//! # Algorithm
//!
//! 1. Detach the target's children into an off-screen [`Fragment`].
//! 2. Visit the fragment's nodes depth-first, in document order:
//!    - element: dispatch each `v-<keyword>` attribute, then visit the
//!      children it had before dispatch
//!    - text: if the content has `{{ }}` markers, dispatch `text` with the
//!      whole content
//! 3. Reattach the fragment to the target in one operation.
//!
//! A failing dispatch fails the whole compile. The fragment is still
//! reattached, and every watcher created so far is disposed, so the target
//! is never left partially wired.

use crate::dom::{NodeKind, RenderNode};
use crate::error::Result;
use crate::reactive::Object;
use crate::resolve;

use super::directive::{Binding, DirectiveRegistry};

/// Attribute prefix marking a directive.
pub const DIRECTIVE_PREFIX: &str = "v-";

/// Keyword dispatched for text nodes containing markers.
pub const TEXT_DIRECTIVE: &str = "text";

/// Children detached from a target while it is compiled.
pub struct Fragment<N: RenderNode> {
    children: Vec<N>,
}

impl<N: RenderNode> Fragment<N> {
    /// Move all of `target`'s children into a new fragment.
    pub fn detach(target: &N) -> Self {
        Self {
            children: target.take_children(),
        }
    }

    pub fn children(&self) -> &[N] {
        &self.children
    }

    /// Move the children back under `target`.
    pub fn attach(self, target: &N) {
        target.append_children(self.children);
    }
}

/// Compiles one subtree against one data root.
pub struct Compiler<'a, N: RenderNode> {
    registry: &'a DirectiveRegistry<N>,
    data: &'a Object,
    binding: Binding,
}

impl<'a, N: RenderNode> Compiler<'a, N> {
    pub fn new(registry: &'a DirectiveRegistry<N>, data: &'a Object) -> Self {
        Self {
            registry,
            data,
            binding: Binding::new(),
        }
    }

    /// Compile everything under `target`, returning the watchers created.
    pub fn compile(mut self, target: &N) -> Result<Binding> {
        tracing::debug!(target = %target.describe(), "compiling template");

        let fragment = Fragment::detach(target);
        let result = self.compile_nodes(fragment.children());
        fragment.attach(target);

        match result {
            Ok(()) => {
                tracing::debug!(watchers = self.binding.len(), "template compiled");
                Ok(self.binding)
            }
            Err(err) => {
                tracing::warn!(error = %err, "compile failed; disposing partial bindings");
                self.binding.dispose();
                Err(err)
            }
        }
    }

    fn compile_nodes(&mut self, nodes: &[N]) -> Result<()> {
        for node in nodes {
            match node.kind() {
                NodeKind::Element => {
                    // Content a directive renders into the element is data,
                    // not template.
                    let children = node.children();
                    self.compile_element(node)?;
                    self.compile_nodes(&children)?;
                }
                NodeKind::Text => self.compile_text(node)?,
            }
        }
        Ok(())
    }

    fn compile_element(&mut self, node: &N) -> Result<()> {
        for (name, expression) in node.attributes() {
            if let Some(keyword) = name.strip_prefix(DIRECTIVE_PREFIX) {
                let binding = self.registry.dispatch(keyword, node, &expression, self.data)?;
                self.binding.extend(binding);
            }
        }
        Ok(())
    }

    fn compile_text(&mut self, node: &N) -> Result<()> {
        let content = node.text_content();
        if resolve::has_markers(&content) {
            let binding = self.registry.dispatch(TEXT_DIRECTIVE, node, &content, self.data)?;
            self.binding.extend(binding);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Node;
    use crate::error::BindError;
    use crate::reactive::{observe, Value};

    fn reactive(json: &str) -> Object {
        let root = Object::parse_json(json).unwrap();
        observe(&Value::from(root.clone()));
        root
    }

    #[test]
    fn compiles_directives_and_text() {
        let data = reactive(r#"{"name":"Ann"}"#);
        let registry = DirectiveRegistry::<Node>::with_builtins();
        let app = Node::element("div").with_children([
            Node::element("input").with_attr("v-model", "name"),
            Node::element("p").with_child(Node::text("Hi {{ name }}")),
            Node::text("static"),
        ]);

        let binding = Compiler::new(&registry, &data).compile(&app).unwrap();
        assert_eq!(binding.len(), 2);
        assert_eq!(app.children().len(), 3);
        assert_eq!(app.text_content(), "Hi Annstatic");
    }

    #[test]
    fn parent_directives_run_before_children() {
        let data = reactive(r#"{"x":"1"}"#);
        let order = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut registry = DirectiveRegistry::<Node>::with_builtins();
        let seen = std::sync::Arc::clone(&order);
        registry.register("mark", move |node: &Node, expression: &str, _: &Object| -> Result<Binding> {
            seen.lock().push(format!("{}:{expression}", node.tag_name().unwrap_or_default()));
            Ok(Binding::new())
        });

        let app = Node::element("main").with_child(
            Node::element("section")
                .with_attr("v-mark", "outer")
                .with_child(Node::element("span").with_attr("v-mark", "inner")),
        );
        Compiler::new(&registry, &data).compile(&app).unwrap();

        assert_eq!(*order.lock(), vec!["section:outer", "span:inner"]);
    }

    #[test]
    fn target_itself_is_not_compiled() {
        let data = reactive(r#"{"x":"1"}"#);
        let registry = DirectiveRegistry::<Node>::with_builtins();
        let app = Node::element("div").with_attr("v-bogus", "x");
        assert!(Compiler::new(&registry, &data).compile(&app).is_ok());
    }

    #[test]
    fn unknown_directive_fails_and_rolls_back() {
        let data = reactive(r#"{"name":"Ann"}"#);
        let registry = DirectiveRegistry::<Node>::with_builtins();
        let app = Node::element("div").with_children([
            Node::text("{{name}}"),
            Node::element("div").with_attr("v-unknown", "x"),
        ]);

        let err = Compiler::new(&registry, &data).compile(&app).unwrap_err();
        assert!(matches!(err, BindError::DirectiveNotFound { ref name, .. } if name == "unknown"));

        // Children are back under the target and the text watcher is inert
        assert_eq!(app.children().len(), 2);
        data.set("name", Value::from("Bob")).unwrap();
        assert_eq!(app.text_content(), "Ann");
    }

    #[test]
    fn rendered_text_is_not_compiled_as_template() {
        let data = reactive(r#"{"msg":"{{other}}","other":"secret","bad":"{{a.b.c}}","a":{}}"#);
        let registry = DirectiveRegistry::<Node>::with_builtins();
        let shown = Node::element("p").with_attr("v-text", "msg");
        let broken = Node::element("p").with_attr("v-text", "bad");
        let app = Node::element("div").with_children([shown.clone(), broken.clone()]);

        let binding = Compiler::new(&registry, &data).compile(&app).unwrap();
        assert_eq!(binding.len(), 2);
        assert_eq!(shown.text_content(), "{{other}}");
        assert_eq!(broken.text_content(), "{{a.b.c}}");

        data.set("msg", Value::from("{{ other }}!")).unwrap();
        assert_eq!(shown.text_content(), "{{ other }}!");
    }

    #[test]
    fn fragment_round_trip() {
        let app = Node::element("div").with_children([Node::text("a"), Node::text("b")]);
        let fragment = Fragment::detach(&app);
        assert_eq!(fragment.children().len(), 2);
        assert!(app.children().is_empty());

        fragment.attach(&app);
        assert_eq!(app.text_content(), "ab");
    }
}
