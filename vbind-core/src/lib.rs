//! vbind Core
//!
//! This crate provides the core runtime for the vbind data-binding engine.
//! Given a plain data object and a template tree, it establishes a live
//! relationship between them:
//!
//! - Reading a templated expression while rendering registers a dependency
//! - Writing the data later re-runs exactly the rendering that depended on it
//!
//! Every write propagates synchronously; there is no batching.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: observed data, dependency registries, watchers, and the
//!   tracking context
//! - `resolve`: dotted-path resolution, assignment, and `{{ }}` expansion
//! - `compile`: the template compiler and the directive registry
//! - `dom`: the rendering-sink contract and an in-memory node tree
//! - `vm`: the view model that ties data and template together
//!
//! # Template Syntax
//!
//! - `{{ path.to.value }}` inside text content
//! - `v-model="path"` on an input-capable element (two-way binding)
//! - `v-text="path"` on an element (same handler as interpolation)
//!
//! # Example
//!
//! ```rust
//! use vbind_core::dom::{Node, RenderNode};
//! use vbind_core::reactive::Object;
//! use vbind_core::vm::{Options, ViewModel};
//!
//! let input = Node::element("input").with_attr("v-model", "user.name");
//! let app = Node::element("div").with_children([
//!     input.clone(),
//!     Node::text("{{ user.name }}"),
//! ]);
//! let data = Object::parse_json(r#"{"user": {"name": "Ann"}}"#)?;
//! let _vm = ViewModel::new(Options::new(app.clone(), data))?;
//!
//! // Typing into the input updates the data, which re-renders the text
//! input.dispatch_input("Bob")?;
//! assert_eq!(app.text_content(), "Bob");
//! # Ok::<(), vbind_core::BindError>(())
//! ```

pub mod compile;
pub mod config;
pub mod dom;
pub mod error;
pub mod reactive;
pub mod resolve;
pub mod vm;

pub use config::Config;
pub use error::{BindError, Result};
pub use vm::{Options, Target, ViewModel};
