//! Template Compilation
//!
//! Turns a template tree into live bindings: the [`Compiler`] walks nodes
//! and recognizes directive attributes and interpolation markers, and the
//! [`DirectiveRegistry`] maps each keyword to the handler that wires it.

mod compiler;
mod directive;

pub use compiler::{Compiler, Fragment, DIRECTIVE_PREFIX, TEXT_DIRECTIVE};
pub use directive::{Binding, Directive, DirectiveRegistry, ModelDirective, TextDirective};
