//! # STX template compiler
//!
//! Compiles server-side HTML templates into a `Compiled` value (static HTML
//! fragments interleaved with dynamic slots) that renders against a JSON
//! scope, plus one client payload per `<component>` for the browser runtime.
//!
//! ## Pipeline
//!
//! 1. **Parse**: HTML into an arena tree with source positions (`parse`, `dom`).
//! 2. **Directives**: each element's directives run in ascending priority;
//!    a terminal directive cuts off everything below it (`compiler`, `directive`).
//! 3. **Components**: `<component>` elements are validated, their script is
//!    rewritten so every write to a context variable calls `_$i(...)`, and
//!    their bindings become the `STX.r(...)` payload (`component`, `codegen`).
//! 4. **Assets**: payload scripts and styles are ordered so dependencies
//!    load first (`asset`, `graph`).
//!
//! ## Identifier invariants
//!
//! - Every index in the payload comes from an insertion-ordered set: the
//!   first insertion fixes the index for the rest of the compile.
//! - Generated identifiers come from a salted `Sequence`; identical input and
//!   salt produce byte-identical payloads.

use lazy_static::lazy_static;
use rayon::prelude::*;
use std::sync::Arc;

mod asset;
mod cache;
mod codegen;
mod compiled;
mod compiler;
mod component;
mod directive;
mod dom;
pub mod error;
mod expression;
mod graph;
mod indexed;
mod interpolate;
mod loader;
mod parse;
mod reactivity;
mod rewrite;
mod scope;
mod sequence;
mod static_eval;
mod timing;
mod visitor;

#[cfg(test)]
mod component_tests;
#[cfg(test)]
mod expression_tests;
#[cfg(test)]
mod safety_tests;

pub use asset::{resolve_assets, Asset, AssetKind};
pub use cache::{cached_expressions, summarize_cached};
pub use codegen::{emit_payload, PayloadInput, TemplatePart, Watcher, LIFECYCLE_HOOKS};
pub use compiled::{
    BundleMode, Compiled, DirectiveBundle, DirectiveContext, Dynamic, Interpolated, Part, Rendered,
};
pub use compiler::{compile_expression, dynamic_token, CompileOptions, CompileOutput, Compiler};
pub use component::{component_directive, ComponentOutput, Param, ParamType, RESERVED_NAMES};
pub use directive::{if_attribute, if_element, Directive, Methods, Registry, Restrict, Transclude, DEFAULT_SLOT};
pub use dom::{Attribute, Document, Element, NodeId, NodeKind, Position};
pub use error::CompilerError;
pub use graph::{sort_nodes, GraphNode};
pub use indexed::IndexedSet;
pub use interpolate::{scan, Interpolation, Scan};
pub use loader::{DirectoryLoader, TemplateLoader, TemplateSource};
pub use parse::parse_template;
pub use rewrite::{rewrite_script, rewrite_snippet, RewrittenScript};
pub use sequence::Sequence;
pub use static_eval::{Eval, Value};
pub use timing::{ServerTiming, TimingEntry};
pub use visitor::{walk_children, walk_node, TemplateVisitor};

lazy_static! {
    static ref STANDARD_REGISTRY: Arc<Registry> = Arc::new(Registry::standard());
}

/// Compiles one template with the built-in directives.
pub fn compile(source: &str, options: &CompileOptions) -> Result<CompileOutput, CompilerError> {
    Compiler::new(Arc::clone(&STANDARD_REGISTRY), options.clone()).compile(source)
}

/// Compiles independent templates in parallel. Each source's `file` replaces
/// `options.file`; results keep the input order.
pub fn compile_many(
    sources: &[TemplateSource],
    options: &CompileOptions,
) -> Vec<Result<CompileOutput, CompilerError>> {
    sources
        .par_iter()
        .map(|source| {
            let options = CompileOptions {
                file: source.file.clone(),
                ..options.clone()
            };
            compile(&source.content, &options)
        })
        .collect()
}
