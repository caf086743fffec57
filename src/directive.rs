//! Directive definitions and the hierarchical directive registry.
//!
//! A directive is static metadata plus optional callbacks. `compile` runs
//! once per matching node at compile time and may return `Methods` that
//! replace the directive's own `process`/`leave` for that node; those run at
//! render time against the scope.

use bitflags::bitflags;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::compiled::DirectiveContext;
use crate::compiler::{compile_expression, Compiler};
use crate::dom::{normalize_attribute_name, Attribute, Document, NodeId};
use crate::error::CompilerError;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Restrict: u8 {
        const ELEMENT = 0b01;
        const ATTRIBUTE = 0b10;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transclude {
    None,
    /// The element's children become the `*` slot.
    Children,
    /// The element itself becomes the `*` slot, compiled below this
    /// directive's priority.
    Element,
    /// Child tag -> slot name; unmatched children fill `*`.
    Slots(IndexMap<String, String>),
}

pub const DEFAULT_SLOT: &str = "*";

pub type CompileFn = Arc<
    dyn Fn(&mut Compiler, &mut Document, NodeId, Option<&Attribute>) -> Result<Option<Methods>, CompilerError>
        + Send
        + Sync,
>;

pub type ProcessFn =
    Arc<dyn Fn(&mut DirectiveContext<'_, '_>) -> Result<(), CompilerError> + Send + Sync>;

/// Render-time callbacks for one directive on one node.
#[derive(Clone, Default)]
pub struct Methods {
    pub process: Option<ProcessFn>,
    pub leave: Option<ProcessFn>,
}

impl Methods {
    pub fn process(
        f: impl Fn(&mut DirectiveContext<'_, '_>) -> Result<(), CompilerError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            process: Some(Arc::new(f)),
            leave: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.process.is_none() && self.leave.is_none()
    }
}

impl fmt::Debug for Methods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Methods")
            .field("process", &self.process.is_some())
            .field("leave", &self.leave.is_some())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIRECTIVE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct Directive {
    pub name: String,
    pub restrict: Restrict,
    pub priority: u32,
    pub terminal: bool,
    pub transclude: Transclude,
    pub compile: Option<CompileFn>,
    pub process: Option<ProcessFn>,
    pub leave: Option<ProcessFn>,
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directive")
            .field("name", &self.name)
            .field("restrict", &self.restrict)
            .field("priority", &self.priority)
            .field("terminal", &self.terminal)
            .field("transclude", &self.transclude)
            .finish()
    }
}

impl Directive {
    pub fn new(name: &str, restrict: Restrict) -> Self {
        Self {
            name: normalize_attribute_name(name),
            restrict,
            priority: 0,
            terminal: false,
            transclude: Transclude::None,
            compile: None,
            process: None,
            leave: None,
        }
    }

    /// Negative priorities clamp to zero.
    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = u32::try_from(priority.max(0)).unwrap_or(u32::MAX);
        self
    }

    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    pub fn transclude(mut self, transclude: Transclude) -> Self {
        self.transclude = transclude;
        self
    }

    pub fn on_compile(
        mut self,
        f: impl Fn(&mut Compiler, &mut Document, NodeId, Option<&Attribute>) -> Result<Option<Methods>, CompilerError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.compile = Some(Arc::new(f));
        self
    }

    pub fn on_process(
        mut self,
        f: impl Fn(&mut DirectiveContext<'_, '_>) -> Result<(), CompilerError> + Send + Sync + 'static,
    ) -> Self {
        self.process = Some(Arc::new(f));
        self
    }

    pub fn on_leave(
        mut self,
        f: impl Fn(&mut DirectiveContext<'_, '_>) -> Result<(), CompilerError> + Send + Sync + 'static,
    ) -> Self {
        self.leave = Some(Arc::new(f));
        self
    }

    /// Ascending priority; terminals last among equals.
    pub fn sort_key(&self) -> (u32, bool) {
        (self.priority, self.terminal)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct Registry {
    parent: Option<Arc<Registry>>,
    elements: HashMap<String, Vec<Directive>>,
    attributes: HashMap<String, Vec<Directive>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `if` and `component` directives.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(if_element());
        registry.register(if_attribute());
        registry.register(crate::component::component_directive());
        registry
    }

    /// Extends `parent` without mutating it.
    pub fn child(parent: Arc<Registry>) -> Self {
        Self {
            parent: Some(parent),
            ..Self::default()
        }
    }

    pub fn register(&mut self, directive: Directive) {
        if directive.restrict.contains(Restrict::ELEMENT) {
            self.elements
                .entry(directive.name.clone())
                .or_default()
                .push(directive.clone());
        }
        if directive.restrict.contains(Restrict::ATTRIBUTE) {
            self.attributes
                .entry(directive.name.clone())
                .or_default()
                .push(directive);
        }
    }

    pub fn lookup_element(&self, tag: &str) -> Vec<Directive> {
        let mut found = self
            .parent
            .as_ref()
            .map(|p| p.lookup_element(tag))
            .unwrap_or_default();
        found.extend(self.elements.get(tag).into_iter().flatten().cloned());
        found
    }

    pub fn lookup_attribute(&self, name: &str) -> Vec<Directive> {
        let mut found = self
            .parent
            .as_ref()
            .map(|p| p.lookup_attribute(name))
            .unwrap_or_default();
        found.extend(self.attributes.get(name).into_iter().flatten().cloned());
        found
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILT-INS
// ═══════════════════════════════════════════════════════════════════════════════

fn conditional(expression: &str) -> Result<Option<Methods>, CompilerError> {
    let eval = compile_expression(expression)?;
    Ok(Some(Methods::process(move |ctx| {
        if ctx.evaluate(&eval).truthy() {
            ctx.render_slot(DEFAULT_SLOT)
        } else {
            ctx.clear_output();
            Ok(())
        }
    })))
}

/// `<if cond="expr">…</if>` renders its children when `expr` is truthy.
pub fn if_element() -> Directive {
    Directive::new("if", Restrict::ELEMENT)
        .priority(600)
        .terminal()
        .transclude(Transclude::Children)
        .on_compile(|_, doc, node, _| {
            let cond = doc
                .element(node)
                .and_then(|el| el.value("cond"))
                .unwrap_or("false")
                .to_string();
            conditional(&cond)
        })
}

/// `<tag if="expr">` renders the element when `expr` is truthy.
pub fn if_attribute() -> Directive {
    Directive::new("if", Restrict::ATTRIBUTE)
        .priority(599)
        .terminal()
        .transclude(Transclude::Element)
        .on_compile(|_, doc, node, attr| {
            let expression = attr.map(|a| a.value.clone()).unwrap_or_default();
            if let Some(el) = doc.element_mut(node) {
                el.remove_attribute("if");
            }
            conditional(&expression)
        })
}
