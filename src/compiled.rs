//! Compiled templates and their render-time execution.
//!
//! A `Compiled` interleaves literal strings with dynamic slots. Executing it
//! against a scope yields a `Rendered` tree that borrows the static parts,
//! so repeated renders never copy the literal HTML.

use indexmap::IndexMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::directive::Methods;
use crate::dom::{escape_html, render_attributes, Attribute};
use crate::error::CompilerError;
use crate::sequence::digest_hex;
use crate::static_eval::{Eval, Value};

// ═══════════════════════════════════════════════════════════════════════════════
// DYNAMICS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Interpolated {
    pub source: String,
    pub eval: Eval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleMode {
    /// The element was transcluded; the bundle's output replaces it.
    Replace,
    /// The bundle renders the element's attribute list.
    Attributes,
}

/// Directives applied to one element, with the state they render from.
#[derive(Debug, Clone)]
pub struct DirectiveBundle {
    pub mode: BundleMode,
    pub attributes: Vec<Attribute>,
    pub methods: Vec<Methods>,
    pub slots: IndexMap<String, Arc<Compiled>>,
}

#[derive(Debug, Clone)]
pub enum Dynamic {
    /// `${…}`: HTML-escaped at render.
    Expression(Interpolated),
    /// `#{…}`: inserted as-is.
    ExpressionUnsafe(Interpolated),
    Directives(DirectiveBundle),
    Nested(Arc<Compiled>),
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDERED OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Part<'c> {
    Nil,
    Text(String),
    Rendered(Rendered<'c>),
}

impl fmt::Display for Part<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Part::Nil => Ok(()),
            Part::Text(text) => f.write_str(text),
            Part::Rendered(rendered) => rendered.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rendered<'c> {
    pub statics: &'c [String],
    pub dynamics: Vec<Part<'c>>,
    pub fingerprint: &'c str,
}

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, literal) in self.statics.iter().enumerate() {
            f.write_str(literal)?;
            if let Some(part) = self.dynamics.get(i) {
                part.fmt(f)?;
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIRECTIVE EXECUTION CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// State handed to directive `process`/`leave` callbacks for one element.
pub struct DirectiveContext<'s, 'c> {
    pub scope: &'s serde_json::Value,
    pub attributes: Vec<Attribute>,
    slots: &'c IndexMap<String, Arc<Compiled>>,
    output: Option<Part<'c>>,
}

impl<'s, 'c> DirectiveContext<'s, 'c> {
    pub fn evaluate(&self, eval: &Eval) -> Value {
        eval.evaluate(self.scope)
    }

    pub fn slot(&self, name: &str) -> Option<&Arc<Compiled>> {
        self.slots.get(name)
    }

    /// Renders the named slot as this element's output.
    pub fn render_slot(&mut self, name: &str) -> Result<(), CompilerError> {
        let slots = self.slots;
        if let Some(compiled) = slots.get(name) {
            self.output = Some(Part::Rendered(compiled.exec(self.scope)?));
        }
        Ok(())
    }

    pub fn set_output(&mut self, text: impl Into<String>) {
        self.output = Some(Part::Text(text.into()));
    }

    pub fn clear_output(&mut self) {
        self.output = None;
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn set_attribute(&mut self, name_raw: &str, value: &str) {
        let attribute = Attribute::new(name_raw, value);
        match self.attributes.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => existing.value = attribute.value,
            None => self.attributes.push(attribute),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) {
        self.attributes.retain(|a| a.name != name);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILED TEMPLATE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct Compiled {
    statics: Vec<String>,
    dynamics: Vec<Dynamic>,
    fingerprint: OnceLock<String>,
}

impl Clone for Compiled {
    fn clone(&self) -> Self {
        Self::new(self.statics.clone(), self.dynamics.clone())
    }
}

impl Compiled {
    /// `statics` must hold exactly one more entry than `dynamics`.
    pub fn new(statics: Vec<String>, dynamics: Vec<Dynamic>) -> Self {
        debug_assert_eq!(statics.len(), dynamics.len() + 1);
        Self {
            statics,
            dynamics,
            fingerprint: OnceLock::new(),
        }
    }

    pub fn text(html: impl Into<String>) -> Self {
        Self::new(vec![html.into()], Vec::new())
    }

    pub fn statics(&self) -> &[String] {
        &self.statics
    }

    pub fn dynamics(&self) -> &[Dynamic] {
        &self.dynamics
    }

    pub fn fingerprint(&self) -> &str {
        self.fingerprint
            .get_or_init(|| digest_hex(&self.statics.concat()))
    }

    pub fn exec(&self, scope: &serde_json::Value) -> Result<Rendered<'_>, CompilerError> {
        let mut dynamics = Vec::with_capacity(self.dynamics.len());
        for dynamic in &self.dynamics {
            dynamics.push(match dynamic {
                Dynamic::Expression(interpolated) => interpolated
                    .eval
                    .evaluate(scope)
                    .render()
                    .map(|text| Part::Text(escape_html(&text)))
                    .unwrap_or(Part::Nil),
                Dynamic::ExpressionUnsafe(interpolated) => interpolated
                    .eval
                    .evaluate(scope)
                    .render()
                    .map(Part::Text)
                    .unwrap_or(Part::Nil),
                Dynamic::Directives(bundle) => run_bundle(bundle, scope)?,
                Dynamic::Nested(compiled) => Part::Rendered(compiled.exec(scope)?),
            });
        }
        Ok(Rendered {
            statics: &self.statics,
            dynamics,
            fingerprint: self.fingerprint(),
        })
    }

    /// Executes and serializes in one step.
    pub fn render(&self, scope: &serde_json::Value) -> Result<String, CompilerError> {
        Ok(self.exec(scope)?.to_string())
    }
}

fn run_bundle<'c>(
    bundle: &'c DirectiveBundle,
    scope: &serde_json::Value,
) -> Result<Part<'c>, CompilerError> {
    let mut context = DirectiveContext {
        scope,
        attributes: bundle.attributes.clone(),
        slots: &bundle.slots,
        output: None,
    };
    for methods in &bundle.methods {
        if let Some(process) = &methods.process {
            process(&mut context)?;
        }
    }
    for methods in bundle.methods.iter().rev() {
        if let Some(leave) = &methods.leave {
            leave(&mut context)?;
        }
    }

    Ok(match bundle.mode {
        BundleMode::Replace => context.output.take().unwrap_or(Part::Nil),
        BundleMode::Attributes => {
            let mut out = String::new();
            render_attributes(&context.attributes, &mut out);
            Part::Text(out.trim_start().to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn interpolated(value: &str) -> Interpolated {
        Interpolated {
            source: value.to_string(),
            eval: Eval::Identifier(value.to_string()),
        }
    }

    #[test]
    fn test_text_only_template() {
        let compiled = Compiled::text("<p>hi</p>");
        let rendered = compiled.exec(&json!({})).unwrap();
        assert_eq!(rendered.statics.len(), 1);
        assert!(rendered.dynamics.is_empty());
        assert_eq!(rendered.to_string(), "<p>hi</p>");
    }

    #[test]
    fn test_escaped_and_raw_expressions() {
        let compiled = Compiled::new(
            vec!["<div>".into(), "</div><div>".into(), "</div>".into()],
            vec![
                Dynamic::Expression(interpolated("v")),
                Dynamic::ExpressionUnsafe(interpolated("v")),
            ],
        );
        let html = compiled.render(&json!({ "v": "<b>" })).unwrap();
        assert_eq!(html, "<div>&lt;b&gt;</div><div><b></div>");
        assert_eq!(compiled.render(&json!({})).unwrap(), "<div></div><div></div>");
    }

    #[test]
    fn test_nested_templates_splice() {
        let inner = Arc::new(Compiled::new(
            vec!["<i>".into(), "</i>".into()],
            vec![Dynamic::Expression(interpolated("n"))],
        ));
        let outer = Compiled::new(vec!["<p>".into(), "</p>".into()], vec![Dynamic::Nested(inner)]);
        let rendered = outer.exec(&json!({ "n": 3 })).unwrap();
        assert!(matches!(rendered.dynamics[0], Part::Rendered(_)));
        assert_eq!(rendered.to_string(), "<p><i>3</i></p>");
    }

    #[test]
    fn test_fingerprint_is_stable_digest() {
        let a = Compiled::new(vec!["a".into(), "b".into()], vec![Dynamic::Expression(interpolated("x"))]);
        let b = Compiled::new(vec!["a".into(), "b".into()], vec![Dynamic::ExpressionUnsafe(interpolated("y"))]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), digest_hex("ab"));
        assert_eq!(a.fingerprint().len(), 64);
    }
}
