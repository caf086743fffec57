//! Component compiler.
//!
//! A `<component>` renders on the server as its host element and produces a
//! client payload: the component script rewritten for reactivity plus the
//! binding tables (elements, expressions, watchers, events) the runtime uses
//! to keep the DOM in sync. Interpolations under a component are bound on the
//! client, so they never become server-side dynamics.

use indexmap::IndexSet;
use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::asset::{Asset, AssetKind};
use crate::cache::summarize_cached;
use crate::codegen::{
    emit_payload, js_quote, normalize_function, PayloadInput, TemplatePart, Watcher, LIFECYCLE_HOOKS,
};
use crate::compiled::Dynamic;
use crate::compiler::{locate, Compiler};
use crate::directive::{Directive, Restrict};
use crate::dom::{Attribute, Document, Element, NodeId, NodeKind, RAW_TEXT_ELEMENTS};
use crate::error::*;
use crate::expression::Shape;
use crate::interpolate::{has_markers, scan, Part};
use crate::reactivity::ContextScope;
use crate::rewrite::{rewrite_script, rewrite_snippet};
use crate::scope::{parse_program, scope_declarations};
use crate::sequence::Sequence;
use crate::visitor::{walk_children, TemplateVisitor};

/// Names the runtime injects into every component script.
pub const RESERVED_NAMES: [&str; 5] = ["STX", "$", "push", "watch", "tick"];

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
}

pub fn is_reserved(name: &str) -> bool {
    name.starts_with("_$")
        || RESERVED_NAMES.contains(&name)
        || LIFECYCLE_HOOKS.iter().any(|(hook, _)| *hook == name)
}

/// `user-name` / `user_name` -> `userName`.
pub fn lower_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, segment) in name
        .split(['-', '_'])
        .filter(|s| !s.is_empty())
        .enumerate()
    {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            if i == 0 {
                out.extend(first.to_lowercase());
            } else {
                out.extend(first.to_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Bool,
    Array,
    Object,
    Function,
    Unknown,
}

impl ParamType {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "string" => ParamType::String,
            "number" => ParamType::Number,
            "bool" | "boolean" => ParamType::Bool,
            "array" => ParamType::Array,
            "object" => ParamType::Object,
            "function" => ParamType::Function,
            "unknown" | "" => ParamType::Unknown,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub optional: bool,
    /// Server parameter this client parameter mirrors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

fn parse_param(name: String, value: &str, client: bool) -> Result<Param, CompilerError> {
    let value = value.trim();
    let (optional, value) = match value.strip_prefix('?') {
        Some(rest) => (true, rest.trim()),
        None => (false, value),
    };
    if client {
        if let Some(target) = value.strip_prefix('@') {
            return Ok(Param {
                name,
                kind: ParamType::Unknown,
                optional,
                reference: Some(lower_camel(target.trim())),
            });
        }
    }
    let kind = ParamType::parse(value).ok_or_else(|| {
        CompilerError::new(COMPONENT_PARAM_TYPE, "Unknown parameter type")
            .detail("param", &name)
            .detail("type", value)
    })?;
    Ok(Param {
        name,
        kind,
        optional,
        reference: None,
    })
}

/// Server and client parameters declared on the component element.
fn parameters(element: &Element) -> Result<(Vec<Param>, Vec<Param>), CompilerError> {
    let mut server = Vec::new();
    let mut client = Vec::new();
    for attr in &element.attributes {
        if let Some(raw) = attr.name.strip_prefix("client-param-") {
            let name = lower_camel(raw);
            if !IDENTIFIER.is_match(&name) || is_reserved(&name) {
                return Err(
                    CompilerError::new(COMPONENT_PARAM_CLIENT_NAME, "Invalid client parameter name")
                        .detail("param", &name),
                );
            }
            client.push(parse_param(name, &attr.value, true)?);
        } else if let Some(raw) = attr.name.strip_prefix("param-") {
            server.push(parse_param(lower_camel(raw), &attr.value, false)?);
        }
    }

    for param in &mut client {
        let Some(target) = &param.reference else {
            continue;
        };
        let Some(source) = server.iter().find(|s| &s.name == target) else {
            return Err(CompilerError::new(
                COMPONENT_PARAM_CLIENT_REF_NOT_FOUND,
                "Client parameter references an unknown server parameter",
            )
            .detail("param", &param.name)
            .detail("reference", target));
        };
        param.kind = source.kind;
        param.optional = source.optional;
    }
    Ok((server, client))
}

fn is_consumed(name: &str) -> bool {
    name == "name" || name == "element" || name.starts_with("param-") || name.starts_with("client-param-")
}

fn is_event(name: &str) -> bool {
    name.len() > 2 && name.starts_with("on")
}

/// Host attributes are copied to the output as-is, so none may bind.
fn check_host_attributes(element: &Element) -> Result<(), CompilerError> {
    let bound = element
        .attributes
        .iter()
        .filter(|a| !is_consumed(&a.name))
        .find(|a| is_event(&a.name) || has_markers(&a.value));
    match bound {
        Some(attr) => Err(CompilerError::new(
            COMPONENT_HOST_BINDING,
            "Component element attributes cannot bind",
        )
        .detail("attribute", &attr.name)),
        None => Ok(()),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentOutput {
    pub name: String,
    /// Host element tag.
    pub tag: String,
    pub payload: String,
    /// Name of the payload's script asset.
    pub asset: String,
    /// Name of the stylesheet asset, when the component has a style.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    pub client_params: Vec<Param>,
    pub server_params: Vec<Param>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TREE SCANS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct Structure {
    nested: Option<NodeId>,
    styles: Vec<NodeId>,
    scripts: Vec<NodeId>,
}

impl TemplateVisitor for Structure {
    fn visit_element(&mut self, doc: &Document, id: NodeId, element: &Element) {
        match element.tag.as_str() {
            "component" => {
                self.nested.get_or_insert(id);
            }
            "style" => self.styles.push(id),
            "script" => self.scripts.push(id),
            _ => {}
        }
        walk_children(self, doc, id);
    }
}

/// Elements and interpolated text nodes, in document order.
#[derive(Default)]
struct Bindable {
    references: Vec<NodeId>,
    nodes: Vec<NodeId>,
}

impl TemplateVisitor for Bindable {
    fn visit_element(&mut self, doc: &Document, id: NodeId, element: &Element) {
        if element.attribute("ref").is_some() {
            self.references.push(id);
        }
        self.nodes.push(id);
        walk_children(self, doc, id);
    }

    fn visit_text(&mut self, doc: &Document, id: NodeId, text: &str) {
        let raw = doc
            .parent(id)
            .and_then(|p| doc.tag(p))
            .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(tag));
        if !raw && has_markers(text) {
            self.nodes.push(id);
        }
    }
}

fn single(
    doc: &Document,
    component: NodeId,
    found: &[NodeId],
    single_code: &str,
    location_code: &str,
    tag: &str,
) -> Result<Option<NodeId>, CompilerError> {
    if let Some(&extra) = found.get(1) {
        return Err(locate(
            CompilerError::new(single_code, format!("Component has more than one <{}>", tag)),
            doc,
            extra,
        ));
    }
    match found.first() {
        Some(&node) if doc.parent(node) != Some(component) => Err(locate(
            CompilerError::new(
                location_code,
                format!("<{}> must be an immediate child of <component>", tag),
            ),
            doc,
            node,
        )),
        other => Ok(other.copied()),
    }
}

/// Returns the style and script elements after checking the component shape.
fn validate(doc: &Document, id: NodeId) -> Result<(Option<NodeId>, Option<NodeId>), CompilerError> {
    let mut structure = Structure::default();
    walk_children(&mut structure, doc, id);
    if let Some(nested) = structure.nested {
        return Err(locate(
            CompilerError::new(COMPONENT_NESTED, "Components cannot be nested"),
            doc,
            nested,
        ));
    }
    let style = single(
        doc,
        id,
        &structure.styles,
        COMPONENT_STYLE_SINGLE,
        COMPONENT_STYLE_LOCATION,
        "style",
    )?;
    let script = single(
        doc,
        id,
        &structure.scripts,
        COMPONENT_SCRIPT_SINGLE,
        COMPONENT_SCRIPT_LOCATION,
        "script",
    )?;
    Ok((style, script))
}

fn text_content(doc: &Document, id: NodeId) -> String {
    doc.children(id)
        .into_iter()
        .filter_map(|child| doc.text(child))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// BINDING
// ═══════════════════════════════════════════════════════════════════════════════

struct Bound {
    index: usize,
    context: Vec<String>,
}

struct Binder<'d> {
    doc: &'d mut Document,
    sequence: Sequence,
    context: ContextScope,
    payload: PayloadInput,
    /// Element index and handle class by node.
    handles: HashMap<NodeId, (usize, String)>,
    /// Script assets of the sub-components used in the template.
    dependencies: IndexSet<String>,
}

impl Binder<'_> {
    fn references(&mut self, nodes: &[NodeId]) -> Result<Vec<String>, CompilerError> {
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        for &node in nodes {
            let Some(raw) = self.doc.element(node).and_then(|el| el.value("ref")) else {
                continue;
            };
            let name = lower_camel(raw.trim());
            if !IDENTIFIER.is_match(&name) || is_reserved(&name) {
                return Err(locate(
                    CompilerError::new(COMPONENT_JS_REF_NAME, "Invalid reference name")
                        .detail("ref", &name),
                    self.doc,
                    node,
                ));
            }
            if !seen.insert(name.clone()) {
                return Err(locate(
                    CompilerError::new(COMPONENT_JS_REF_DUPLICATED, "Duplicated reference name")
                        .detail("ref", &name),
                    self.doc,
                    node,
                ));
            }

            let handle = self.sequence.reference_handle(&name);
            if let Some(el) = self.doc.element_mut(node) {
                el.remove_attribute("ref");
                el.add_class(&handle);
            }
            let index = self.payload.element_ids.insert(handle.clone());
            self.handles.insert(node, (index, handle));
            self.payload.references.push((name.clone(), index));
            names.push(name);
        }
        Ok(names)
    }

    fn handle(&mut self, node: NodeId) -> usize {
        if let Some((index, _)) = self.handles.get(&node) {
            return *index;
        }
        let handle = self.sequence.element_handle();
        if let Some(el) = self.doc.element_mut(node) {
            el.add_class(&handle);
        }
        let index = self.payload.element_ids.insert(handle.clone());
        self.handles.insert(node, (index, handle));
        index
    }

    /// Registers one interpolation as a payload expression.
    fn expression(&mut self, source: &str, is_safe: bool, raw: bool) -> Result<Bound, CompilerError> {
        let summary = summarize_cached(source)?;
        self.context.check_side_effects(&summary)?;
        let resolution = self.context.resolve(&summary);
        if resolution.context.is_empty() && summary.is_literal() {
            tracing::warn!(expression = %summary.source, "interpolation is a constant");
        }
        tracing::trace!(
            expression = %summary.source,
            context = ?resolution.context,
            undeclared = ?resolution.undeclared,
            "bound expression"
        );

        let wrapped = if is_safe && !raw {
            format!("_$escape({})", summary.source)
        } else {
            format!("({})", summary.source)
        };
        let index = self.payload.expressions.insert(format!("() => {}", wrapped));
        Ok(Bound {
            index,
            context: resolution.context,
        })
    }

    fn watch(&mut self, watcher: Watcher, variables: &[String]) {
        let index = self.payload.watchers.insert(watcher);
        for variable in variables {
            self.payload.link(variable, index);
        }
    }

    fn bind_text(&mut self, node: NodeId) -> Result<(), CompilerError> {
        let Some(text) = self.doc.text(node).map(str::to_string) else {
            return Ok(());
        };
        let scanned = scan(&text, &mut self.sequence);
        let position = self.doc.position(node);
        for part in scanned.parts() {
            let replacement = match part {
                Part::Literal(literal) => self.doc.create(NodeKind::Text(literal.to_string()), position),
                Part::Expression(found) => {
                    let element = self.payload.element_ids.insert(found.placeholder.clone());
                    let bound = self
                        .expression(&found.expression, found.is_safe, false)
                        .map_err(|err| locate(err, self.doc, node))?;
                    self.watch(
                        Watcher::Text {
                            element,
                            expression: bound.index,
                        },
                        &bound.context,
                    );
                    let mut embed = Element::new("embed");
                    embed.set_attribute("hidden", "");
                    embed.set_attribute("class", &found.placeholder);
                    self.doc.create(NodeKind::Element(embed), position)
                }
            };
            self.doc.insert_before(node, replacement);
        }
        self.doc.detach(node);
        Ok(())
    }

    fn bind_element(&mut self, compiler: &Compiler, node: NodeId) -> Result<(), CompilerError> {
        let Some(element) = self.doc.element(node).cloned() else {
            return Ok(());
        };
        let sub_component = compiler.component(&element.tag).map(|c| c.asset.clone());
        if let Some(asset) = &sub_component {
            self.dependencies.insert(asset.clone());
        }

        for attr in &element.attributes {
            let bound = if is_event(&attr.name) {
                self.bind_event(node, attr)
            } else if has_markers(&attr.value) {
                self.bind_attribute(node, attr, sub_component.is_some())
            } else {
                continue;
            };
            bound.map_err(|err| locate(err.detail("attribute", &attr.name_raw), self.doc, node))?;
            if let Some(el) = self.doc.element_mut(node) {
                el.remove_attribute(&attr.name);
            }
        }

        // A bound `class` takes the handle class with it.
        if let (Some((_, class)), Some(el)) = (self.handles.get(&node), self.doc.element_mut(node)) {
            el.add_class(class);
        }
        Ok(())
    }

    fn bind_attribute(
        &mut self,
        node: NodeId,
        attr: &Attribute,
        sub_component: bool,
    ) -> Result<(), CompilerError> {
        let element = self.handle(node);
        let attribute = self.payload.attributes_bound.insert(attr.name.clone());
        let scanned = scan(&attr.value, &mut self.sequence);
        let parts = scanned.parts();

        if let [Part::Expression(found)] = parts.as_slice() {
            if found.is_full_content {
                let bound = self.expression(&found.expression, found.is_safe, sub_component)?;
                self.watch(
                    Watcher::Property {
                        element,
                        attribute,
                        expression: bound.index,
                    },
                    &bound.context,
                );
                return Ok(());
            }
        }

        let mut template = Vec::new();
        let mut variables = Vec::new();
        for part in parts {
            match part {
                Part::Literal(text) => template.push(TemplatePart::Static(text.to_string())),
                Part::Expression(found) => {
                    let bound = self.expression(&found.expression, found.is_safe, false)?;
                    template.push(TemplatePart::Expression(bound.index));
                    variables.extend(bound.context);
                }
            }
        }
        self.watch(
            Watcher::Template {
                element,
                attribute,
                parts: template,
            },
            &variables,
        );
        Ok(())
    }

    fn bind_event(&mut self, node: NodeId, attr: &Attribute) -> Result<(), CompilerError> {
        let element = self.handle(node);
        let handler = self.handler(&attr.value)?;
        let event = self.payload.event_names.insert(attr.name[2..].to_string());
        let handler = self.payload.event_handlers.insert(handler);
        self.payload.events.insert([event, element, handler]);
        Ok(())
    }

    /// Canonical `(e) => { … }` wrapper for an event attribute value.
    fn handler(&mut self, source: &str) -> Result<String, CompilerError> {
        let source = source.trim();
        for prefix in ["javascript:", "js:"] {
            if let Some(rest) = source.strip_prefix(prefix) {
                return Ok(rest.trim().to_string());
            }
        }

        let wrapped = match summarize_cached(source) {
            Ok(summary) => match &summary.shape {
                Shape::Call { callee, .. } if callee != "push" && self.context.is_declared(callee) => {
                    format!("(e) => {{ {} }}", source)
                }
                Shape::Call {
                    callee,
                    arguments: Some(arguments),
                } => format!("(e) => {{ STX.push({}, $, e, {}) }}", js_quote(callee), arguments),
                Shape::Call { callee, .. } => format!("(e) => {{ STX.push({}, $, e) }}", js_quote(callee)),
                Shape::Identifier(name) if self.context.is_declared(name) => {
                    format!("(e) => {{ {}(e) }}", name)
                }
                Shape::Identifier(name) => format!("(e) => {{ STX.push({}, $, e) }}", js_quote(name)),
                Shape::Arrow => source.to_string(),
                Shape::Function => format!("(e) => {{ {}() }}", normalize_function(source)?),
                Shape::Other => format!("(e) => {{ {} }}", source),
            },
            Err(err) => {
                // Statement lists are not expressions
                let allocator = Allocator::default();
                if parse_program(&allocator, source).is_err() {
                    return Err(err);
                }
                format!("(e) => {{ {} }}", source)
            }
        };
        rewrite_snippet(&wrapped, self.context.declared(), &mut self.payload.context_variables)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCRIPT
// ═══════════════════════════════════════════════════════════════════════════════

/// Source run inside the payload's `i` function: reference declarations,
/// the parameter prelude, then the component script.
fn context_source(references: &[String], client_params: &[Param], script: &str) -> String {
    let mut source = String::new();
    if !references.is_empty() {
        source.push_str(&format!("let {};\n", references.join(", ")));
    }
    for param in client_params {
        source.push_str(&format!("let {} = $.params[{}];\n", param.name, js_quote(&param.name)));
    }
    if !client_params.is_empty() {
        let updates: Vec<String> = client_params
            .iter()
            .map(|p| format!("{} = _$p[{}];", p.name, js_quote(&p.name)))
            .collect();
        source.push_str(&format!("$.onChangeParams((_$p) => {{ {} }});\n", updates.join(" ")));
    }
    source.push_str(script.trim());
    source
}

/// Rejects script declarations that shadow references or client parameters.
fn check_redeclarations(script: &str, injected: &[String]) -> Result<Vec<&'static str>, CompilerError> {
    let allocator = Allocator::default();
    let program = parse_program(&allocator, script)?;
    let declared = scope_declarations(&program.body);
    if let Some(name) = declared.iter().find(|name| injected.contains(*name)) {
        return Err(
            CompilerError::new(COMPONENT_JS_REDECLARATION, "Identifier is already declared")
                .detail("identifier", name),
        );
    }
    Ok(LIFECYCLE_HOOKS
        .iter()
        .filter(|(hook, _)| declared.iter().any(|name| name.as_str() == *hook))
        .map(|(hook, _)| *hook)
        .collect())
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIRECTIVE
// ═══════════════════════════════════════════════════════════════════════════════

pub fn compile_component(
    compiler: &mut Compiler,
    doc: &mut Document,
    id: NodeId,
) -> Result<(), CompilerError> {
    let (style, script) = validate(doc, id)?;
    let Some(element) = doc.element(id).cloned() else {
        return Ok(());
    };
    let name = element
        .value("name")
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| CompilerError::new(COMPONENT_NAME, "Component is missing a name"))?
        .to_string();
    let tag = element
        .value("element")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(&name)
        .to_ascii_lowercase();
    let (server_params, client_params) = parameters(&element)?;
    check_host_attributes(&element)?;

    let style_text = style.map(|s| text_content(doc, s)).unwrap_or_default();
    let script_text = script.map(|s| text_content(doc, s)).unwrap_or_default();
    // Neutralized in place; the script node still locates script errors.
    for node in style.into_iter().chain(script) {
        doc.safe_remove(node);
    }

    let mut bindable = Bindable::default();
    walk_children(&mut bindable, doc, id);

    let position = doc.position(id);
    let mut binder = Binder {
        sequence: compiler.sequence().salted(&name),
        context: ContextScope::default(),
        payload: PayloadInput {
            tag: tag.clone(),
            file: doc.file.clone(),
            line: position.line,
            ..PayloadInput::default()
        },
        handles: HashMap::new(),
        dependencies: IndexSet::new(),
        doc: &mut *doc,
    };

    let references = binder.references(&bindable.references)?;
    if let Some(param) = client_params.iter().find(|p| references.contains(&p.name)) {
        return Err(CompilerError::new(
            COMPONENT_JS_REDECLARATION,
            "Client parameter collides with a reference",
        )
        .detail("identifier", &param.name));
    }
    let injected: Vec<String> = references
        .iter()
        .cloned()
        .chain(client_params.iter().map(|p| p.name.clone()))
        .collect();
    let hooks = check_redeclarations(&script_text, &injected).map_err(|err| match script {
        Some(node) => locate(err, binder.doc, node),
        None => err,
    })?;

    // Context writes are indexed before any template binding.
    let source = context_source(&references, &client_params, &script_text);
    binder.context = ContextScope::new(injected);
    {
        let allocator = Allocator::default();
        let program = parse_program(&allocator, &source)?;
        binder.context.declare_program(&program);
    }
    let rewritten = rewrite_script(&source, binder.context.declared(), &mut binder.payload.context_variables)?;
    binder.payload.body = rewritten.body;
    binder.payload.imports = rewritten.imports;
    binder.payload.exports = rewritten.exports;
    binder.payload.hooks = hooks;

    for node in bindable.nodes {
        if binder.doc.text(node).is_some() {
            binder.bind_text(node)?;
        } else {
            binder.bind_element(compiler, node)?;
        }
    }

    for variable in binder.payload.unwatched() {
        tracing::warn!(component = %name, %variable, "reactive variable has no watcher");
    }
    let payload = emit_payload(&binder.payload);
    let dependencies = binder.dependencies;

    let mut script_asset = Asset::new(AssetKind::Javascript, payload.clone());
    for dependency in &dependencies {
        script_asset.depends_on(dependency);
    }
    let mut assets = Vec::new();
    let style_asset = (!style_text.trim().is_empty())
        .then(|| Asset::new(AssetKind::Stylesheet, style_text.trim()));
    let output = ComponentOutput {
        name,
        tag: tag.clone(),
        payload,
        asset: script_asset.name.clone(),
        style: style_asset.as_ref().map(|a| a.name.clone()),
        client_params,
        server_params,
    };
    assets.extend(style_asset);
    assets.push(script_asset);
    compiler.register_component(output, assets);

    if let Some(el) = doc.element_mut(id) {
        el.tag = tag;
        el.attributes.retain(|a| !is_consumed(&a.name));
    }
    let mut children = doc.extract_children(id);
    let root = children.root();
    let compiled = compiler.compile_document(&mut children, root, None)?;
    let token = compiler.push_dynamic(Dynamic::Nested(Arc::new(compiled)));
    let marker = doc.create(NodeKind::Raw(token), position);
    doc.append(id, marker);
    Ok(())
}

/// `<component name="…">`: terminal, above every built-in.
pub fn component_directive() -> Directive {
    Directive::new("component", Restrict::ELEMENT)
        .priority(1000)
        .terminal()
        .on_compile(|compiler, doc, node, _| {
            compile_component(compiler, doc, node)?;
            Ok(None)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_camel() {
        assert_eq!(lower_camel("user-name"), "userName");
        assert_eq!(lower_camel("Save_Button"), "saveButton");
        assert_eq!(lower_camel("x"), "x");
        assert_eq!(lower_camel("--a--b"), "aB");
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved("STX"));
        assert!(is_reserved("tick"));
        assert!(is_reserved("OnMount"));
        assert!(is_reserved("_$x"));
        assert!(!is_reserved("count"));
    }

    #[test]
    fn test_param_types() {
        let param = parse_param("size".into(), "?number", false).unwrap();
        assert_eq!(param.kind, ParamType::Number);
        assert!(param.optional);
        assert_eq!(parse_param("x".into(), "", false).unwrap().kind, ParamType::Unknown);
        let err = parse_param("x".into(), "date", false).unwrap_err();
        assert_eq!(err.code, COMPONENT_PARAM_TYPE);
        let reference = parse_param("id".into(), "@user-id", true).unwrap();
        assert_eq!(reference.reference.as_deref(), Some("userId"));
    }

    #[test]
    fn test_context_source_prelude() {
        let params = vec![Param {
            name: "title".into(),
            kind: ParamType::String,
            optional: false,
            reference: None,
        }];
        let source = context_source(&["btn".to_string()], &params, " let n = 1; ");
        assert_eq!(
            source,
            "let btn;\nlet title = $.params['title'];\n$.onChangeParams((_$p) => { title = _$p['title']; });\nlet n = 1;"
        );
    }
}
