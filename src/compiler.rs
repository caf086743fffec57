//! Directive pipeline.
//!
//! Walks the parsed tree, applies directives to each element in priority
//! order, turns page-level interpolations into dynamics, and finally splits
//! the serialized tree into the static/dynamic arrays of a `Compiled`.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::mem;
use std::sync::Arc;

use crate::asset::{resolve_assets, Asset};
use crate::cache::summarize_cached;
use crate::compiled::{BundleMode, Compiled, DirectiveBundle, Dynamic, Interpolated};
use crate::component::ComponentOutput;
use crate::directive::{Directive, Methods, Registry, Restrict, Transclude, DEFAULT_SLOT};
use crate::dom::{escape_text, Attribute, Document, NodeId, NodeKind, RAW_TEXT_ELEMENTS};
use crate::error::{CompilerError, JS_INTERPOLATION_UNSUPPORTED};
use crate::interpolate::{has_markers, scan, Part};
use crate::parse::parse_template;
use crate::reactivity::check_side_effects_free;
use crate::sequence::Sequence;
use crate::static_eval::Eval;
use crate::timing::ServerTiming;

lazy_static! {
    static ref DYNAMIC_TOKEN: Regex = Regex::new(r"\x{2423}____sdi__(\d+)__").unwrap();
}

/// Marker spliced into the tree where dynamic `index` renders.
pub fn dynamic_token(index: usize) -> String {
    format!("\u{2423}____sdi__{}__", index)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Path used in error locations and `_$file`.
    pub file: String,
    /// Extra salt for generated identifiers; defaults to `file`.
    pub salt: Option<String>,
    /// Collect Server-Timing entries.
    pub timing: bool,
}

#[derive(Debug)]
pub struct CompileOutput {
    pub compiled: Compiled,
    /// Dependency-sorted.
    pub assets: Vec<Asset>,
    pub components: Vec<ComponentOutput>,
    pub timing: ServerTiming,
}

/// Lower a page-level interpolation to its render-time evaluator.
pub fn compile_expression(source: &str) -> Result<Eval, CompilerError> {
    let summary = summarize_cached(source)?;
    check_side_effects_free(&summary)?;
    if summary.is_literal() {
        tracing::warn!(expression = %summary.source, "interpolation is a constant");
    }
    summary.eval.clone().map_err(|reason| {
        CompilerError::new(
            JS_INTERPOLATION_UNSUPPORTED,
            "Interpolation cannot be evaluated on the server",
        )
        .detail("expression", &summary.source)
        .detail("reason", reason)
    })
}

fn interpolate_directive() -> Directive {
    enum Piece {
        Literal(String),
        Value(Eval),
    }

    Directive::new("interpolate", Restrict::ATTRIBUTE).on_compile(|compiler, _, _, attr| {
        let Some(attr) = attr else {
            return Ok(None);
        };
        let scanned = scan(&attr.value, compiler.sequence_mut());
        let mut pieces = Vec::new();
        for part in scanned.parts() {
            pieces.push(match part {
                Part::Literal(text) => Piece::Literal(text.to_string()),
                Part::Expression(found) => Piece::Value(compile_expression(&found.expression)?),
            });
        }

        let name = attr.name_raw.clone();
        Ok(Some(Methods::process(move |ctx| {
            let mut value = String::new();
            for piece in &pieces {
                match piece {
                    Piece::Literal(text) => value.push_str(text),
                    Piece::Value(eval) => {
                        if let Some(text) = ctx.evaluate(eval).render() {
                            value.push_str(&text);
                        }
                    }
                }
            }
            ctx.set_attribute(&name, &value);
            Ok(())
        })))
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Compiler {
    registry: Arc<Registry>,
    options: CompileOptions,
    sequence: Sequence,
    /// Dynamics of the template currently being compiled.
    dynamics: Vec<Dynamic>,
    /// Compiled components by host tag.
    components: IndexMap<String, ComponentOutput>,
    assets: Vec<Asset>,
}

impl Compiler {
    pub fn new(registry: Arc<Registry>, options: CompileOptions) -> Self {
        let salt = options.salt.clone().unwrap_or_else(|| options.file.clone());
        Self {
            registry,
            sequence: Sequence::new(salt),
            options,
            dynamics: Vec::new(),
            components: IndexMap::new(),
            assets: Vec::new(),
        }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn sequence_mut(&mut self) -> &mut Sequence {
        &mut self.sequence
    }

    pub fn component(&self, tag: &str) -> Option<&ComponentOutput> {
        self.components.get(tag)
    }

    pub fn register_component(&mut self, output: ComponentOutput, assets: Vec<Asset>) {
        tracing::debug!(name = %output.name, tag = %output.tag, "registered component");
        self.components.insert(output.tag.clone(), output);
        self.assets.extend(assets);
    }

    /// Stores a dynamic for the current template and returns its token.
    pub fn push_dynamic(&mut self, dynamic: Dynamic) -> String {
        self.dynamics.push(dynamic);
        dynamic_token(self.dynamics.len() - 1)
    }

    pub fn compile(&mut self, source: &str) -> Result<CompileOutput, CompilerError> {
        let mut timing = ServerTiming::new();
        let file = self.options.file.clone();

        let mut doc = timing.measure("parse", "Parse template", || parse_template(source, &file))?;
        let root = doc.root();
        let compiled = timing.measure("compile", "Compile template", || {
            self.compile_document(&mut doc, root, None)
        })?;
        let pending = mem::take(&mut self.assets);
        let assets = timing.measure("assets", "Resolve assets", || resolve_assets(pending))?;

        tracing::debug!(
            file = %file,
            statics = compiled.statics().len(),
            dynamics = compiled.dynamics().len(),
            assets = assets.len(),
            "compiled template"
        );
        Ok(CompileOutput {
            compiled,
            assets,
            components: mem::take(&mut self.components).into_values().collect(),
            timing: if self.options.timing {
                timing
            } else {
                ServerTiming::new()
            },
        })
    }

    /// Compiles the subtree under `root` into its own template. Directives at
    /// or above `max_priority` are skipped on `root`'s direct children.
    pub fn compile_document(
        &mut self,
        doc: &mut Document,
        root: NodeId,
        max_priority: Option<u32>,
    ) -> Result<Compiled, CompilerError> {
        let outer = mem::take(&mut self.dynamics);
        let walked = if matches!(doc.kind(root), NodeKind::Document) {
            doc.children(root)
                .into_iter()
                .try_for_each(|child| self.compile_node(doc, child, max_priority))
        } else {
            self.compile_node(doc, root, max_priority)
        };
        let dynamics = mem::replace(&mut self.dynamics, outer);
        walked?;
        Ok(finish(&doc.render(root), dynamics))
    }

    fn compile_node(
        &mut self,
        doc: &mut Document,
        id: NodeId,
        max_priority: Option<u32>,
    ) -> Result<(), CompilerError> {
        let (element, text, document) = match doc.kind(id) {
            NodeKind::Element(_) => (true, false, false),
            NodeKind::Text(_) => (false, true, false),
            NodeKind::Document => (false, false, true),
            _ => (false, false, false),
        };
        if element {
            self.compile_element(doc, id, max_priority)
        } else if text {
            self.compile_text(doc, id)
        } else if document {
            self.compile_children(doc, id)
        } else {
            Ok(())
        }
    }

    pub fn compile_children(&mut self, doc: &mut Document, id: NodeId) -> Result<(), CompilerError> {
        for child in doc.children(id) {
            self.compile_node(doc, child, None)?;
        }
        Ok(())
    }

    fn compile_text(&mut self, doc: &mut Document, id: NodeId) -> Result<(), CompilerError> {
        let Some(text) = doc.text(id) else {
            return Ok(());
        };
        let raw_parent = doc
            .parent(id)
            .and_then(|p| doc.tag(p))
            .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(tag));
        if raw_parent || !has_markers(text) {
            return Ok(());
        }

        let scanned = scan(text, &mut self.sequence);
        let mut html = String::new();
        for part in scanned.parts() {
            match part {
                Part::Literal(literal) => html.push_str(&escape_text(literal)),
                Part::Expression(found) => {
                    let eval = compile_expression(&found.expression)
                        .map_err(|err| locate(err, doc, id))?;
                    let interpolated = Interpolated {
                        source: found.expression.trim().to_string(),
                        eval,
                    };
                    let token = self.push_dynamic(if found.is_safe {
                        Dynamic::Expression(interpolated)
                    } else {
                        Dynamic::ExpressionUnsafe(interpolated)
                    });
                    html.push_str(&token);
                }
            }
        }
        doc.replace_with_raw(id, &html);
        Ok(())
    }

    fn candidates(
        &self,
        doc: &Document,
        id: NodeId,
        max_priority: Option<u32>,
    ) -> Vec<(Directive, Option<Attribute>)> {
        let Some(element) = doc.element(id) else {
            return Vec::new();
        };
        let mut found: Vec<(Directive, Option<Attribute>)> = self
            .registry
            .lookup_element(&element.tag)
            .into_iter()
            .map(|d| (d, None))
            .collect();
        for attr in &element.attributes {
            for directive in self.registry.lookup_attribute(&attr.name) {
                found.push((directive, Some(attr.clone())));
            }
            if has_markers(&attr.value) {
                found.push((interpolate_directive(), Some(attr.clone())));
            }
        }

        if let Some(max) = max_priority {
            found.retain(|(d, _)| d.priority < max);
        }
        found.sort_by_key(|(d, _)| d.sort_key());
        if let Some(cut) = found.iter().filter(|(d, _)| d.terminal).map(|(d, _)| d.priority).max() {
            found.retain(|(d, _)| d.priority >= cut);
        }
        found
    }

    fn compile_element(
        &mut self,
        doc: &mut Document,
        id: NodeId,
        max_priority: Option<u32>,
    ) -> Result<(), CompilerError> {
        let candidates = self.candidates(doc, id, max_priority);
        if candidates.is_empty() {
            return self.compile_children(doc, id);
        }
        tracing::debug!(
            tag = doc.tag(id).unwrap_or_default(),
            directives = ?candidates.iter().map(|(d, _)| d.name.as_str()).collect::<Vec<_>>(),
            "applying directives"
        );

        let mut methods = Vec::new();
        let mut slots: IndexMap<String, Arc<Compiled>> = IndexMap::new();
        let mut anchor = id;
        let mut transcluded = false;
        let mut terminal = false;

        for (directive, attr) in &candidates {
            let returned = match &directive.compile {
                Some(compile) => {
                    compile(self, doc, id, attr.as_ref()).map_err(|err| locate(err, doc, id))?
                }
                None => None,
            };
            let applied = returned.unwrap_or_else(|| Methods {
                process: directive.process.clone(),
                leave: directive.leave.clone(),
            });
            if !applied.is_empty() {
                methods.push(applied);
            }

            match &directive.transclude {
                Transclude::None => {}
                Transclude::Children => {
                    let mut sub = doc.extract_children(id);
                    let root = sub.root();
                    let compiled = self.compile_document(&mut sub, root, None)?;
                    slots.insert(DEFAULT_SLOT.to_string(), Arc::new(compiled));
                    transcluded = true;
                }
                Transclude::Element => {
                    if anchor == id && doc.parent(id).is_some() {
                        let marker = doc.create(NodeKind::Raw(String::new()), doc.position(id));
                        doc.insert_before(id, marker);
                        anchor = marker;
                    }
                    let mut sub = doc.extract(id);
                    let root = sub.root();
                    let compiled = self.compile_document(&mut sub, root, Some(directive.priority))?;
                    slots.insert(DEFAULT_SLOT.to_string(), Arc::new(compiled));
                    transcluded = true;
                }
                Transclude::Slots(selectors) => {
                    for (selector, slot) in selectors {
                        let mut sub = doc
                            .extract_children_where(id, |d, child| d.tag(child) == Some(selector.as_str()));
                        let root = sub.root();
                        let compiled = self.compile_document(&mut sub, root, None)?;
                        slots.insert(slot.clone(), Arc::new(compiled));
                    }
                    let mut rest = doc.extract_children(id);
                    let root = rest.root();
                    let compiled = self.compile_document(&mut rest, root, None)?;
                    slots.entry(DEFAULT_SLOT.to_string()).or_insert(Arc::new(compiled));
                    transcluded = true;
                }
            }
            terminal |= directive.terminal;
        }

        let attributes = doc
            .element(id)
            .map(|el| el.attributes.clone())
            .unwrap_or_default();

        if transcluded {
            let token = self.push_dynamic(Dynamic::Directives(DirectiveBundle {
                mode: BundleMode::Replace,
                attributes,
                methods,
                slots,
            }));
            doc.replace_with_raw(anchor, &token);
            return Ok(());
        }

        if !methods.is_empty() {
            let token = self.push_dynamic(Dynamic::Directives(DirectiveBundle {
                mode: BundleMode::Attributes,
                attributes,
                methods,
                slots,
            }));
            if let Some(el) = doc.element_mut(id) {
                el.attributes = vec![Attribute::new(&token, "")];
            }
        }

        if terminal {
            Ok(())
        } else {
            self.compile_children(doc, id)
        }
    }
}

pub(crate) fn locate(err: CompilerError, doc: &Document, id: NodeId) -> CompilerError {
    if err.file.is_empty() {
        let position = doc.position(id);
        err.at(&doc.file, position.line, position.column)
    } else {
        err
    }
}

/// Splits serialized HTML on dynamic tokens.
fn finish(html: &str, dynamics: Vec<Dynamic>) -> Compiled {
    let mut pending: Vec<Option<Dynamic>> = dynamics.into_iter().map(Some).collect();
    let mut statics = Vec::new();
    let mut ordered = Vec::new();
    let mut last = 0;

    for captures in DYNAMIC_TOKEN.captures_iter(html) {
        let (Some(whole), Some(index)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let Some(dynamic) = index
            .as_str()
            .parse::<usize>()
            .ok()
            .and_then(|i| pending.get_mut(i))
            .and_then(Option::take)
        else {
            continue;
        };
        statics.push(html[last..whole.start()].to_string());
        ordered.push(dynamic);
        last = whole.end();
    }
    statics.push(html[last..].to_string());
    Compiled::new(statics, ordered)
}
