//! Assignment rewriter.
//!
//! Every write to a context variable is wrapped in an invalidation call
//! `_$i(varIdx, x, <write>)` so the runtime can notify the watchers of `x`.
//! The rewrite is a span patch over the original source: the AST is only
//! read, and edits are spliced back in source order, which keeps the output
//! byte-identical outside the rewritten spans.

use indexmap::IndexSet;
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast_visit::Visit;
use oxc_span::GetSpan;
use std::cmp::Reverse;

use crate::error::CompilerError;
use crate::indexed::IndexedSet;
use crate::scope::{lexical_declarations, parse_program, Binding, ScopeHooks, ScopedWalker};

/// Local binding name holding an anonymous default export.
pub const DEFAULT_EXPORT: &str = "_$default";

// ═══════════════════════════════════════════════════════════════════════════════
// EDITS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EditKind {
    /// Closes a wrapper; inner wrappers (later start) close first.
    Suffix,
    Replace,
    /// Opens a wrapper; outer wrappers (later end) open first.
    Prefix,
}

#[derive(Debug, Clone)]
struct Edit {
    start: u32,
    end: u32,
    kind: EditKind,
    /// Span end for prefixes, span start for suffixes.
    extent: u32,
    text: String,
}

#[derive(Debug, Default)]
struct Edits {
    edits: Vec<Edit>,
}

impl Edits {
    fn wrap(&mut self, start: u32, end: u32, open: String, close: &str) {
        self.edits.push(Edit {
            start,
            end: start,
            kind: EditKind::Prefix,
            extent: end,
            text: open,
        });
        self.edits.push(Edit {
            start: end,
            end,
            kind: EditKind::Suffix,
            extent: start,
            text: close.to_string(),
        });
    }

    fn replace(&mut self, start: u32, end: u32, text: &str) {
        self.edits.push(Edit {
            start,
            end,
            kind: EditKind::Replace,
            extent: end,
            text: text.to_string(),
        });
    }

    fn apply(mut self, source: &str) -> String {
        self.edits
            .sort_by_key(|e| (e.start, e.kind, Reverse(e.extent)));

        let mut out = String::with_capacity(source.len() + self.edits.len() * 16);
        let mut cursor = 0usize;
        for edit in self.edits {
            let start = edit.start as usize;
            if start > cursor {
                out.push_str(&source[cursor..start]);
                cursor = start;
            }
            out.push_str(&edit.text);
            cursor = cursor.max(edit.end as usize);
        }
        if cursor < source.len() {
            out.push_str(&source[cursor..]);
        }
        out
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INVALIDATION WRAPPERS
// ═══════════════════════════════════════════════════════════════════════════════

struct Invalidations<'v> {
    variables: &'v mut IndexedSet<String>,
    edits: Edits,
}

impl<'a> ScopeHooks<'a> for Invalidations<'_> {
    fn assignment(&mut self, expr: &AssignmentExpression<'a>, target: &str, binding: Binding) {
        if binding != Binding::Context {
            return;
        }
        let index = self.variables.insert(target.to_string());
        self.edits.wrap(
            expr.span.start,
            expr.span.end,
            format!("_$i({}, {}, ", index, target),
            ")",
        );
    }

    fn update(&mut self, expr: &UpdateExpression<'a>, target: &str, binding: Binding) {
        if binding != Binding::Context {
            return;
        }
        let index = self.variables.insert(target.to_string());
        if expr.prefix {
            self.edits.wrap(
                expr.span.start,
                expr.span.end,
                format!("_$i({}, {}, ", index, target),
                ")",
            );
        } else {
            self.edits.wrap(
                expr.span.start,
                expr.span.end,
                format!("_$i({}, {}, (", index, target),
                &format!(", {}))", target),
            );
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MODULE REWRITE
// ═══════════════════════════════════════════════════════════════════════════════

/// A component script after rewriting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewrittenScript {
    /// Script body with imports removed and export syntax stripped.
    pub body: String,
    /// Import and re-export statements, hoisted by the payload emitter.
    pub imports: Vec<String>,
    /// `(exported, local)` pairs in declaration order.
    pub exports: Vec<(String, String)>,
}

fn export_name(name: &ModuleExportName<'_>) -> String {
    match name {
        ModuleExportName::IdentifierName(n) => n.name.to_string(),
        ModuleExportName::IdentifierReference(r) => r.name.to_string(),
        ModuleExportName::StringLiteral(s) => s.value.to_string(),
    }
}

fn span_text<'s>(source: &'s str, span: oxc_span::Span) -> &'s str {
    source
        .get(span.start as usize..span.end as usize)
        .unwrap_or_default()
}

/// Rewrite a component script whose top-level declarations are part of `context`.
pub fn rewrite_script(
    source: &str,
    context: &IndexSet<String>,
    variables: &mut IndexedSet<String>,
) -> Result<RewrittenScript, CompilerError> {
    let allocator = Allocator::default();
    let program = parse_program(&allocator, source)?;

    let mut imports = Vec::new();
    let mut exports = Vec::new();
    let mut edits = Edits::default();

    for statement in &program.body {
        match statement {
            Statement::ImportDeclaration(decl) => {
                imports.push(span_text(source, decl.span).to_string());
                edits.replace(decl.span.start, decl.span.end, "");
            }
            Statement::ExportAllDeclaration(decl) => {
                imports.push(span_text(source, decl.span).to_string());
                edits.replace(decl.span.start, decl.span.end, "");
            }
            Statement::ExportNamedDeclaration(decl) => {
                if decl.source.is_some() {
                    imports.push(span_text(source, decl.span).to_string());
                    edits.replace(decl.span.start, decl.span.end, "");
                } else if let Some(declaration) = &decl.declaration {
                    for name in lexical_declarations(std::slice::from_ref(statement)) {
                        exports.push((name.clone(), name));
                    }
                    edits.replace(decl.span.start, declaration.span().start, "");
                } else {
                    for specifier in &decl.specifiers {
                        exports.push((export_name(&specifier.exported), export_name(&specifier.local)));
                    }
                    edits.replace(decl.span.start, decl.span.end, "");
                }
            }
            Statement::ExportDefaultDeclaration(decl) => {
                let start = decl.declaration.span().start;
                let named = match &decl.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                        func.id.as_ref().map(|id| id.name.to_string())
                    }
                    ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                        class.id.as_ref().map(|id| id.name.to_string())
                    }
                    _ => None,
                };
                match named {
                    Some(name) => {
                        edits.replace(decl.span.start, start, "");
                        exports.push(("default".to_string(), name));
                    }
                    None => {
                        edits.replace(decl.span.start, start, &format!("const {} = ", DEFAULT_EXPORT));
                        exports.push(("default".to_string(), DEFAULT_EXPORT.to_string()));
                    }
                }
            }
            _ => {}
        }
    }

    let mut hooks = Invalidations { variables, edits };
    ScopedWalker::new(&mut hooks, context).visit_program(&program);

    let body = hooks.edits.apply(source);
    tracing::debug!(
        imports = imports.len(),
        exports = exports.len(),
        variables = hooks.variables.len(),
        "rewrote component script"
    );
    Ok(RewrittenScript {
        body: body.trim().to_string(),
        imports,
        exports,
    })
}

/// Rewrite a snippet that runs inside the context, such as an event handler.
/// Names the snippet declares itself are not treated as context variables.
pub fn rewrite_snippet(
    source: &str,
    context: &IndexSet<String>,
    variables: &mut IndexedSet<String>,
) -> Result<String, CompilerError> {
    let allocator = Allocator::default();
    let program = parse_program(&allocator, source)?;
    let mut hooks = Invalidations {
        variables,
        edits: Edits::default(),
    };
    ScopedWalker::new(&mut hooks, context)
        .isolated()
        .visit_program(&program);
    Ok(hooks.edits.apply(source))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(names: &[&str]) -> IndexSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn rewrite(source: &str, names: &[&str]) -> (String, IndexedSet<String>) {
        let mut variables = IndexedSet::new();
        let out = rewrite_script(source, &context(names), &mut variables).unwrap();
        (out.body, variables)
    }

    #[test]
    fn test_post_increment_inside_arrow() {
        let (body, variables) = rewrite("let v=1; const f=()=>{ v++; }", &["v", "f"]);
        assert!(body.contains("_$i(0, v, (v++, v))"), "{}", body);
        assert_eq!(variables.index_of("v"), Some(0));
    }

    #[test]
    fn test_prefix_and_compound_assignments() {
        let (body, _) = rewrite("let a = 0; let b = 0; ++a; b += 3; a ??= 1;", &["a", "b"]);
        assert!(body.contains("_$i(0, a, ++a);"), "{}", body);
        assert!(body.contains("_$i(1, b, b += 3);"), "{}", body);
        assert!(body.contains("_$i(0, a, a ??= 1);"), "{}", body);
    }

    #[test]
    fn test_nested_assignments_close_inner_first() {
        let (body, _) = rewrite("let a, b; a = b = 2;", &["a", "b"]);
        assert!(body.contains("_$i(0, a, a = _$i(1, b, b = 2));"), "{}", body);
    }

    #[test]
    fn test_shadowed_names_are_untouched() {
        let (body, variables) = rewrite(
            "let n = 0; function f(n) { n = 2; } for (let n = 0; n < 2; n++) {}",
            &["n", "f"],
        );
        assert!(!body.contains("_$i"), "{}", body);
        assert!(variables.is_empty());
    }

    #[test]
    fn test_switch_case_locals_shadow_context() {
        let (body, variables) = rewrite(
            "let v = 0; function f() { switch (1) { case 1: let v = 2; v++; } }",
            &["v", "f"],
        );
        assert!(!body.contains("_$i"), "{}", body);
        assert!(variables.is_empty());

        let (body, _) = rewrite("let v = 0; switch (v) { case 0: v = 1; }", &["v"]);
        assert!(body.contains("_$i(0, v, v = 1)"), "{}", body);
    }

    #[test]
    fn test_imports_and_exports() {
        let mut variables = IndexedSet::new();
        let out = rewrite_script(
            "import { x } from './x.js';\nexport let count = 0;\nconst t = 1;\nexport { t as total };\nexport default function go() { count++; }",
            &context(&["x", "count", "t", "go"]),
            &mut variables,
        )
        .unwrap();
        assert_eq!(out.imports, vec!["import { x } from './x.js';".to_string()]);
        assert_eq!(
            out.exports,
            vec![
                ("count".to_string(), "count".to_string()),
                ("total".to_string(), "t".to_string()),
                ("default".to_string(), "go".to_string())
            ]
        );
        assert!(!out.body.contains("export"), "{}", out.body);
        assert!(out.body.starts_with("let count = 0;"), "{}", out.body);
        assert!(out.body.contains("function go() { _$i(0, count, (count++, count)); }"));
    }

    #[test]
    fn test_anonymous_default_export() {
        let mut variables = IndexedSet::new();
        let out = rewrite_script("export default { a: 1 };", &context(&[]), &mut variables).unwrap();
        assert_eq!(out.body, "const _$default = { a: 1 };");
        assert_eq!(out.exports[0].1, DEFAULT_EXPORT);
    }

    #[test]
    fn test_snippet_locals_are_not_context() {
        let mut variables = IndexedSet::new();
        let out = rewrite_snippet(
            "(e) => { let count = 1; count++; total += e.detail; }",
            &context(&["count", "total"]),
            &mut variables,
        )
        .unwrap();
        assert_eq!(out, "(e) => { let count = 1; count++; _$i(0, total, total += e.detail); }");
    }
}
