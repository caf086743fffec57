//! Reactivity analysis over the component context scope.
//!
//! The context scope is the top level of a component script plus the names
//! the compiler injects (references and parameters). Interpolations are
//! resolved against it to find the variables each watcher depends on, and
//! checked for writes to context variables.

use indexmap::IndexSet;
use oxc_ast::ast::*;
use oxc_ast_visit::Visit;
use oxc_syntax::scope::ScopeFlags;
use std::collections::HashMap;

use crate::error::{CompilerError, JS_INTERPOLATION_SIDE_EFFECT};
use crate::expression::ExpressionSummary;
use crate::scope::{scope_declarations, Binding, ScopeHooks, ScopedWalker};

/// Context writes and context calls made by one top-level function.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FunctionEffects {
    pub writes: Vec<String>,
    pub calls: Vec<String>,
}

impl<'a> ScopeHooks<'a> for FunctionEffects {
    fn assignment(&mut self, _expr: &AssignmentExpression<'a>, target: &str, binding: Binding) {
        if binding == Binding::Context {
            self.writes.push(target.to_string());
        }
    }

    fn update(&mut self, _expr: &UpdateExpression<'a>, target: &str, binding: Binding) {
        if binding == Binding::Context {
            self.writes.push(target.to_string());
        }
    }

    fn call(&mut self, _expr: &CallExpression<'a>, callee: &str, binding: Binding) {
        if binding == Binding::Context {
            self.calls.push(callee.to_string());
        }
    }
}

/// How an expression's free names split against the context.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub context: Vec<String>,
    pub undeclared: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ContextScope {
    declared: IndexSet<String>,
    undeclared: IndexSet<String>,
    effects: HashMap<String, FunctionEffects>,
}

impl ContextScope {
    pub fn new(injected: impl IntoIterator<Item = String>) -> Self {
        Self {
            declared: injected.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Adds the script's top-level declarations and records the effects of
    /// its top-level functions.
    pub fn declare_program(&mut self, program: &Program<'_>) {
        self.declared.extend(scope_declarations(&program.body));

        for statement in &program.body {
            match statement {
                Statement::FunctionDeclaration(func) => self.record_function(func),
                Statement::VariableDeclaration(decl) => self.record_initializers(decl),
                Statement::ExportNamedDeclaration(export) => match &export.declaration {
                    Some(Declaration::FunctionDeclaration(func)) => self.record_function(func),
                    Some(Declaration::VariableDeclaration(decl)) => self.record_initializers(decl),
                    _ => {}
                },
                _ => {}
            }
        }
    }

    fn record_function(&mut self, func: &Function<'_>) {
        let Some(id) = &func.id else {
            return;
        };
        let mut effects = FunctionEffects::default();
        ScopedWalker::new(&mut effects, &self.declared).visit_function(func, ScopeFlags::empty());
        self.effects.insert(id.name.to_string(), effects);
    }

    fn record_initializers(&mut self, decl: &VariableDeclaration<'_>) {
        for declarator in &decl.declarations {
            let BindingPattern::BindingIdentifier(id) = &declarator.id else {
                continue;
            };
            let mut effects = FunctionEffects::default();
            let mut walker = ScopedWalker::new(&mut effects, &self.declared);
            match &declarator.init {
                Some(Expression::ArrowFunctionExpression(arrow)) => {
                    walker.visit_arrow_function_expression(arrow)
                }
                Some(Expression::FunctionExpression(func)) => {
                    walker.visit_function(func, ScopeFlags::empty())
                }
                _ => continue,
            }
            self.effects.insert(id.name.to_string(), effects);
        }
    }

    pub fn declared(&self) -> &IndexSet<String> {
        &self.declared
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.declared.contains(name)
    }

    pub fn effects(&self, name: &str) -> Option<&FunctionEffects> {
        self.effects.get(name)
    }

    /// Joins the expression's free names into the undeclared set, reads the
    /// split, then snaps the undeclared set back to its previous state.
    pub fn resolve(&mut self, summary: &ExpressionSummary) -> Resolution {
        let mark = self.undeclared.len();
        let mut resolution = Resolution::default();
        for name in &summary.free {
            if self.declared.contains(name) {
                resolution.context.push(name.clone());
            } else if self.undeclared.insert(name.clone()) {
                resolution.undeclared.push(name.clone());
            }
        }
        self.undeclared.truncate(mark);
        resolution
    }

    /// Rejects writes to context variables, directly or through a context
    /// function called by the expression (one further hop).
    pub fn check_side_effects(&self, summary: &ExpressionSummary) -> Result<(), CompilerError> {
        if let Some(name) = summary.free_writes().find(|name| self.declared.contains(*name)) {
            return Err(side_effect(&summary.source, name));
        }

        for callee in &summary.calls {
            let Some(effects) = self.effects.get(callee) else {
                continue;
            };
            if let Some(name) = effects.writes.first() {
                return Err(side_effect(&summary.source, name).detail("function", callee));
            }
            for inner in &effects.calls {
                if let Some(name) = self.effects.get(inner).and_then(|e| e.writes.first()) {
                    return Err(side_effect(&summary.source, name).detail("function", inner));
                }
            }
        }
        Ok(())
    }
}

/// Without a context every assignment or update is a side effect.
pub fn check_side_effects_free(summary: &ExpressionSummary) -> Result<(), CompilerError> {
    match summary.writes.first() {
        Some(write) => Err(side_effect(&summary.source, &write.name)),
        None => Ok(()),
    }
}

fn side_effect(expression: &str, variable: &str) -> CompilerError {
    CompilerError::new(
        JS_INTERPOLATION_SIDE_EFFECT,
        "Interpolation must not modify component state",
    )
    .detail("expression", expression)
    .detail("variable", variable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::summarize;
    use crate::scope::parse_program;
    use oxc_allocator::Allocator;

    fn context(script: &str) -> ContextScope {
        let allocator = Allocator::default();
        let program = parse_program(&allocator, script).unwrap();
        let mut scope = ContextScope::new(vec!["btn".to_string()]);
        scope.declare_program(&program);
        scope
    }

    #[test]
    fn test_declared_includes_injected_names() {
        let scope = context("let a = 1; function f() {}");
        assert!(scope.is_declared("btn"));
        assert!(scope.is_declared("a"));
        assert!(scope.is_declared("f"));
        assert!(!scope.is_declared("window"));
    }

    #[test]
    fn test_function_effects() {
        let scope = context(
            "let n = 0; function inc() { n++; } const reset = () => { let n = 5; n = 0; }; const both = function () { inc(); };",
        );
        assert_eq!(scope.effects("inc").unwrap().writes, vec!["n".to_string()]);
        assert!(scope.effects("reset").unwrap().writes.is_empty());
        assert_eq!(scope.effects("both").unwrap().calls, vec!["inc".to_string()]);
    }

    #[test]
    fn test_resolution_restores_undeclared() {
        let mut scope = context("let a = 1;");
        let summary = summarize("a + b + a").unwrap();
        let first = scope.resolve(&summary);
        assert_eq!(first.context, vec!["a".to_string()]);
        assert_eq!(first.undeclared, vec!["b".to_string()]);
        let second = scope.resolve(&summary);
        assert_eq!(second, first);
    }

    #[test]
    fn test_calls_into_mutating_functions() {
        let scope = context(
            "let n = 0; function inc() { n++; } function outer() { inc(); } function pure() { return n; }",
        );
        assert!(scope.check_side_effects(&summarize("pure()").unwrap()).is_ok());
        let err = scope.check_side_effects(&summarize("inc()").unwrap()).unwrap_err();
        assert_eq!(err.code, JS_INTERPOLATION_SIDE_EFFECT);
        assert_eq!(err.get("function"), Some("inc"));
        assert!(scope.check_side_effects(&summarize("outer()").unwrap()).is_err());
    }

    #[test]
    fn test_local_writes_are_allowed_with_context() {
        let scope = context("let items = [];");
        let summary = summarize("items.map(i => { let t = i; t++; return t; })").unwrap();
        assert!(scope.check_side_effects(&summary).is_ok());
        assert!(check_side_effects_free(&summary).is_err());
    }
}
