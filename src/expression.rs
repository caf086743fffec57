//! Context-free summaries of interpolation and handler expressions.
//!
//! A summary records everything later passes need from one expression: the
//! free names it reads, writes and calls, its syntactic shape, and the
//! render-time evaluator when the expression is side-effect free. Summaries
//! are computed once per distinct expression text and shared through
//! `cache::summarize_cached`.

use indexmap::IndexSet;
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast_visit::Visit;
use oxc_span::GetSpan;

use crate::error::CompilerError;
use crate::scope::{parse_expression, Binding, ScopeHooks, ScopedWalker};
use crate::static_eval::Eval;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// `name(args)` where `name` is a plain identifier.
    Call {
        callee: String,
        arguments: Option<String>,
    },
    Identifier(String),
    Arrow,
    Function,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Write {
    pub name: String,
    pub binding: Binding,
}

#[derive(Debug)]
pub struct ExpressionSummary {
    pub source: String,
    /// Names read that no scope inside the expression binds, in first-use order.
    pub free: IndexSet<String>,
    /// Every assignment or update with a plain identifier target.
    pub writes: Vec<Write>,
    /// Free identifiers used as callees.
    pub calls: IndexSet<String>,
    pub shape: Shape,
    pub eval: Result<Eval, String>,
}

impl ExpressionSummary {
    pub fn free_writes(&self) -> impl Iterator<Item = &str> {
        self.writes
            .iter()
            .filter(|w| w.binding != Binding::Local)
            .map(|w| w.name.as_str())
    }

    pub fn is_literal(&self) -> bool {
        self.eval.as_ref().is_ok_and(Eval::is_literal)
    }
}

#[derive(Default)]
struct Collector {
    free: IndexSet<String>,
    writes: Vec<Write>,
    calls: IndexSet<String>,
}

impl<'a> ScopeHooks<'a> for Collector {
    fn reference(&mut self, ident: &IdentifierReference<'a>, binding: Binding) {
        if binding != Binding::Local {
            self.free.insert(ident.name.to_string());
        }
    }

    fn assignment(&mut self, _expr: &AssignmentExpression<'a>, target: &str, binding: Binding) {
        self.writes.push(Write {
            name: target.to_string(),
            binding,
        });
    }

    fn update(&mut self, _expr: &UpdateExpression<'a>, target: &str, binding: Binding) {
        self.writes.push(Write {
            name: target.to_string(),
            binding,
        });
    }

    fn call(&mut self, _expr: &CallExpression<'a>, callee: &str, binding: Binding) {
        if binding != Binding::Local {
            self.calls.insert(callee.to_string());
        }
    }
}

/// Syntactic shape used to pick an event handler wrapper.
pub fn classify(expr: &Expression<'_>, source: &str) -> Shape {
    match expr.without_parentheses() {
        Expression::Identifier(ident) => Shape::Identifier(ident.name.to_string()),
        Expression::CallExpression(call) => match &call.callee {
            Expression::Identifier(ident) => {
                let arguments = match (call.arguments.first(), call.arguments.last()) {
                    (Some(first), Some(last)) => source
                        .get(first.span().start as usize..last.span().end as usize)
                        .map(str::to_string),
                    _ => None,
                };
                Shape::Call {
                    callee: ident.name.to_string(),
                    arguments,
                }
            }
            _ => Shape::Other,
        },
        Expression::ArrowFunctionExpression(_) => Shape::Arrow,
        Expression::FunctionExpression(_) => Shape::Function,
        _ => Shape::Other,
    }
}

/// Parse and summarize one expression. `source` should already be trimmed.
pub fn summarize(source: &str) -> Result<ExpressionSummary, CompilerError> {
    let allocator = Allocator::default();
    let expr = parse_expression(&allocator, source)?;

    let empty = IndexSet::new();
    let mut collector = Collector::default();
    ScopedWalker::new(&mut collector, &empty).visit_expression(&expr);

    let summary = ExpressionSummary {
        source: source.to_string(),
        free: collector.free,
        writes: collector.writes,
        calls: collector.calls,
        shape: classify(&expr, source),
        eval: Eval::from_expression(&expr),
    };
    tracing::trace!(
        expression = source,
        free = summary.free.len(),
        writes = summary.writes.len(),
        "summarized expression"
    );
    Ok(summary)
}
