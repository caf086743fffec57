//! JavaScript facade: parsing and scope-aware walking over the oxc AST.
//!
//! A `ScopedWalker` tracks lexical scopes while it visits a program or an
//! expression and reports every identifier read, assignment, update and call
//! together with how the name resolves: bound by an inner scope, declared in
//! the component context, or free.

use indexmap::IndexSet;
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::SourceType;
use oxc_syntax::scope::ScopeFlags;
use std::collections::HashSet;

use crate::error::{CompilerError, JS_PARSE};

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

pub fn source_type() -> SourceType {
    SourceType::default().with_module(true)
}

fn parse_error<E: std::fmt::Display>(errors: &[E], source: &str) -> CompilerError {
    let message = errors
        .first()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "Invalid JavaScript".to_string());
    CompilerError::new(JS_PARSE, message).detail("source", source.trim())
}

pub fn parse_program<'a>(
    allocator: &'a Allocator,
    source: &'a str,
) -> Result<Program<'a>, CompilerError> {
    let ret = Parser::new(allocator, source, source_type()).parse();
    if !ret.errors.is_empty() {
        return Err(parse_error(&ret.errors, source));
    }
    Ok(ret.program)
}

pub fn parse_expression<'a>(
    allocator: &'a Allocator,
    source: &'a str,
) -> Result<Expression<'a>, CompilerError> {
    Parser::new(allocator, source, source_type())
        .parse_expression()
        .map_err(|errors| parse_error(&errors, source))
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECLARATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Binding identifiers of a pattern, skipping default value expressions.
struct PatternNames<'n> {
    names: &'n mut Vec<String>,
}

impl<'a> Visit<'a> for PatternNames<'_> {
    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.names.push(ident.name.to_string());
    }

    fn visit_expression(&mut self, _expr: &Expression<'a>) {}
}

pub fn pattern_names(pattern: &BindingPattern<'_>, names: &mut Vec<String>) {
    PatternNames { names }.visit_binding_pattern(pattern);
}

fn parameter_names(params: &FormalParameters<'_>, names: &mut Vec<String>) {
    PatternNames { names }.visit_formal_parameters(params);
}

/// `var` declarations hoisted to the enclosing function, not crossing into
/// nested functions.
struct VarHoister<'n> {
    names: &'n mut Vec<String>,
}

impl<'a> Visit<'a> for VarHoister<'_> {
    fn visit_variable_declaration(&mut self, decl: &VariableDeclaration<'a>) {
        if decl.kind == VariableDeclarationKind::Var {
            for declarator in &decl.declarations {
                pattern_names(&declarator.id, self.names);
            }
        }
    }

    fn visit_function(&mut self, _func: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _arrow: &ArrowFunctionExpression<'a>) {}

    fn visit_class(&mut self, _class: &Class<'a>) {}
}

fn declaration_names(decl: &Declaration<'_>, names: &mut Vec<String>) {
    match decl {
        Declaration::VariableDeclaration(var) => {
            for declarator in &var.declarations {
                pattern_names(&declarator.id, names);
            }
        }
        Declaration::FunctionDeclaration(func) => {
            if let Some(id) = &func.id {
                names.push(id.name.to_string());
            }
        }
        Declaration::ClassDeclaration(class) => {
            if let Some(id) = &class.id {
                names.push(id.name.to_string());
            }
        }
        _ => {}
    }
}

/// Names declared directly by a statement list (let/const/class/function,
/// imports and exported declarations).
pub fn lexical_declarations(statements: &[Statement<'_>]) -> Vec<String> {
    let mut names = Vec::new();
    for statement in statements {
        match statement {
            Statement::VariableDeclaration(decl) => {
                if decl.kind != VariableDeclarationKind::Var {
                    for declarator in &decl.declarations {
                        pattern_names(&declarator.id, &mut names);
                    }
                }
            }
            Statement::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    names.push(id.name.to_string());
                }
            }
            Statement::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    names.push(id.name.to_string());
                }
            }
            Statement::ImportDeclaration(decl) => {
                if let Some(specifiers) = &decl.specifiers {
                    for specifier in specifiers {
                        let local = match specifier {
                            ImportDeclarationSpecifier::ImportSpecifier(s) => &s.local,
                            ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => &s.local,
                            ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => &s.local,
                        };
                        names.push(local.name.to_string());
                    }
                }
            }
            Statement::ExportNamedDeclaration(decl) => {
                if let Some(declaration) = &decl.declaration {
                    declaration_names(declaration, &mut names);
                }
            }
            Statement::ExportDefaultDeclaration(decl) => match &decl.declaration {
                ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                    if let Some(id) = &func.id {
                        names.push(id.name.to_string());
                    }
                }
                ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                    if let Some(id) = &class.id {
                        names.push(id.name.to_string());
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
    names
}

/// Every name declared in a function or program scope, `var` hoisting included.
pub fn scope_declarations(statements: &[Statement<'_>]) -> Vec<String> {
    let mut names = lexical_declarations(statements);
    let mut hoister = VarHoister { names: &mut names };
    for statement in statements {
        hoister.visit_statement(statement);
    }
    names
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPED WALK
// ═══════════════════════════════════════════════════════════════════════════════

/// How an identifier resolves at the point it is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Bound by a scope opened during the walk (parameter, local, block).
    Local,
    /// Declared in the context scope.
    Context,
    /// Neither; a global or a runtime-provided name.
    Free,
}

/// Callbacks fired by `ScopedWalker`. All default to no-ops.
pub trait ScopeHooks<'a> {
    fn reference(&mut self, _ident: &IdentifierReference<'a>, _binding: Binding) {}

    fn assignment(&mut self, _expr: &AssignmentExpression<'a>, _target: &str, _binding: Binding) {}

    fn update(&mut self, _expr: &UpdateExpression<'a>, _target: &str, _binding: Binding) {}

    fn call(&mut self, _expr: &CallExpression<'a>, _callee: &str, _binding: Binding) {}
}

pub struct ScopedWalker<'h, H> {
    hooks: &'h mut H,
    context: &'h IndexSet<String>,
    scopes: Vec<HashSet<String>>,
    isolate_program: bool,
}

impl<'h, H> ScopedWalker<'h, H> {
    /// Walker whose program-level declarations form the context.
    pub fn new(hooks: &'h mut H, context: &'h IndexSet<String>) -> Self {
        Self {
            hooks,
            context,
            scopes: Vec::new(),
            isolate_program: false,
        }
    }

    /// Treat program-level declarations as local instead of as context.
    /// Used for snippets that run inside the context, such as event handlers.
    pub fn isolated(mut self) -> Self {
        self.isolate_program = true;
        self
    }

    pub fn resolve(&self, name: &str) -> Binding {
        if self.scopes.iter().any(|scope| scope.contains(name)) {
            Binding::Local
        } else if self.context.contains(name) {
            Binding::Context
        } else {
            Binding::Free
        }
    }

    fn push(&mut self, names: Vec<String>) {
        self.scopes.push(names.into_iter().collect());
    }

    fn pop(&mut self) {
        self.scopes.pop();
    }
}

impl<'a, 'h, H: ScopeHooks<'a>> Visit<'a> for ScopedWalker<'h, H> {
    fn visit_program(&mut self, program: &Program<'a>) {
        let isolate = self.isolate_program;
        if isolate {
            self.push(scope_declarations(&program.body));
        }
        for statement in &program.body {
            self.visit_statement(statement);
        }
        if isolate {
            self.pop();
        }
    }

    fn visit_block_statement(&mut self, block: &BlockStatement<'a>) {
        self.push(lexical_declarations(&block.body));
        for statement in &block.body {
            self.visit_statement(statement);
        }
        self.pop();
    }

    /// All cases of a switch share one block scope; the discriminant does not.
    fn visit_switch_statement(&mut self, stmt: &SwitchStatement<'a>) {
        self.visit_expression(&stmt.discriminant);
        let mut names = Vec::new();
        for case in &stmt.cases {
            names.extend(lexical_declarations(&case.consequent));
        }
        self.push(names);
        for case in &stmt.cases {
            if let Some(test) = &case.test {
                self.visit_expression(test);
            }
            for statement in &case.consequent {
                self.visit_statement(statement);
            }
        }
        self.pop();
    }

    fn visit_function(&mut self, func: &Function<'a>, _flags: ScopeFlags) {
        let mut names = vec!["arguments".to_string()];
        if func.r#type == FunctionType::FunctionExpression {
            if let Some(id) = &func.id {
                names.push(id.name.to_string());
            }
        }
        parameter_names(&func.params, &mut names);
        if let Some(body) = &func.body {
            names.extend(scope_declarations(&body.statements));
        }

        self.push(names);
        self.visit_formal_parameters(&func.params);
        if let Some(body) = &func.body {
            for statement in &body.statements {
                self.visit_statement(statement);
            }
        }
        self.pop();
    }

    fn visit_arrow_function_expression(&mut self, arrow: &ArrowFunctionExpression<'a>) {
        let mut names = Vec::new();
        parameter_names(&arrow.params, &mut names);
        names.extend(scope_declarations(&arrow.body.statements));

        self.push(names);
        self.visit_formal_parameters(&arrow.params);
        for statement in &arrow.body.statements {
            self.visit_statement(statement);
        }
        self.pop();
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause<'a>) {
        let mut names = Vec::new();
        if let Some(param) = &clause.param {
            pattern_names(&param.pattern, &mut names);
        }
        self.push(names);
        self.visit_block_statement(&clause.body);
        self.pop();
    }

    fn visit_for_statement(&mut self, stmt: &ForStatement<'a>) {
        let mut names = Vec::new();
        if let Some(ForStatementInit::VariableDeclaration(decl)) = &stmt.init {
            for declarator in &decl.declarations {
                pattern_names(&declarator.id, &mut names);
            }
        }
        self.push(names);
        walk::walk_for_statement(self, stmt);
        self.pop();
    }

    fn visit_for_in_statement(&mut self, stmt: &ForInStatement<'a>) {
        let mut names = Vec::new();
        if let ForStatementLeft::VariableDeclaration(decl) = &stmt.left {
            for declarator in &decl.declarations {
                pattern_names(&declarator.id, &mut names);
            }
        }
        self.push(names);
        walk::walk_for_in_statement(self, stmt);
        self.pop();
    }

    fn visit_for_of_statement(&mut self, stmt: &ForOfStatement<'a>) {
        let mut names = Vec::new();
        if let ForStatementLeft::VariableDeclaration(decl) = &stmt.left {
            for declarator in &decl.declarations {
                pattern_names(&declarator.id, &mut names);
            }
        }
        self.push(names);
        walk::walk_for_of_statement(self, stmt);
        self.pop();
    }

    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        let binding = self.resolve(ident.name.as_str());
        self.hooks.reference(ident, binding);
    }

    fn visit_assignment_expression(&mut self, expr: &AssignmentExpression<'a>) {
        if let AssignmentTarget::AssignmentTargetIdentifier(ident) = &expr.left {
            let binding = self.resolve(ident.name.as_str());
            self.hooks.assignment(expr, ident.name.as_str(), binding);
        }
        walk::walk_assignment_expression(self, expr);
    }

    fn visit_update_expression(&mut self, expr: &UpdateExpression<'a>) {
        if let SimpleAssignmentTarget::AssignmentTargetIdentifier(ident) = &expr.argument {
            let binding = self.resolve(ident.name.as_str());
            self.hooks.update(expr, ident.name.as_str(), binding);
        }
        walk::walk_update_expression(self, expr);
    }

    fn visit_call_expression(&mut self, expr: &CallExpression<'a>) {
        if let Expression::Identifier(ident) = &expr.callee {
            let binding = self.resolve(ident.name.as_str());
            self.hooks.call(expr, ident.name.as_str(), binding);
        }
        walk::walk_call_expression(self, expr);
    }
}
