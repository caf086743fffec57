//! Static expression evaluator for server-rendered interpolations.
//!
//! Expressions are lowered once from the oxc AST into an owned `Eval` tree
//! and evaluated at render time against a JSON scope. Only side-effect-free
//! constructs are accepted; no user code is ever executed.

use indexmap::IndexMap;
use oxc_ast::ast::{ArrayExpressionElement, Expression};
use oxc_syntax::operator::{BinaryOperator, LogicalOperator, UnaryOperator};

// ═══════════════════════════════════════════════════════════════════════════════
// VALUES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Value::Array(_) | Value::Object(_) => self.to_js_string().parse().unwrap_or(f64::NAN),
        }
    }

    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.to_js_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
        }
    }

    /// Text inserted into the page; `null` and `undefined` render nothing.
    pub fn render(&self) -> Option<String> {
        match self {
            Value::Undefined | Value::Null => None,
            other => Some(other.to_js_string()),
        }
    }

    fn is_primitive_string(&self) -> bool {
        matches!(self, Value::String(_) | Value::Array(_) | Value::Object(_))
    }

    fn property(&self, key: &Value) -> Value {
        let name = key.to_js_string();
        match self {
            Value::Array(items) => {
                if name == "length" {
                    return Value::Number(items.len() as f64);
                }
                name.parse::<usize>()
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or(Value::Undefined)
            }
            Value::Object(map) => map.get(&name).cloned().unwrap_or(Value::Undefined),
            Value::String(s) => {
                if name == "length" {
                    return Value::Number(s.chars().count() as f64);
                }
                name.parse::<usize>()
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or(Value::Undefined)
            }
            _ => Value::Undefined,
        }
    }
}

pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(_), _) | (_, Value::Bool(_)) | (Value::Number(_), _) | (_, Value::Number(_)) => {
            left.to_number() == right.to_number()
        }
        _ => left == right,
    }
}

fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a == b,
        _ => std::mem::discriminant(left) == std::mem::discriminant(right) && left == right,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVALUATION TREE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Eval {
    Literal(Value),
    Identifier(String),
    Member {
        object: Box<Eval>,
        property: Box<Eval>,
    },
    Unary(UnaryOperator, Box<Eval>),
    Binary(BinaryOperator, Box<Eval>, Box<Eval>),
    Logical(LogicalOperator, Box<Eval>, Box<Eval>),
    Conditional(Box<Eval>, Box<Eval>, Box<Eval>),
    Template(Vec<String>, Vec<Eval>),
    Array(Vec<Eval>),
    Sequence(Vec<Eval>),
}

impl Eval {
    /// Lower an expression; the error names the first unsupported construct.
    pub fn from_expression(expr: &Expression<'_>) -> Result<Eval, String> {
        Ok(match expr {
            Expression::BooleanLiteral(b) => Eval::Literal(Value::Bool(b.value)),
            Expression::NullLiteral(_) => Eval::Literal(Value::Null),
            Expression::NumericLiteral(n) => Eval::Literal(Value::Number(n.value)),
            Expression::StringLiteral(s) => Eval::Literal(Value::String(s.value.to_string())),
            Expression::TemplateLiteral(t) => {
                let quasis = t
                    .quasis
                    .iter()
                    .map(|q| {
                        q.value
                            .cooked
                            .as_ref()
                            .map(|c| c.to_string())
                            .unwrap_or_else(|| q.value.raw.to_string())
                    })
                    .collect();
                let expressions = t
                    .expressions
                    .iter()
                    .map(Eval::from_expression)
                    .collect::<Result<_, _>>()?;
                Eval::Template(quasis, expressions)
            }
            Expression::Identifier(id) => match id.name.as_str() {
                "undefined" => Eval::Literal(Value::Undefined),
                "NaN" => Eval::Literal(Value::Number(f64::NAN)),
                "Infinity" => Eval::Literal(Value::Number(f64::INFINITY)),
                name => Eval::Identifier(name.to_string()),
            },
            Expression::StaticMemberExpression(m) => Eval::Member {
                object: Box::new(Eval::from_expression(&m.object)?),
                property: Box::new(Eval::Literal(Value::String(m.property.name.to_string()))),
            },
            Expression::ComputedMemberExpression(m) => Eval::Member {
                object: Box::new(Eval::from_expression(&m.object)?),
                property: Box::new(Eval::from_expression(&m.expression)?),
            },
            Expression::UnaryExpression(u) => match u.operator {
                UnaryOperator::LogicalNot
                | UnaryOperator::UnaryNegation
                | UnaryOperator::UnaryPlus
                | UnaryOperator::Typeof
                | UnaryOperator::Void => {
                    Eval::Unary(u.operator, Box::new(Eval::from_expression(&u.argument)?))
                }
                other => return Err(format!("unary operator {}", other.as_str())),
            },
            Expression::BinaryExpression(b) => match b.operator {
                BinaryOperator::Addition
                | BinaryOperator::Subtraction
                | BinaryOperator::Multiplication
                | BinaryOperator::Division
                | BinaryOperator::Remainder
                | BinaryOperator::Exponential
                | BinaryOperator::Equality
                | BinaryOperator::Inequality
                | BinaryOperator::StrictEquality
                | BinaryOperator::StrictInequality
                | BinaryOperator::LessThan
                | BinaryOperator::LessEqualThan
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterEqualThan => Eval::Binary(
                    b.operator,
                    Box::new(Eval::from_expression(&b.left)?),
                    Box::new(Eval::from_expression(&b.right)?),
                ),
                other => return Err(format!("binary operator {}", other.as_str())),
            },
            Expression::LogicalExpression(l) => Eval::Logical(
                l.operator,
                Box::new(Eval::from_expression(&l.left)?),
                Box::new(Eval::from_expression(&l.right)?),
            ),
            Expression::ConditionalExpression(c) => Eval::Conditional(
                Box::new(Eval::from_expression(&c.test)?),
                Box::new(Eval::from_expression(&c.consequent)?),
                Box::new(Eval::from_expression(&c.alternate)?),
            ),
            Expression::ParenthesizedExpression(p) => Eval::from_expression(&p.expression)?,
            Expression::SequenceExpression(s) => Eval::Sequence(
                s.expressions
                    .iter()
                    .map(Eval::from_expression)
                    .collect::<Result<_, _>>()?,
            ),
            Expression::ArrayExpression(a) => {
                let mut items = Vec::new();
                for element in &a.elements {
                    match element {
                        ArrayExpressionElement::Elision(_) => {
                            items.push(Eval::Literal(Value::Undefined))
                        }
                        ArrayExpressionElement::SpreadElement(_) => {
                            return Err("spread element".to_string())
                        }
                        other => match other.as_expression() {
                            Some(expr) => items.push(Eval::from_expression(expr)?),
                            None => return Err("array element".to_string()),
                        },
                    }
                }
                Eval::Array(items)
            }
            Expression::CallExpression(_) => return Err("function call".to_string()),
            Expression::AssignmentExpression(_) | Expression::UpdateExpression(_) => {
                return Err("assignment".to_string())
            }
            Expression::ArrowFunctionExpression(_) | Expression::FunctionExpression(_) => {
                return Err("function literal".to_string())
            }
            _ => return Err("expression form".to_string()),
        })
    }

    pub fn is_literal(&self) -> bool {
        match self {
            Eval::Literal(_) => true,
            Eval::Template(_, expressions) => expressions.is_empty(),
            _ => false,
        }
    }

    pub fn evaluate(&self, scope: &serde_json::Value) -> Value {
        match self {
            Eval::Literal(value) => value.clone(),
            Eval::Identifier(name) => scope
                .get(name)
                .map(Value::from_json)
                .unwrap_or(Value::Undefined),
            Eval::Member { object, property } => {
                let target = object.evaluate(scope);
                target.property(&property.evaluate(scope))
            }
            Eval::Unary(op, argument) => {
                let value = argument.evaluate(scope);
                match op {
                    UnaryOperator::LogicalNot => Value::Bool(!value.truthy()),
                    UnaryOperator::UnaryNegation => Value::Number(-value.to_number()),
                    UnaryOperator::UnaryPlus => Value::Number(value.to_number()),
                    UnaryOperator::Typeof => Value::String(value.type_of().to_string()),
                    _ => Value::Undefined,
                }
            }
            Eval::Binary(op, left, right) => {
                binary(*op, &left.evaluate(scope), &right.evaluate(scope))
            }
            Eval::Logical(op, left, right) => {
                let lhs = left.evaluate(scope);
                match op {
                    LogicalOperator::And if !lhs.truthy() => lhs,
                    LogicalOperator::Or if lhs.truthy() => lhs,
                    LogicalOperator::Coalesce if !matches!(lhs, Value::Undefined | Value::Null) => {
                        lhs
                    }
                    _ => right.evaluate(scope),
                }
            }
            Eval::Conditional(test, consequent, alternate) => {
                if test.evaluate(scope).truthy() {
                    consequent.evaluate(scope)
                } else {
                    alternate.evaluate(scope)
                }
            }
            Eval::Template(quasis, expressions) => {
                let mut out = String::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(expr) = expressions.get(i) {
                        out.push_str(&expr.evaluate(scope).to_js_string());
                    }
                }
                Value::String(out)
            }
            Eval::Array(items) => Value::Array(items.iter().map(|i| i.evaluate(scope)).collect()),
            Eval::Sequence(items) => items
                .iter()
                .map(|i| i.evaluate(scope))
                .last()
                .unwrap_or(Value::Undefined),
        }
    }
}

fn binary(op: BinaryOperator, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOperator::Addition => {
            if left.is_primitive_string() || right.is_primitive_string() {
                Value::String(left.to_js_string() + &right.to_js_string())
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOperator::Subtraction => Value::Number(left.to_number() - right.to_number()),
        BinaryOperator::Multiplication => Value::Number(left.to_number() * right.to_number()),
        BinaryOperator::Division => Value::Number(left.to_number() / right.to_number()),
        BinaryOperator::Remainder => Value::Number(left.to_number() % right.to_number()),
        BinaryOperator::Exponential => Value::Number(left.to_number().powf(right.to_number())),
        BinaryOperator::Equality => Value::Bool(loose_equals(left, right)),
        BinaryOperator::Inequality => Value::Bool(!loose_equals(left, right)),
        BinaryOperator::StrictEquality => Value::Bool(strict_equals(left, right)),
        BinaryOperator::StrictInequality => Value::Bool(!strict_equals(left, right)),
        BinaryOperator::LessThan
        | BinaryOperator::LessEqualThan
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterEqualThan => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => a.partial_cmp(b),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            let Some(ordering) = ordering else {
                return Value::Bool(false);
            };
            Value::Bool(match op {
                BinaryOperator::LessThan => ordering.is_lt(),
                BinaryOperator::LessEqualThan => ordering.is_le(),
                BinaryOperator::GreaterThan => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
        _ => Value::Undefined,
    }
}
