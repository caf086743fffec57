//! Client payload emission.
//!
//! Turns the tables collected while compiling a component into the
//! `STX.r(...)` module loaded by the browser runtime. Keys of the returned
//! object are single letters and form the wire contract with the runtime.

use indexmap::IndexMap;
use oxc_allocator::Allocator;
use oxc_codegen::Codegen;

use crate::error::CompilerError;
use crate::indexed::IndexedSet;
use crate::scope::parse_program;

/// Lifecycle hook names and their payload keys.
pub const LIFECYCLE_HOOKS: [(&str, &str); 10] = [
    ("OnMount", "a"),
    ("BeforeUpdate", "b"),
    ("AfterUpdate", "c"),
    ("BeforeRender", "d"),
    ("AfterRender", "e"),
    ("OnDestroy", "f"),
    ("OnConnect", "g"),
    ("OnDisconnect", "h"),
    ("OnEvent", "i"),
    ("OnError", "j"),
];

// ═══════════════════════════════════════════════════════════════════════════════
// INPUT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplatePart {
    Static(String),
    Expression(usize),
}

/// One expression bound to one element or attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Watcher {
    Text {
        element: usize,
        expression: usize,
    },
    Property {
        element: usize,
        attribute: usize,
        expression: usize,
    },
    Template {
        element: usize,
        attribute: usize,
        parts: Vec<TemplatePart>,
    },
}

impl Watcher {
    pub fn render(&self) -> String {
        match self {
            Watcher::Text { element, expression } => format!("_$bind({}, {})", element, expression),
            Watcher::Property {
                element,
                attribute,
                expression,
            } => format!("_$bind_prop({}, {}, {})", element, attribute, expression),
            Watcher::Template {
                element,
                attribute,
                parts,
            } => {
                let parts: Vec<String> = parts
                    .iter()
                    .map(|part| match part {
                        TemplatePart::Static(text) => js_quote(text),
                        TemplatePart::Expression(index) => index.to_string(),
                    })
                    .collect();
                format!(
                    "_$bind_prop_tpl({}, {}, [{}])",
                    element,
                    attribute,
                    parts.join(", ")
                )
            }
        }
    }
}

/// Everything a component contributes to its payload.
#[derive(Debug, Default)]
pub struct PayloadInput {
    pub tag: String,
    pub file: String,
    pub line: u32,
    pub element_ids: IndexedSet<String>,
    pub attributes_bound: IndexedSet<String>,
    /// Already wrapped as `() => <expr>`.
    pub expressions: IndexedSet<String>,
    pub watchers: IndexedSet<Watcher>,
    pub event_names: IndexedSet<String>,
    pub event_handlers: IndexedSet<String>,
    /// `[event name, element, handler]` indices.
    pub events: IndexedSet<[usize; 3]>,
    pub context_variables: IndexedSet<String>,
    pub watchers_by_var: IndexMap<usize, Vec<usize>>,
    /// Statements hoisted above `STX.r(...)`.
    pub imports: Vec<String>,
    /// Rewritten context source: reference and parameter preludes plus the script.
    pub body: String,
    pub hooks: Vec<&'static str>,
    pub exports: Vec<(String, String)>,
    /// `(variable, element index)` for each named reference.
    pub references: Vec<(String, usize)>,
}

impl PayloadInput {
    /// Records that `watcher` must re-run when `variable` changes.
    pub fn link(&mut self, variable: &str, watcher: usize) -> usize {
        let index = self.context_variables.insert(variable.to_string());
        let watchers = self.watchers_by_var.entry(index).or_default();
        if !watchers.contains(&watcher) {
            watchers.push(watcher);
        }
        index
    }

    /// Context variables with no watcher attached.
    pub fn unwatched(&self) -> impl Iterator<Item = &String> {
        self.context_variables
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.watchers_by_var.contains_key(index))
            .map(|(_, name)| name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Single-quoted JavaScript string literal.
pub fn js_quote(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\r', "\\r");
    format!("'{}'", escaped)
}

/// Re-serializes a function expression or declaration, parenthesized so it
/// can be invoked in place.
pub fn normalize_function(source: &str) -> Result<String, CompilerError> {
    let allocator = Allocator::default();
    let wrapped = format!("({})", source.trim());
    let program = parse_program(&allocator, &wrapped)?;
    let code = Codegen::new().build(&program).code;
    let code = code.trim().trim_end_matches(';').trim_end();
    if code.starts_with('(') && code.ends_with(')') {
        Ok(code.to_string())
    } else {
        Ok(format!("({})", code))
    }
}

fn list<T>(items: impl Iterator<Item = T>, render: impl Fn(T) -> String) -> String {
    items.map(render).collect::<Vec<_>>().join(", ")
}

fn section(out: &mut String, key: &str, body: &str) {
    if !body.is_empty() {
        out.push_str(&format!("    {}: [{}],\n", key, body));
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EMISSION
// ═══════════════════════════════════════════════════════════════════════════════

pub fn emit_payload(input: &PayloadInput) -> String {
    let mut out = String::new();
    for import in &input.imports {
        out.push_str(import.trim());
        out.push('\n');
    }

    let file = serde_json::to_string(&input.file).unwrap_or_else(|_| "\"\"".to_string());
    out.push_str(&format!("STX.r({}, function (STX) {{\n", js_quote(&input.tag)));
    out.push_str(&format!(
        "  const _$line = {}; const _$file = {};\n",
        input.line, file
    ));
    if !input.watchers.is_empty() {
        out.push_str(
            "  const [_$bind, _$bind_prop, _$bind_prop_tpl] = [STX.bind, STX.bind_prop, STX.bind_prop_tpl];\n",
        );
    }
    out.push_str("  return {\n    f: _$file, l: _$line,\n");

    section(&mut out, "e", &list(input.element_ids.iter(), |id| js_quote(id)));
    section(&mut out, "t", &list(input.attributes_bound.iter(), |name| js_quote(name)));
    section(&mut out, "o", &list(input.event_names.iter(), |name| js_quote(name)));
    section(&mut out, "w", &list(input.watchers.iter(), Watcher::render));
    section(
        &mut out,
        "v",
        &list(0..input.context_variables.len(), |index| {
            let watchers = input
                .watchers_by_var
                .get(&index)
                .map(|w| list(w.iter(), usize::to_string))
                .unwrap_or_default();
            format!("[{}]", watchers)
        }),
    );
    section(
        &mut out,
        "a",
        &list(input.events.iter(), |[event, element, handler]| {
            format!("[{}, {}, {}]", event, element, handler)
        }),
    );

    out.push_str("    i: function ($) {\n");
    out.push_str("      const [_$escape, _$i] = [STX.escape, $.invalidate];\n");
    if !input.body.trim().is_empty() {
        out.push_str(input.body.trim());
        out.push('\n');
    }
    if !input.hooks.is_empty() {
        let hooks = list(input.hooks.iter(), |hook| {
            let key = LIFECYCLE_HOOKS
                .iter()
                .find(|(name, _)| name == hook)
                .map(|(_, key)| *key)
                .unwrap_or_default();
            format!("{}: {}", key, hook)
        });
        out.push_str(&format!("      $.hooks({{ {} }});\n", hooks));
    }
    if !input.exports.is_empty() {
        let exports = list(input.exports.iter(), |(exported, local)| {
            if exported == local {
                exported.clone()
            } else {
                format!("{}: {}", exported, local)
            }
        });
        out.push_str(&format!("      $.exports({{ {} }});\n", exports));
    }
    for (variable, element) in &input.references {
        out.push_str(&format!("      {} = $.el({});\n", variable, element));
    }

    let mut returned = Vec::new();
    if !input.expressions.is_empty() {
        returned.push(format!("e: [{}]", list(input.expressions.iter(), String::clone)));
    }
    if !input.event_handlers.is_empty() {
        returned.push(format!("h: [{}]", list(input.event_handlers.iter(), String::clone)));
    }
    if returned.is_empty() {
        out.push_str("      return {};\n");
    } else {
        out.push_str(&format!("      return {{ {} }};\n", returned.join(", ")));
    }
    out.push_str("    }\n  };\n});\n");

    tracing::debug!(
        tag = %input.tag,
        watchers = input.watchers.len(),
        events = input.events.len(),
        bytes = out.len(),
        "emitted payload"
    );
    out
}
