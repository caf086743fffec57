//! Structured compiler errors.
//!
//! Every failure carries a stable code, a human message and an ordered
//! key/value detail list. The `Display` form is
//! `[code] Message. { key: 'value', ... }`.

use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const PARSE_TOKENIZER: &str = "parse.tokenizer";
pub const PARSE_ENDING_TAG: &str = "parse.endingTag";

pub const COMPONENT_NAME: &str = "component.name";
pub const COMPONENT_NESTED: &str = "component:nested";
pub const COMPONENT_STYLE_SINGLE: &str = "component:style:single";
pub const COMPONENT_STYLE_LOCATION: &str = "component:style:location";
pub const COMPONENT_SCRIPT_SINGLE: &str = "component:script:single";
pub const COMPONENT_SCRIPT_LOCATION: &str = "component:script:location";
pub const COMPONENT_PARAM_TYPE: &str = "component.param.type";
pub const COMPONENT_PARAM_CLIENT_REF_NOT_FOUND: &str = "component.param.client.ref.notfound";
pub const COMPONENT_PARAM_CLIENT_NAME: &str = "component.param.client.name";
pub const COMPONENT_JS_REDECLARATION: &str = "component.js.redeclaration";
pub const COMPONENT_JS_REF_NAME: &str = "component:js:ref:name";
pub const COMPONENT_JS_REF_DUPLICATED: &str = "component:js:ref:duplicated";
pub const COMPONENT_HOST_BINDING: &str = "component.host.binding";

pub const JS_PARSE: &str = "js.parse";
pub const JS_INTERPOLATION_SIDE_EFFECT: &str = "js:interpolation:sideeffect";
pub const JS_INTERPOLATION_UNSUPPORTED: &str = "js:interpolation:unsupported";

pub const ASSET_GRAPH_CIRCULAR_DEP: &str = "asset.graph.circulardep";
pub const ASSET_DEPENDENCY_NOT_FOUND: &str = "asset.dependency.notfound";
pub const GRAPH_CIRCULAR_DEP: &str = "graph.circulardep";

pub const TEMPLATE_NOT_FOUND: &str = "template.notfound";
pub const TEMPLATE_READ: &str = "template.read";

/// One-line hint for a known error code.
pub fn describe(code: &str) -> &'static str {
    match code {
        PARSE_TOKENIZER => "The template ended inside an unterminated tag or comment.",
        PARSE_ENDING_TAG => "Every start tag must be closed by a matching end tag.",
        COMPONENT_NAME => "A component must declare a name attribute.",
        COMPONENT_NESTED => "Components cannot be declared inside other components.",
        COMPONENT_STYLE_SINGLE => "A component accepts at most one <style> block.",
        COMPONENT_STYLE_LOCATION => "<style> must be an immediate child of <component>.",
        COMPONENT_SCRIPT_SINGLE => "A component accepts at most one <script> block.",
        COMPONENT_SCRIPT_LOCATION => "<script> must be an immediate child of <component>.",
        COMPONENT_PARAM_TYPE => {
            "Parameter types are string, number, bool, array, object, function or unknown."
        }
        COMPONENT_PARAM_CLIENT_REF_NOT_FOUND => {
            "A client parameter reference must name an existing server parameter."
        }
        COMPONENT_PARAM_CLIENT_NAME => {
            "Client parameter names cannot be reserved or start with '_$'."
        }
        COMPONENT_JS_REDECLARATION => "Each identifier may be declared once per component.",
        COMPONENT_JS_REF_NAME => "Reference names cannot be reserved or start with '_$'.",
        COMPONENT_JS_REF_DUPLICATED => "Reference names must be unique within a component.",
        COMPONENT_HOST_BINDING => {
            "The <component> element accepts plain attributes only; bind events and values on its children."
        }
        JS_PARSE => "The JavaScript source could not be parsed.",
        JS_INTERPOLATION_SIDE_EFFECT => "Interpolations must not write component variables.",
        JS_INTERPOLATION_UNSUPPORTED => {
            "Server-rendered interpolations support literals, lookups and operators only."
        }
        ASSET_GRAPH_CIRCULAR_DEP | GRAPH_CIRCULAR_DEP => "Dependencies must form an acyclic graph.",
        ASSET_DEPENDENCY_NOT_FOUND => "Assets may only depend on registered assets.",
        TEMPLATE_NOT_FOUND => "No template with this name exists under the loader root.",
        TEMPLATE_READ => "The template file could not be read.",
        _ => "Unknown error.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
pub struct CompilerError {
    pub code: String,
    pub message: String,
    pub hint: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub details: Vec<(String, String)>,
}

impl CompilerError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        CompilerError {
            code: code.to_string(),
            message: message.into(),
            hint: describe(code).to_string(),
            file: String::new(),
            line: 0,
            column: 0,
            details: Vec::new(),
        }
    }

    pub fn at(mut self, file: &str, line: u32, column: u32) -> Self {
        self.file = file.to_string();
        self.line = line;
        self.column = column;
        self
    }

    pub fn detail(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.details.push((key.to_string(), value.to_string()));
        self
    }

    /// Value of the first detail entry with the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if !self.message.ends_with('.') {
            f.write_str(".")?;
        }

        let mut entries: Vec<(&str, String)> = self
            .details
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();
        if !self.file.is_empty() {
            entries.push(("file", self.file.clone()));
            entries.push(("line", self.line.to_string()));
            entries.push(("column", self.column.to_string()));
        }
        if entries.is_empty() {
            return Ok(());
        }

        f.write_str(" { ")?;
        for (i, (key, value)) in entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: '{}'", key, value.replace('\'', "\\'"))?;
        }
        f.write_str(" }")
    }
}
