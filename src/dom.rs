//! Template tree (arena-based allocation).
//!
//! Nodes live in a flat vector and link to each other by index. Every
//! mutation keeps parent/sibling links consistent; detached nodes stay in the
//! arena but are unreachable from the root.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

lazy_static! {
    pub static ref VOID_ELEMENTS: HashSet<&'static str> = [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta",
        "param", "source", "track", "wbr",
    ]
    .into_iter()
    .collect();

    /// Elements whose text content is emitted verbatim.
    pub static ref RAW_TEXT_ELEMENTS: HashSet<&'static str> =
        ["script", "style"].into_iter().collect();
}

/// Escape text for HTML output (content and attribute safe).
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Escape text content (quotes are left alone).
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// Serializes attributes as ` name="value"` pairs; empty values render bare.
pub fn render_attributes(attributes: &[Attribute], out: &mut String) {
    for attr in attributes {
        out.push(' ');
        out.push_str(&attr.name_raw);
        if !attr.value.is_empty() {
            out.push_str("=\"");
            out.push_str(&escape_attribute(&attr.value));
            out.push('"');
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODE TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    /// Name as written in the source, used for output.
    pub name_raw: String,
    /// Directive/attribute key.
    pub name: String,
    pub value: String,
    pub namespace: Option<String>,
}

impl Attribute {
    pub fn new(name_raw: &str, value: &str) -> Self {
        let namespace = name_raw
            .split_once(':')
            .map(|(prefix, _)| prefix.trim().to_ascii_lowercase())
            .filter(|prefix| !prefix.is_empty());
        Self {
            name_raw: name_raw.to_string(),
            name: normalize_attribute_name(name_raw),
            value: value.to_string(),
            namespace,
        }
    }
}

/// Trim, lowercase and strip a leading `x-`, `data-`, `x:` or `data:`.
pub fn normalize_attribute_name(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();
    for prefix in ["data-", "data:", "x-", "x:"] {
        if let Some(rest) = lowered.strip_prefix(prefix) {
            if !rest.is_empty() {
                return rest.to_string();
            }
        }
    }
    lowered
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<Attribute>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.attribute(name).map(|a| a.value.as_str())
    }

    pub fn set_attribute(&mut self, name_raw: &str, value: &str) {
        let attribute = Attribute::new(name_raw, value);
        match self.attributes.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => existing.value = attribute.value,
            None => self.attributes.push(attribute),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Attribute> {
        let index = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(index))
    }

    pub fn add_class(&mut self, class: &str) {
        let current = self.value("class").unwrap_or_default();
        if current.split_whitespace().any(|c| c == class) {
            return;
        }
        let updated = if current.trim().is_empty() {
            class.to_string()
        } else {
            format!("{} {}", current.trim(), class)
        };
        self.set_attribute("class", &updated);
    }

    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(self.tag.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(Element),
    Text(String),
    Comment(String),
    Doctype(String),
    /// Verbatim HTML, never escaped.
    Raw(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub position: Position,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

impl Node {
    fn new(kind: NodeKind, position: Position) -> Self {
        Self {
            kind,
            position,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DOCUMENT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct Document {
    pub file: String,
    nodes: Vec<Node>,
}

impl Document {
    pub fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            nodes: vec![Node::new(NodeKind::Document, Position::default())],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn position(&self, id: NodeId) -> Position {
        self.nodes[id.0].position
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn create(&mut self, kind: NodeKind, position: Position) -> NodeId {
        self.nodes.push(Node::new(kind, position));
        NodeId(self.nodes.len() - 1)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.nodes[id.0].first_child;
        while let Some(child) = cursor {
            out.push(child);
            cursor = self.nodes[child.0].next_sibling;
        }
        out
    }

    /// Descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Mutation
    // ───────────────────────────────────────────────────────────────────────────

    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[id.0];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        let Some(parent) = parent else {
            return;
        };
        match prev {
            Some(prev) => self.nodes[prev.0].next_sibling = next,
            None => self.nodes[parent.0].first_child = next,
        }
        match next {
            Some(next) => self.nodes[next.0].prev_sibling = prev,
            None => self.nodes[parent.0].last_child = prev,
        }
        let node = &mut self.nodes[id.0];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let last = self.nodes[parent.0].last_child;
        {
            let node = &mut self.nodes[child.0];
            node.parent = Some(parent);
            node.prev_sibling = last;
        }
        match last {
            Some(last) => self.nodes[last.0].next_sibling = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
        self.nodes[parent.0].last_child = Some(child);
    }

    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.detach(child);
        let prev = self.nodes[reference.0].prev_sibling;
        {
            let node = &mut self.nodes[child.0];
            node.parent = Some(parent);
            node.prev_sibling = prev;
            node.next_sibling = Some(reference);
        }
        self.nodes[reference.0].prev_sibling = Some(child);
        match prev {
            Some(prev) => self.nodes[prev.0].next_sibling = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
    }

    /// Puts `replacement` where `id` was and detaches `id`.
    pub fn replace(&mut self, id: NodeId, replacement: NodeId) {
        self.insert_before(id, replacement);
        self.detach(id);
    }

    pub fn replace_with_raw(&mut self, id: NodeId, html: &str) -> NodeId {
        let position = self.position(id);
        let replacement = self.create(NodeKind::Raw(html.to_string()), position);
        self.replace(id, replacement);
        replacement
    }

    /// Neutralizes a node in place: it stays linked but renders nothing.
    pub fn safe_remove(&mut self, id: NodeId) {
        for child in self.children(id) {
            self.detach(child);
        }
        self.nodes[id.0].kind = NodeKind::Raw(String::new());
    }

    /// Appends text, merging into a trailing text sibling.
    pub fn append_text(&mut self, parent: NodeId, text: &str, position: Position) {
        if let Some(last) = self.nodes[parent.0].last_child {
            if let NodeKind::Text(existing) = &mut self.nodes[last.0].kind {
                existing.push_str(text);
                return;
            }
        }
        let node = self.create(NodeKind::Text(text.to_string()), position);
        self.append(parent, node);
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Subtree transfer
    // ───────────────────────────────────────────────────────────────────────────

    /// New document holding a copy of `id` under its root; `id` is detached here.
    pub fn extract(&mut self, id: NodeId) -> Document {
        let mut out = Document::new(&self.file);
        let root = out.root();
        out.import(self, id, root);
        self.detach(id);
        out
    }

    /// New document holding copies of the children of `id`; they are detached here.
    pub fn extract_children(&mut self, id: NodeId) -> Document {
        self.extract_children_where(id, |_, _| true)
    }

    /// Like `extract_children`, restricted to children accepted by `keep`.
    pub fn extract_children_where(
        &mut self,
        id: NodeId,
        keep: impl Fn(&Document, NodeId) -> bool,
    ) -> Document {
        let mut out = Document::new(&self.file);
        let root = out.root();
        for child in self.children(id) {
            if keep(self, child) {
                out.import(self, child, root);
                self.detach(child);
            }
        }
        out
    }

    fn import(&mut self, source: &Document, id: NodeId, parent: NodeId) {
        let copy = self.create(source.kind(id).clone(), source.position(id));
        self.append(parent, copy);
        for child in source.children(id) {
            self.import(source, child, copy);
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Serialization
    // ───────────────────────────────────────────────────────────────────────────

    pub fn render(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.render_into(id, &mut out);
        out
    }

    fn render_into(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Document => {
                for child in self.children(id) {
                    self.render_into(child, out);
                }
            }
            NodeKind::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                render_attributes(&el.attributes, out);
                out.push('>');
                if el.is_void() {
                    return;
                }
                for child in self.children(id) {
                    self.render_into(child, out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
            NodeKind::Text(text) => {
                let raw_parent = self
                    .parent(id)
                    .and_then(|p| self.tag(p))
                    .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(tag));
                if raw_parent {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_text(text));
                }
            }
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Doctype(name) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name);
                out.push('>');
            }
            NodeKind::Raw(html) => out.push_str(html),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(doc: &mut Document, parent: NodeId, tag: &str) -> NodeId {
        let id = doc.create(NodeKind::Element(Element::new(tag)), Position::default());
        doc.append(parent, id);
        id
    }

    #[test]
    fn test_links_after_mutation() {
        let mut doc = Document::new("t.html");
        let root = doc.root();
        let a = element(&mut doc, root, "a");
        let b = element(&mut doc, root, "b");
        let c = element(&mut doc, root, "c");

        doc.detach(b);
        assert_eq!(doc.children(root), vec![a, c]);
        assert_eq!(doc.parent(b), None);

        doc.insert_before(a, b);
        assert_eq!(doc.children(root), vec![b, a, c]);

        let t = doc.replace_with_raw(a, "x");
        assert_eq!(doc.children(root), vec![b, t, c]);
        assert_eq!(doc.render(root), "<b></b>x<c></c>");
    }

    #[test]
    fn test_attribute_normalization() {
        let attr = Attribute::new("Data-Ref", "btn");
        assert_eq!(attr.name, "ref");
        assert_eq!(attr.name_raw, "Data-Ref");
        assert_eq!(normalize_attribute_name(" x:if "), "if");
        assert_eq!(normalize_attribute_name("onclick"), "onclick");
        assert_eq!(Attribute::new("xlink:href", "#a").namespace.as_deref(), Some("xlink"));
    }

    #[test]
    fn test_render_escapes_text_but_not_scripts() {
        let mut doc = Document::new("t.html");
        let root = doc.root();
        let p = element(&mut doc, root, "p");
        doc.append_text(p, "a < b", Position::default());
        let s = element(&mut doc, root, "script");
        doc.append_text(s, "if (a < b) {}", Position::default());
        let br = element(&mut doc, root, "br");
        doc.element_mut(br).unwrap().set_attribute("class", "x\"y");
        assert_eq!(
            doc.render(root),
            "<p>a &lt; b</p><script>if (a < b) {}</script><br class=\"x&quot;y\">"
        );
    }

    #[test]
    fn test_extract_moves_subtree() {
        let mut doc = Document::new("t.html");
        let root = doc.root();
        let div = element(&mut doc, root, "div");
        let span = element(&mut doc, div, "span");
        doc.append_text(span, "hi", Position::default());

        let extracted = doc.extract_children(div);
        assert_eq!(doc.render(root), "<div></div>");
        assert_eq!(extracted.render(extracted.root()), "<span>hi</span>");
    }

    #[test]
    fn test_safe_remove_neutralizes_in_place() {
        let mut doc = Document::new("t.html");
        let root = doc.root();
        let a = element(&mut doc, root, "a");
        element(&mut doc, a, "b");
        doc.safe_remove(a);
        assert_eq!(doc.children(root), vec![a]);
        assert_eq!(doc.render(root), "");
    }

    #[test]
    fn test_add_class_appends_once() {
        let mut el = Element::new("div");
        el.add_class("_ref_a");
        el.add_class("_ref_a");
        el.set_attribute("class", "box _ref_a");
        el.add_class("_ref_b");
        assert_eq!(el.value("class"), Some("box _ref_a _ref_b"));
    }
}
