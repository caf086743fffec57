/// Read-only traversal over a template tree.
///
/// Implementers override `visit_*` methods and call the matching `walk_*`
/// function to keep descending; not calling it prunes the subtree.
use crate::dom::{Document, Element, NodeId, NodeKind};

pub trait TemplateVisitor {
    fn visit_node(&mut self, doc: &Document, id: NodeId) {
        walk_node(self, doc, id);
    }

    fn visit_element(&mut self, doc: &Document, id: NodeId, _element: &Element) {
        walk_children(self, doc, id);
    }

    fn visit_text(&mut self, _doc: &Document, _id: NodeId, _text: &str) {
        // Leaf node, nothing to walk
    }
}

pub fn walk_node<V: TemplateVisitor + ?Sized>(visitor: &mut V, doc: &Document, id: NodeId) {
    match doc.kind(id) {
        NodeKind::Element(element) => visitor.visit_element(doc, id, element),
        NodeKind::Text(text) => visitor.visit_text(doc, id, text),
        NodeKind::Document => walk_children(visitor, doc, id),
        NodeKind::Comment(_) | NodeKind::Doctype(_) | NodeKind::Raw(_) => {}
    }
}

pub fn walk_children<V: TemplateVisitor + ?Sized>(visitor: &mut V, doc: &Document, id: NodeId) {
    for child in doc.children(id) {
        visitor.visit_node(doc, child);
    }
}
