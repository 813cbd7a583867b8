//! HTML serialization of a [`Document`] subtree.

use super::{
    Document,
    NodeData,
    NodeId,
};

/// Elements that never have content or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text content is written verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

#[must_use]
pub(super) fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub(super) fn serialize_children(doc: &Document, id: NodeId, out: &mut String) {
    let raw = doc.tag_name(id).is_some_and(|name| RAW_TEXT_ELEMENTS.contains(&name));
    for child in doc.children(id) {
        match doc.data(*child) {
            Some(NodeData::Text(text)) if raw => out.push_str(text),
            _ => serialize_node(doc, *child, out),
        }
    }
}

pub(super) fn serialize_node(doc: &Document, id: NodeId, out: &mut String) {
    let Some(data) = doc.data(id) else {
        return;
    };
    match data {
        NodeData::Document => serialize_children(doc, id, out),
        NodeData::Doctype(raw) => {
            out.push_str("<!");
            out.push_str(raw);
            out.push('>');
        }
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::Text(text) => escape_text(text, out),
        NodeData::Element(element) => {
            out.push('<');
            out.push_str(&element.name);
            for attr in &element.attrs {
                out.push(' ');
                out.push_str(&attr.name);
                if !attr.value.is_empty() {
                    out.push_str("=\"");
                    escape_attribute(&attr.value, out);
                    out.push('"');
                }
            }
            out.push('>');
            if is_void_element(&element.name) {
                return;
            }
            serialize_children(doc, id, out);
            out.push_str("</");
            out.push_str(&element.name);
            out.push('>');
        }
    }
}

/// Escapes text content.
fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

/// Escapes a double-quoted attribute value.
fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}
