//! Builds a [`Document`] from markup using tree-sitter-html.
//!
//! tree-sitter-html trims text nodes and keeps inter-node whitespace as extras,
//! so text is rebuilt from byte spans of the source rather than from node text.
//! That keeps authored whitespace intact across a parse/serialize round trip.

use thiserror::Error;
use tree_sitter::{
    Node,
    Parser,
};

use super::serialize::is_void_element;
use super::{
    Document,
    Element,
    NodeData,
    NodeId,
};
use crate::types::SourceRange;

/// Errors raised while turning markup into a document.
#[derive(Error, Debug)]
pub enum DomError {
    /// Error when failing to set the language for the parser
    #[error("Failed to set language for parser: {0}")]
    LanguageSetup(#[from] tree_sitter::LanguageError),
    /// Error when tree-sitter gives up on the input
    #[error("Failed to parse markup")]
    ParseFailed,
}

/// Parses a full HTML document.
pub fn parse_document(source: &str) -> Result<Document, DomError> {
    let mut document = Document::new();
    let root = document.root();
    parse_into(&mut document, root, source)?;
    Ok(document)
}

/// Parses `source` and appends the resulting nodes to `parent`.
pub(super) fn parse_into(
    document: &mut Document,
    parent: NodeId,
    source: &str,
) -> Result<(), DomError> {
    let mut parser = Parser::new();
    parser.set_language(&tree_sitter_html::LANGUAGE.into())?;
    let tree = parser.parse(source, None).ok_or(DomError::ParseFailed)?;
    let root = tree.root_node();
    if root.has_error() {
        tracing::debug!("Markup contains syntax errors; building a best-effort tree");
    }

    let mut builder = TreeBuilder { document, source };
    builder.build_content(root, parent, 0, source.len());
    Ok(())
}

/// Walks the tree-sitter syntax tree and mirrors it into the arena.
struct TreeBuilder<'a> {
    /// Target document
    document: &'a mut Document,
    /// Markup being parsed
    source: &'a str,
}

impl TreeBuilder<'_> {
    /// Source text for a byte span; empty when the span is not on a char boundary.
    fn slice(&self, start: usize, end: usize) -> &str {
        self.source.get(start..end).unwrap_or_default()
    }

    /// Source text of a syntax node.
    fn node_text(&self, node: Node<'_>) -> &str {
        self.slice(node.start_byte(), node.end_byte())
    }

    /// Mirrors the children of `node` lying within `[start, end)` into `parent`.
    fn build_content(&mut self, node: Node<'_>, parent: NodeId, start: usize, end: usize) {
        let mut cursor = start;
        let mut walker = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut walker).collect();

        for child in children {
            if child.start_byte() < start || child.start_byte() >= end {
                continue;
            }
            match child.kind() {
                "start_tag" | "end_tag" | "self_closing_tag" => {}
                "text" | "entity" => {
                    let text = decode_entities(self.slice(cursor, child.end_byte()));
                    self.document.append_text(parent, &text);
                    cursor = child.end_byte();
                }
                "element" | "script_element" | "style_element" => {
                    self.flush_gap(parent, cursor, child.start_byte());
                    self.build_element(child, parent);
                    cursor = child.end_byte();
                }
                "comment" => {
                    self.flush_gap(parent, cursor, child.start_byte());
                    let raw = self.node_text(child);
                    let inner =
                        raw.strip_prefix("<!--").and_then(|r| r.strip_suffix("-->")).unwrap_or(raw);
                    let comment = self.document.create_node(NodeData::Comment(inner.to_string()));
                    self.document.append_child(parent, comment);
                    cursor = child.end_byte();
                }
                "doctype" => {
                    self.flush_gap(parent, cursor, child.start_byte());
                    let raw = self.node_text(child);
                    let inner =
                        raw.strip_prefix("<!").and_then(|r| r.strip_suffix('>')).unwrap_or(raw);
                    let doctype = self.document.create_node(NodeData::Doctype(inner.to_string()));
                    self.document.append_child(parent, doctype);
                    cursor = child.end_byte();
                }
                "erroneous_end_tag" => {
                    self.flush_gap(parent, cursor, child.start_byte());
                    tracing::debug!(
                        position = %SourceRange::from_node(&child).start,
                        "Dropping stray end tag"
                    );
                    cursor = child.end_byte();
                }
                "ERROR" => {
                    self.flush_gap(parent, cursor, child.start_byte());
                    self.build_content(child, parent, child.start_byte(), child.end_byte());
                    cursor = child.end_byte();
                }
                _ => {
                    let text = decode_entities(self.slice(cursor, child.end_byte()));
                    self.document.append_text(parent, &text);
                    cursor = child.end_byte();
                }
            }
        }

        self.flush_gap(parent, cursor, end);
    }

    /// Appends source text between two nodes (normally whitespace).
    fn flush_gap(&mut self, parent: NodeId, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let text = decode_entities(self.slice(start, end));
        self.document.append_text(parent, &text);
    }

    /// Adds an element and its content under `parent`.
    fn build_element(&mut self, node: Node<'_>, parent: NodeId) {
        let mut walker = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut walker).collect();

        let Some(start_tag) =
            children.iter().find(|c| matches!(c.kind(), "start_tag" | "self_closing_tag"))
        else {
            // No tag: keep whatever text the node spans.
            let text = decode_entities(self.node_text(node));
            self.document.append_text(parent, &text);
            return;
        };

        let element = self.read_tag(*start_tag);
        let is_void = is_void_element(&element.name) || start_tag.kind() == "self_closing_tag";
        let id = self.document.create_node(NodeData::Element(element));
        self.document.set_source_range(id, SourceRange::from_node(&node));
        self.document.append_child(parent, id);

        if is_void {
            return;
        }

        if matches!(node.kind(), "script_element" | "style_element") {
            if let Some(raw) = children.iter().find(|c| c.kind() == "raw_text") {
                let text = self.node_text(*raw).to_string();
                let text_node = self.document.create_text(text);
                self.document.append_child(id, text_node);
            }
            return;
        }

        let content_start = start_tag.end_byte();
        let content_end = children
            .iter()
            .find(|c| c.kind() == "end_tag")
            .map_or_else(|| node.end_byte(), Node::start_byte);
        self.build_content(node, id, content_start, content_end);
    }

    /// Reads the tag name and attributes of a start tag.
    fn read_tag(&self, tag: Node<'_>) -> Element {
        let mut walker = tag.walk();
        let mut element = Element::new("");

        for child in tag.children(&mut walker) {
            match child.kind() {
                "tag_name" => element.name = self.node_text(child).to_ascii_lowercase(),
                "attribute" => {
                    if let Some((name, value)) = self.read_attribute(child) {
                        element.attrs.push(super::Attribute { name, value });
                    }
                }
                _ => {}
            }
        }

        element
    }

    /// Name and decoded value of one attribute node.
    fn read_attribute(&self, attribute: Node<'_>) -> Option<(String, String)> {
        let mut walker = attribute.walk();
        let mut name = None;
        let mut value = String::new();

        for child in attribute.children(&mut walker) {
            match child.kind() {
                "attribute_name" => name = Some(self.node_text(child).to_ascii_lowercase()),
                "attribute_value" => value = decode_entities(self.node_text(child)),
                "quoted_attribute_value" => {
                    let mut inner_walker = child.walk();
                    value = child
                        .children(&mut inner_walker)
                        .find(|c| c.kind() == "attribute_value")
                        .map(|c| decode_entities(self.node_text(c)))
                        .unwrap_or_default();
                }
                _ => {}
            }
        }

        name.map(|n| (n, value))
    }
}

/// Decodes character references. Unknown references are kept literally.
#[must_use]
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(rest.get(..amp).unwrap_or_default());
        let tail = rest.get(amp..).unwrap_or_default();
        match tail.find(';').filter(|semi| *semi <= 32) {
            Some(semi) => {
                let name = tail.get(1..semi).unwrap_or_default();
                if let Some(decoded) = decode_reference(name) {
                    out.push(decoded);
                } else {
                    out.push_str(tail.get(..=semi).unwrap_or_default());
                }
                rest = tail.get(semi + 1..).unwrap_or_default();
            }
            None => {
                out.push('&');
                rest = tail.get(1..).unwrap_or_default();
            }
        }
    }
    out.push_str(rest);
    out
}

/// Character for a named or numeric reference, without `&` and `;`.
fn decode_reference(name: &str) -> Option<char> {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    let decoded = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "times" => '×',
        "middot" => '·',
        "bull" => '•',
        "euro" => '€',
        "deg" => '°',
        "star" => '☆',
        _ => return None,
    };
    Some(decoded)
}
