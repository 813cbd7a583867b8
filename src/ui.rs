//! Interactive page behaviour that shares the document with the language engine.
//!
//! Filtering only writes the inline `style`, which the render pass never
//! touches, so a filter and a language switch can interleave in any order.

pub mod gallery;

use crate::dom::{
    Document,
    NodeId,
};

pub use gallery::{
    Lightbox,
    LightboxItem,
    filter_gallery,
};

/// Replaces the `display` declaration of an inline style, keeping the others.
pub(crate) fn set_display(document: &mut Document, id: NodeId, display: &str) {
    let mut declarations: Vec<String> = document
        .attribute(id, "style")
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|declaration| {
            !declaration.is_empty()
                && declaration.split(':').next().map(str::trim) != Some("display")
        })
        .map(ToString::to_string)
        .collect();
    declarations.push(format!("display: {display}"));
    document.set_attribute(id, "style", declarations.join("; "));
}
