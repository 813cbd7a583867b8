//! The render pass: writes one language into every bound node.

use super::special::SpecialRenderer;
use crate::config::SiteSettings;
use crate::dom::{
    Document,
    NodeId,
    Selector,
    SelectorError,
};
use crate::input::translation::LanguageTable;
use crate::types::SourcePosition;

/// Lookups into the table of the language being rendered.
#[derive(Debug, Clone, Copy)]
pub struct LanguageView<'a> {
    /// Flattened entries of the language
    entries: &'a LanguageTable,
    /// Language code
    language: &'a str,
}

impl<'a> LanguageView<'a> {
    #[must_use]
    pub const fn new(entries: &'a LanguageTable, language: &'a str) -> Self {
        Self { entries, language }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.entries.get(key).map(String::as_str)
    }

    #[must_use]
    pub const fn language(&self) -> &'a str {
        self.language
    }
}

/// A bound node whose key has no translation in the rendered language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingKey {
    pub key: String,
    /// Tag name of the bound element
    pub element: String,
    /// Where the element was authored, if it came from parsed markup
    pub position: Option<SourcePosition>,
}

/// Outcome of a render pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub language: String,
    /// Nodes written
    pub applied: usize,
    pub missing: Vec<MissingKey>,
}

impl RenderReport {
    #[must_use]
    pub fn new(language: &str) -> Self {
        Self { language: language.to_string(), ..Self::default() }
    }

    /// Records a missing translation and leaves the node as it is.
    pub(super) fn record_missing(&mut self, document: &Document, id: NodeId, key: &str) {
        let element = document.tag_name(id).unwrap_or_default().to_string();
        let position = document.source_range(id).map(|range| range.start);
        match position {
            Some(position) => tracing::warn!(
                language = %self.language,
                key,
                element = %element,
                %position,
                "Missing translation"
            ),
            None => tracing::warn!(language = %self.language, key, element = %element, "Missing translation"),
        }
        self.missing.push(MissingKey { key: key.to_string(), element, position });
    }
}

/// Where a translation goes inside a bound element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// `placeholder` attribute of text-like inputs and textareas
    Placeholder,
    /// `content` attribute of `<meta>`
    Content,
    /// `value` attribute of buttons and other inputs
    Value,
    /// Element text, keeping a leading icon
    Text,
}

/// Where a bound element shows its translation.
fn placement(document: &Document, id: NodeId) -> Placement {
    match document.tag_name(id) {
        Some("input") => {
            let input_type = document.attribute(id, "type").map(str::to_ascii_lowercase);
            match input_type.as_deref() {
                None | Some("" | "text" | "email" | "tel") => Placement::Placeholder,
                Some(_) => Placement::Value,
            }
        }
        Some("textarea") => Placement::Placeholder,
        Some("meta") => Placement::Content,
        _ => Placement::Text,
    }
}

/// Applies a language to a document.
#[derive(Debug, Clone)]
pub struct Renderer {
    /// Attribute naming a plain-text key
    marker: String,
    /// Attribute naming a markup key
    html_marker: String,
    /// Icon kept in front of a translated label
    icon: Selector,
    /// Elements bound by id or position
    special: SpecialRenderer,
}

impl Renderer {
    pub fn new(settings: &SiteSettings) -> Result<Self, SelectorError> {
        Ok(Self {
            marker: settings.marker_attribute.clone(),
            html_marker: settings.html_marker_attribute.clone(),
            icon: Selector::parse(&settings.icon_selector)?,
            special: SpecialRenderer::new(settings)?,
        })
    }

    /// Renders every marked node, every HTML-marked node, then the special elements.
    ///
    /// Running it twice with the same language leaves the document unchanged.
    pub fn render_all(&self, document: &mut Document, view: &LanguageView<'_>) -> RenderReport {
        let mut report = RenderReport::new(view.language());

        for id in document.elements_with_attribute(&self.marker) {
            let Some(key) = document.attribute(id, &self.marker).map(ToString::to_string) else {
                continue;
            };
            match view.get(&key) {
                Some(text) => {
                    self.apply_text(document, id, text);
                    report.applied += 1;
                }
                None => report.record_missing(document, id, &key),
            }
        }

        for id in document.elements_with_attribute(&self.html_marker) {
            let Some(key) = document.attribute(id, &self.html_marker).map(ToString::to_string)
            else {
                continue;
            };
            match view.get(&key) {
                Some(markup) => match document.set_inner_html(id, markup) {
                    Ok(()) => report.applied += 1,
                    Err(error) => tracing::warn!(key = %key, %error, "Failed to parse translated markup"),
                },
                None => report.record_missing(document, id, &key),
            }
        }

        self.special.render(document, view, &mut report);

        tracing::debug!(
            language = %report.language,
            applied = report.applied,
            missing = report.missing.len(),
            "Render pass finished"
        );
        report
    }

    /// Writes plain text according to the placement.
    fn apply_text(&self, document: &mut Document, id: NodeId, text: &str) {
        match placement(document, id) {
            Placement::Placeholder => {
                document.set_attribute(id, "placeholder", text);
            }
            Placement::Content => {
                document.set_attribute(id, "content", text);
            }
            Placement::Value => {
                document.set_attribute(id, "value", text);
            }
            Placement::Text => {
                let icon = if document.tag_name(id) == Some("title") {
                    None
                } else {
                    document.query_selector(id, &self.icon)
                };
                match icon {
                    Some(icon) => document.set_text_after(id, icon, &format!(" {text}")),
                    None => document.set_text_content(id, text),
                }
            }
        }
    }
}
