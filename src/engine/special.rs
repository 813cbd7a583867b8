//! Elements that are bound by id or position instead of a marker attribute.
//!
//! An element that already carries a marker belongs to the marker pass and is
//! skipped here, so each node is written and reported at most once.

use super::render::{
    LanguageView,
    RenderReport,
};
use crate::config::SiteSettings;
use crate::dom::{
    Document,
    NodeId,
    Selector,
    SelectorError,
};

/// An ordinal group with its selectors parsed.
#[derive(Debug, Clone)]
struct CompiledGroup {
    /// Elements of the group, in document order
    selector: Selector,
    /// Descendant of each element that receives the text
    target: Option<Selector>,
    /// Key per position
    keys: Vec<String>,
    /// Skip the group unless every position exists
    require_full: bool,
}

/// Renders placeholders, dropdown options and ordinal label groups.
#[derive(Debug, Clone)]
pub struct SpecialRenderer {
    /// (element id, key)
    placeholders: Vec<(String, String)>,
    /// (select id, option keys)
    dropdowns: Vec<(String, Vec<String>)>,
    /// Ordinal label groups
    groups: Vec<CompiledGroup>,
    /// Matches `<option>` inside a dropdown
    option: Selector,
    /// Text and HTML marker attributes
    markers: [String; 2],
}

impl SpecialRenderer {
    pub fn new(settings: &SiteSettings) -> Result<Self, SelectorError> {
        let bindings = &settings.bindings;
        let groups = bindings
            .ordinal_groups
            .iter()
            .map(|group| {
                Ok(CompiledGroup {
                    selector: Selector::parse(&group.selector)?,
                    target: group.target.as_deref().map(Selector::parse).transpose()?,
                    keys: group.keys.clone(),
                    require_full: group.require_full,
                })
            })
            .collect::<Result<Vec<_>, SelectorError>>()?;

        Ok(Self {
            placeholders: bindings
                .placeholders
                .iter()
                .map(|(id, key)| (id.clone(), key.clone()))
                .collect(),
            dropdowns: bindings.dropdowns.iter().map(|(id, keys)| (id.clone(), keys.clone())).collect(),
            groups,
            option: Selector::parse("option")?,
            markers: [settings.marker_attribute.clone(), settings.html_marker_attribute.clone()],
        })
    }

    /// Whether the marker pass already owns `id`.
    fn is_marked(&self, document: &Document, id: NodeId) -> bool {
        self.markers.iter().any(|marker| document.has_attribute(id, marker))
    }

    pub(super) fn render(
        &self,
        document: &mut Document,
        view: &LanguageView<'_>,
        report: &mut RenderReport,
    ) {
        self.render_placeholders(document, view, report);
        self.render_dropdowns(document, view, report);
        self.render_groups(document, view, report);
    }

    /// Sets `placeholder` on elements bound by id.
    fn render_placeholders(
        &self,
        document: &mut Document,
        view: &LanguageView<'_>,
        report: &mut RenderReport,
    ) {
        for (id, key) in &self.placeholders {
            let Some(element) = document.element_by_id(id) else {
                tracing::debug!(id = %id, "Placeholder target not in document");
                continue;
            };
            if self.is_marked(document, element) {
                continue;
            }
            match view.get(key) {
                Some(text) => {
                    document.set_attribute(element, "placeholder", text);
                    report.applied += 1;
                }
                None => report.record_missing(document, element, key),
            }
        }
    }

    /// Translates `<option>`s by position.
    fn render_dropdowns(
        &self,
        document: &mut Document,
        view: &LanguageView<'_>,
        report: &mut RenderReport,
    ) {
        for (id, keys) in &self.dropdowns {
            let Some(select) = document.element_by_id(id) else {
                tracing::debug!(id = %id, "Dropdown not in document");
                continue;
            };
            let options = document.query_selector_all(select, &self.option);
            // Options past the known keys are left as authored.
            for (option, key) in options.into_iter().zip(keys) {
                if self.is_marked(document, option) {
                    continue;
                }
                set_text(document, option, key, view, report);
            }
        }
    }

    /// Translates ordinal label groups.
    fn render_groups(&self, document: &mut Document, view: &LanguageView<'_>, report: &mut RenderReport) {
        for group in &self.groups {
            let matches = document.query_selector_all(document.root(), &group.selector);
            if matches.is_empty() {
                tracing::debug!(selector = %group.selector, "Ordinal group not in document");
                continue;
            }
            if group.require_full && matches.len() < group.keys.len() {
                tracing::debug!(
                    selector = %group.selector,
                    found = matches.len(),
                    expected = group.keys.len(),
                    "Skipping incomplete ordinal group"
                );
                continue;
            }

            for (node, key) in matches.into_iter().zip(&group.keys) {
                let target = match &group.target {
                    Some(target) => document.query_selector(node, target),
                    None => Some(node),
                };
                let Some(target) = target else {
                    tracing::debug!(selector = %group.selector, key = %key, "Ordinal target missing");
                    continue;
                };
                if self.is_marked(document, target) {
                    continue;
                }
                set_text(document, target, key, view, report);
            }
        }
    }
}

/// Writes the translation of `key` as text, or records it as missing.
fn set_text(
    document: &mut Document,
    id: NodeId,
    key: &str,
    view: &LanguageView<'_>,
    report: &mut RenderReport,
) {
    match view.get(key) {
        Some(text) => {
            document.set_text_content(id, text);
            report.applied += 1;
        }
        None => report.record_missing(document, id, key),
    }
}
