//! One-time migration that binds authored markup to translation keys.
//!
//! タグ付けは冪等: マーカー属性が既にある要素には触れない。

pub mod rules;

pub use rules::{
    TagRule,
    resort_rules,
};

use crate::dom::{
    Document,
    NodeId,
    Selector,
};

/// Outcome of one tagging run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagReport {
    /// Elements that received a marker
    pub tagged: usize,
    /// Elements skipped because they already carried a marker
    pub already_marked: usize,
    /// Rules whose selectors matched nothing (or too little)
    pub unmatched_rules: usize,
    /// Selectors that failed to parse
    pub invalid_selectors: Vec<String>,
}

/// Applies [`TagRule`]s to a document.
#[derive(Debug, Clone)]
pub struct AttributeTagger {
    /// Rules in application order
    rules: Vec<TagRule>,
    /// Text marker attribute name
    marker: String,
    /// HTML marker attribute name
    html_marker: String,
}

impl AttributeTagger {
    #[must_use]
    pub fn new(rules: Vec<TagRule>, marker: impl Into<String>, html_marker: impl Into<String>) -> Self {
        Self { rules, marker: marker.into(), html_marker: html_marker.into() }
    }

    #[must_use]
    pub fn rules(&self) -> &[TagRule] {
        &self.rules
    }

    /// Runs every rule once, in order.
    pub fn run(&self, document: &mut Document) -> TagReport {
        let mut report = TagReport::default();

        for rule in &self.rules {
            let matched = match rule {
                TagRule::Selector { selector, key, html } => self
                    .compile(selector, &mut report)
                    .map(|selector| {
                        let targets = document.query_selector_all(document.root(), &selector);
                        for target in &targets {
                            self.tag_if_absent(document, *target, key, *html, &mut report);
                        }
                        !targets.is_empty()
                    }),
                TagRule::Sequence { selector, keys, start, min_count } => {
                    self.compile(selector, &mut report).map(|selector| {
                        let targets = document.query_selector_all(document.root(), &selector);
                        if targets.is_empty() || targets.len() < *min_count {
                            return false;
                        }
                        for (target, key) in targets.iter().skip(*start).zip(keys) {
                            self.tag_if_absent(document, *target, key, false, &mut report);
                        }
                        true
                    })
                }
                TagRule::Nested { container, index, target, key, min_count, html } => {
                    let container = self.compile(container, &mut report);
                    let target = self.compile(target, &mut report);
                    container.zip(target).map(|(container, target)| {
                        let containers = document.query_selector_all(document.root(), &container);
                        if containers.len() < *min_count {
                            return false;
                        }
                        let found = containers
                            .get(*index)
                            .and_then(|scope| document.query_selector(*scope, &target));
                        if let Some(found) = found {
                            self.tag_if_absent(document, found, key, *html, &mut report);
                        }
                        found.is_some()
                    })
                }
            };

            if matched != Some(true) {
                tracing::debug!(selector = rule.primary_selector(), "Tag rule matched nothing");
                report.unmatched_rules += 1;
            }
        }

        tracing::info!(
            tagged = report.tagged,
            already_marked = report.already_marked,
            unmatched = report.unmatched_rules,
            invalid = report.invalid_selectors.len(),
            "Tagging finished"
        );
        report
    }

    /// Parses a selector; unparseable selectors are reported and skipped.
    fn compile(&self, css: &str, report: &mut TagReport) -> Option<Selector> {
        match Selector::parse(css) {
            Ok(selector) => Some(selector),
            Err(error) => {
                tracing::warn!(selector = css, %error, "Skipping tag rule with unsupported selector");
                if !report.invalid_selectors.iter().any(|s| s == css) {
                    report.invalid_selectors.push(css.to_string());
                }
                None
            }
        }
    }

    /// Sets the marker unless the element is already bound to a key.
    fn tag_if_absent(
        &self,
        document: &mut Document,
        id: NodeId,
        key: &str,
        html: bool,
        report: &mut TagReport,
    ) {
        if document.has_attribute(id, &self.marker) || document.has_attribute(id, &self.html_marker)
        {
            report.already_marked += 1;
            return;
        }
        let attribute = if html { &self.html_marker } else { &self.marker };
        if document.set_attribute(id, attribute, key) {
            report.tagged += 1;
        }
    }
}
