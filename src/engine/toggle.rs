//! The language toggle and the switching visual state.

use crate::config::ToggleConfig;
use crate::dom::{
    Document,
    Selector,
    SelectorError,
};

/// Writes the toggle affordance. The toggle is never read back.
#[derive(Debug, Clone)]
pub struct LanguageToggle {
    /// Element id, switching class and labels
    config: ToggleConfig,
    /// Flag inside the toggle
    flag: Selector,
    /// Label text inside the toggle
    text: Selector,
}

impl LanguageToggle {
    pub fn new(config: &ToggleConfig) -> Result<Self, SelectorError> {
        Ok(Self {
            config: config.clone(),
            flag: Selector::parse(&config.flag_selector)?,
            text: Selector::parse(&config.text_selector)?,
        })
    }

    /// Advertises `target`, the language a click would switch to.
    ///
    /// Does nothing unless the toggle and both of its label elements exist.
    pub fn show_target(&self, document: &mut Document, target: &str) {
        let Some(toggle) = document.element_by_id(&self.config.element_id) else {
            tracing::debug!(id = %self.config.element_id, "Language toggle not in document");
            return;
        };
        let (Some(flag), Some(text)) =
            (document.query_selector(toggle, &self.flag), document.query_selector(toggle, &self.text))
        else {
            tracing::debug!("Language toggle is missing its flag or text element");
            return;
        };
        let Some(label) = self.config.labels.get(target) else {
            tracing::debug!(language = target, "No toggle label for language");
            return;
        };

        document.set_text_content(flag, &label.flag);
        document.set_text_content(text, &label.text);
        document.set_attribute(toggle, "title", &label.title);
    }

    /// Adds or removes the switching class on `<body>` and the toggle.
    pub fn set_switching(&self, document: &mut Document, switching: bool) {
        let targets = [document.body(), document.element_by_id(&self.config.element_id)];
        for target in targets.into_iter().flatten() {
            if switching {
                document.add_class(target, &self.config.switching_class);
            } else {
                document.remove_class(target, &self.config.switching_class);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;

    const PAGE: &str = r#"<html><body><button id="language-toggle" class="lang-btn" title="Switch to Georgian"><span class="language-flag">🇬🇪</span><span class="language-text">ქართული</span></button></body></html>"#;

    fn toggle() -> LanguageToggle {
        LanguageToggle::new(&ToggleConfig::default()).unwrap()
    }

    #[rstest]
    fn shows_english_when_georgian_is_current() {
        let mut document = Document::parse(PAGE).unwrap();

        toggle().show_target(&mut document, "en");

        let button = document.element_by_id("language-toggle").unwrap();
        assert_that!(document.attribute(button, "title"), some(eq("Switch to English")));
        assert_that!(document.text_content(button), eq("🇺🇸English"));
    }

    #[rstest]
    fn shows_georgian_when_english_is_current() {
        let mut document = Document::parse(PAGE).unwrap();
        let toggle = toggle();
        toggle.show_target(&mut document, "en");

        toggle.show_target(&mut document, "ka");

        assert_that!(document.to_html(), eq(PAGE));
    }

    #[rstest]
    fn unknown_label_leaves_toggle() {
        let mut document = Document::parse(PAGE).unwrap();

        toggle().show_target(&mut document, "fr");

        assert_that!(document.to_html(), eq(PAGE));
    }

    #[rstest]
    fn incomplete_toggle_is_ignored() {
        let html = r#"<button id="language-toggle"><span class="language-flag">🇬🇪</span></button>"#;
        let mut document = Document::parse(html).unwrap();

        toggle().show_target(&mut document, "en");

        assert_that!(document.to_html(), eq(html));
    }

    #[rstest]
    fn switching_class_round_trip() {
        let mut document = Document::parse(PAGE).unwrap();
        let toggle = toggle();

        toggle.set_switching(&mut document, true);
        let body = document.body().unwrap();
        let button = document.element_by_id("language-toggle").unwrap();
        assert_that!(document.has_class(body, "language-switching"), eq(true));
        assert_that!(document.attribute(button, "class"), some(eq("lang-btn language-switching")));

        toggle.set_switching(&mut document, false);
        assert_that!(document.to_html(), eq(PAGE));
    }
}
