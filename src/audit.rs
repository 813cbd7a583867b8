//! Consistency checks between the translation resource and the pages.

use std::collections::{
    BTreeMap,
    BTreeSet,
    HashMap,
};
use std::fmt;
use std::path::{
    Path,
    PathBuf,
};

use crate::config::{
    ConfigManager,
    SiteSettings,
};
use crate::dom::Document;
use crate::input::translation::{
    TranslationTable,
    locate_keys,
};
use crate::site::{
    SiteError,
    find_pages,
};
use crate::tagger::AttributeTagger;
use crate::types::{
    SourcePosition,
    SourceRange,
};

/// One problem found by the audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditIssue {
    /// `key` exists for some languages but not for `language`.
    MissingInLanguage {
        key: String,
        language: String,
        /// A language that defines the key, and where
        defined_in: String,
        position: Option<SourcePosition>,
    },
    /// A page binds `key` but the default language has no entry for it.
    UnknownKey { key: String, page: PathBuf, position: Option<SourcePosition> },
}

impl fmt::Display for AuditIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInLanguage { key, language, defined_in, position } => {
                write!(f, "'{key}' is missing for '{language}' (defined for '{defined_in}'")?;
                if let Some(position) = position {
                    write!(f, " at {position}")?;
                }
                write!(f, ")")
            }
            Self::UnknownKey { key, page, position } => {
                write!(f, "{}", page.display())?;
                if let Some(position) = position {
                    write!(f, ":{position}")?;
                }
                write!(f, ": '{key}' has no translation")
            }
        }
    }
}

/// Keys present for one language must be present for all.
///
/// `ranges` locates keys in the resource text; see [`locate_keys`].
#[must_use]
pub fn check_parity(
    table: &TranslationTable,
    ranges: &HashMap<(String, String), SourceRange>,
) -> Vec<AuditIssue> {
    let mut owners: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for language in table.languages() {
        for key in table.language(language).into_iter().flat_map(|entries| entries.keys()) {
            owners.entry(key.as_str()).or_default().insert(language);
        }
    }

    let languages: Vec<&str> = table.languages().collect();
    let mut issues = Vec::new();
    for (key, defined) in owners {
        let Some(defined_in) = defined.first() else {
            continue;
        };
        for language in languages.iter().filter(|l| !defined.contains(*l)) {
            let position = ranges
                .get(&((*defined_in).to_string(), key.to_string()))
                .map(|range| range.start);
            issues.push(AuditIssue::MissingInLanguage {
                key: key.to_string(),
                language: (*language).to_string(),
                defined_in: (*defined_in).to_string(),
                position,
            });
        }
    }
    issues
}

/// Keys bound in `document` that the default language does not define.
#[must_use]
pub fn check_page(
    document: &Document,
    page: &Path,
    table: &TranslationTable,
    settings: &SiteSettings,
) -> Vec<AuditIssue> {
    let mut issues = Vec::new();
    for marker in [&settings.marker_attribute, &settings.html_marker_attribute] {
        for id in document.elements_with_attribute(marker) {
            let Some(key) = document.attribute(id, marker) else {
                continue;
            };
            if table.get(&settings.default_language, key).is_none() {
                issues.push(AuditIssue::UnknownKey {
                    key: key.to_string(),
                    page: page.to_path_buf(),
                    position: document.source_range(id).map(|range| range.start),
                });
            }
        }
    }
    issues
}

/// Audits the translation resource and every page of a site.
pub async fn audit_site(site_root: &Path) -> Result<Vec<AuditIssue>, SiteError> {
    let mut config = ConfigManager::new();
    config.load_settings(Some(site_root.to_path_buf()))?;
    let settings = config.get_settings();

    let translations_path = config.translations_path();
    let text = tokio::fs::read_to_string(&translations_path)
        .await
        .map_err(|source| SiteError::Io { path: translations_path.clone(), source })?;
    let table = TranslationTable::from_json_str(&text, &settings.key_separator)?;
    let ranges = locate_keys(&text, &settings.key_separator);

    let mut issues = check_parity(&table, &ranges);

    let tagger = AttributeTagger::new(
        settings.effective_tag_rules(),
        settings.marker_attribute.clone(),
        settings.html_marker_attribute.clone(),
    );
    for page in find_pages(site_root, settings)? {
        let source = match tokio::fs::read_to_string(&page).await {
            Ok(source) => source,
            Err(error) => {
                tracing::warn!(page = %page.display(), %error, "Failed to read page");
                continue;
            }
        };
        let mut document = Document::parse(&source)
            .map_err(|source| SiteError::Dom { path: page.clone(), source })?;
        tagger.run(&mut document);
        let relative = page.strip_prefix(site_root).unwrap_or(&page);
        issues.extend(check_page(&document, relative, &table, settings));
    }

    tracing::info!(issues = issues.len(), "Audit finished");
    Ok(issues)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::fs;

    use googletest::prelude::*;
    use rstest::*;
    use tempfile::TempDir;

    use super::*;

    const TRANSLATIONS: &str = r#"{
  "en": {
    "gallery_title": "Gallery",
    "view_gallery": "View Gallery"
  },
  "ka": {
    "gallery_title": "გალერეა"
  }
}"#;

    #[rstest]
    fn parity_reports_key_missing_for_a_language() {
        let table = TranslationTable::from_json_str(TRANSLATIONS, ".").unwrap();
        let ranges = locate_keys(TRANSLATIONS, ".");

        let issues = check_parity(&table, &ranges);

        assert_eq!(
            issues,
            vec![AuditIssue::MissingInLanguage {
                key: "view_gallery".to_string(),
                language: "ka".to_string(),
                defined_in: "en".to_string(),
                position: Some(SourcePosition { line: 3, character: 4 }),
            }]
        );
        assert_that!(issues[0].to_string(), contains_substring("at 4:5"));
    }

    #[rstest]
    fn parity_of_complete_table_is_clean() {
        let table = TranslationTable::from_entries([
            ("en", vec![("a", "A")]),
            ("ka", vec![("a", "ა")]),
        ]);

        assert!(check_parity(&table, &HashMap::new()).is_empty());
    }

    #[rstest]
    fn page_with_unknown_key() {
        let table = TranslationTable::from_json_str(TRANSLATIONS, ".").unwrap();
        let document =
            Document::parse("<h2 data-translate=\"gallery_title\">G</h2>\n<p data-translate-html=\"address_text\">x</p>")
                .unwrap();

        let issues = check_page(&document, Path::new("index.html"), &table, &SiteSettings::default());

        assert_eq!(
            issues,
            vec![AuditIssue::UnknownKey {
                key: "address_text".to_string(),
                page: PathBuf::from("index.html"),
                position: Some(SourcePosition { line: 1, character: 0 }),
            }]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn audit_site_combines_both_checks() {
        let site = TempDir::new().unwrap();
        fs::write(site.path().join("translations.json"), TRANSLATIONS).unwrap();
        fs::write(
            site.path().join("index.html"),
            r#"<section class="gallery"><div class="section-header"><h2>Gallery</h2><p>Moments</p></div></section>"#,
        )
        .unwrap();

        let issues = audit_site(site.path()).await.unwrap();

        // view_gallery for ka, and the tagged gallery_description.
        assert_that!(issues.len(), eq(2));
        assert!(issues.iter().any(|issue| matches!(
            issue,
            AuditIssue::UnknownKey { key, .. } if key == "gallery_description"
        )));
    }
}
