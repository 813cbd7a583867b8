//! Translation table input.
//!
//! The translation resource is a single JSON document whose top-level keys are
//! language codes:
//!
//! ```json
//! { "en": { "book_your_stay": "Book Your Stay" },
//!   "ka": { "book_your_stay": "დაჯავშნეთ ახლავე" } }
//! ```
//!
//! Per-language values may be nested; they are flattened with the configured
//! key separator.

use std::collections::{
    BTreeMap,
    HashMap,
};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use unic_langid::LanguageIdentifier;

use crate::types::SourceRange;

/// Failure to obtain a usable translation table.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read translation resource: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse translation resource: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Translation resource must be an object keyed by language code")]
    InvalidShape,

    #[error("Translation resource has no entries for default language '{0}'")]
    MissingDefaultLanguage(String),
}

/// Key → value map of one language.
pub type LanguageTable = HashMap<String, String>;

/// Language code → translations. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationTable {
    /// Ordered by language code.
    languages: BTreeMap<String, LanguageTable>,
}

impl TranslationTable {
    /// Parses the translation resource.
    ///
    /// Entries under malformed language codes are skipped with a warning.
    pub fn from_json_str(text: &str, key_separator: &str) -> Result<Self, LoadError> {
        let json: Value = serde_json::from_str(text)?;
        Self::from_json(&json, key_separator)
    }

    pub fn from_json(json: &Value, key_separator: &str) -> Result<Self, LoadError> {
        let Value::Object(root) = json else {
            return Err(LoadError::InvalidShape);
        };

        let mut languages = BTreeMap::new();
        for (code, entries) in root {
            if !is_valid_language_code(code) {
                tracing::warn!(language = %code, "Skipping malformed language code");
                continue;
            }
            if !entries.is_object() {
                tracing::warn!(language = %code, "Skipping language whose entries are not an object");
                continue;
            }
            languages.insert(code.clone(), flatten_json(entries, key_separator));
        }

        Ok(Self { languages })
    }

    /// Builds a table from literal entries.
    #[must_use]
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = (&'a str, Vec<(&'a str, &'a str)>)>,
    ) -> Self {
        let languages = entries
            .into_iter()
            .map(|(code, pairs)| {
                let table =
                    pairs.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
                (code.to_string(), table)
            })
            .collect();
        Self { languages }
    }

    #[must_use]
    pub fn get(&self, language: &str, key: &str) -> Option<&str> {
        self.languages.get(language)?.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn supports(&self, language: &str) -> bool {
        self.languages.contains_key(language)
    }

    /// Language codes in ascending order.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }

    #[must_use]
    pub fn language(&self, language: &str) -> Option<&LanguageTable> {
        self.languages.get(language)
    }

    /// The language following `current` in code order, wrapping around.
    #[must_use]
    pub fn next_language(&self, current: &str) -> Option<&str> {
        let codes: Vec<&str> = self.languages().collect();
        let next = codes
            .iter()
            .position(|code| *code == current)
            .and_then(|index| codes.get(index + 1).or_else(|| codes.first()))
            .or_else(|| codes.first())?;
        Some(*next)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

/// Accepts BCP 47 language identifiers (`en`, `ka`, `en-US`, `sr-Cyrl-RS`).
#[must_use]
pub fn is_valid_language_code(code: &str) -> bool {
    !code.is_empty() && code.parse::<LanguageIdentifier>().is_ok()
}

/// Flattens a nested JSON object into a separator-joined key map.
///
/// Arrays become `key[i]`; non-string leaves are stringified.
///
/// ```
/// use serde_json::json;
/// use site_i18n::input::translation::flatten_json;
///
/// let flat = flatten_json(&json!({ "form": { "email": "Email" } }), ".");
/// assert_eq!(flat.get("form.email").map(String::as_str), Some("Email"));
/// ```
#[must_use]
pub fn flatten_json(json: &Value, separator: &str) -> LanguageTable {
    let mut result = HashMap::new();
    flatten_into(json, separator, None, &mut result);
    result
}

/// Flattens nested objects into `out` under joined keys.
fn flatten_into(json: &Value, separator: &str, prefix: Option<&str>, out: &mut LanguageTable) {
    match json {
        Value::Object(map) => {
            for (key, value) in map {
                let full_key =
                    prefix.map_or_else(|| key.clone(), |p| format!("{p}{separator}{key}"));
                flatten_into(value, separator, Some(&full_key), out);
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                let full_key =
                    prefix.map_or_else(|| format!("[{index}]"), |p| format!("{p}[{index}]"));
                flatten_into(value, separator, Some(&full_key), out);
            }
        }
        Value::String(s) => {
            if let Some(key) = prefix {
                out.insert(key.to_string(), s.clone());
            }
        }
        other => {
            if let Some(key) = prefix {
                out.insert(key.to_string(), other.to_string());
            }
        }
    }
}

/// Locates every leaf key of the resource in its source text.
///
/// Keys are returned language-qualified, e.g. `ka` + `book_your_stay` →
/// `("ka", "book_your_stay")`. Used to point diagnostics at the JSON.
#[must_use]
pub fn locate_keys(json_text: &str, separator: &str) -> HashMap<(String, String), SourceRange> {
    let mut ranges = HashMap::new();

    let mut parser = tree_sitter::Parser::new();
    if parser.set_language(&tree_sitter_json::LANGUAGE.into()).is_err() {
        tracing::warn!("Failed to set tree-sitter-json language");
        return ranges;
    }
    let Some(tree) = parser.parse(json_text, None) else {
        tracing::warn!("Failed to parse translation JSON with tree-sitter");
        return ranges;
    };

    let source = json_text.as_bytes();
    let root = tree.root_node();
    let mut walker = root.walk();
    let Some(object) = root.children(&mut walker).find(|n| n.kind() == "object") else {
        return ranges;
    };

    let mut object_walker = object.walk();
    for pair in object.children(&mut object_walker).filter(|n| n.kind() == "pair") {
        let (Some(lang_node), Some(value)) =
            (pair.child_by_field_name("key"), pair.child_by_field_name("value"))
        else {
            continue;
        };
        let Some(language) = string_content(lang_node, source) else {
            continue;
        };
        let mut keys = HashMap::new();
        collect_leaf_keys(value, source, separator, None, &mut keys);
        for (key, range) in keys {
            ranges.insert((language.clone(), key), range);
        }
    }

    ranges
}

/// Records the range of every leaf key below `node`.
fn collect_leaf_keys(
    node: tree_sitter::Node<'_>,
    source: &[u8],
    separator: &str,
    prefix: Option<&str>,
    out: &mut HashMap<String, SourceRange>,
) {
    let mut walker = node.walk();
    match node.kind() {
        "object" => {
            for pair in node.children(&mut walker).filter(|n| n.kind() == "pair") {
                let (Some(key_node), Some(value)) =
                    (pair.child_by_field_name("key"), pair.child_by_field_name("value"))
                else {
                    continue;
                };
                let Some(key) = string_content(key_node, source) else {
                    continue;
                };
                let full_key =
                    prefix.map_or_else(|| key.clone(), |p| format!("{p}{separator}{key}"));
                if matches!(value.kind(), "object" | "array") {
                    collect_leaf_keys(value, source, separator, Some(&full_key), out);
                } else {
                    out.insert(full_key, SourceRange::from_node(&key_node));
                }
            }
        }
        "array" => {
            let elements = node.children(&mut walker).filter(|n| n.is_named());
            for (index, element) in elements.enumerate() {
                let full_key =
                    prefix.map_or_else(|| format!("[{index}]"), |p| format!("{p}[{index}]"));
                if matches!(element.kind(), "object" | "array") {
                    collect_leaf_keys(element, source, separator, Some(&full_key), out);
                } else {
                    out.insert(full_key, SourceRange::from_node(&element));
                }
            }
        }
        _ => {}
    }
}

/// Text of a JSON string node without its quotes.
fn string_content(node: tree_sitter::Node<'_>, source: &[u8]) -> Option<String> {
    let text = node.utf8_text(source).ok()?;
    Some(text.trim_matches('"').to_string())
}

/// Where the language engine gets its translation table from.
pub trait TranslationSource {
    /// Loads the table. Called once per engine.
    fn load(&self) -> impl Future<Output = Result<Arc<TranslationTable>, LoadError>> + Send;
}

/// Reads the resource from a file.
#[derive(Debug, Clone)]
pub struct FileSource {
    /// Path of the translation JSON
    path: PathBuf,
    /// Separator used to flatten nested keys
    key_separator: String,
}

impl FileSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, key_separator: impl Into<String>) -> Self {
        Self { path: path.into(), key_separator: key_separator.into() }
    }
}

impl TranslationSource for FileSource {
    async fn load(&self) -> Result<Arc<TranslationTable>, LoadError> {
        tracing::debug!(path = %self.path.display(), "Loading translations");
        let text = tokio::fs::read_to_string(&self.path).await?;
        let table = TranslationTable::from_json_str(&text, &self.key_separator)?;
        Ok(Arc::new(table))
    }
}

/// A table that is already in memory, shared between engines.
#[derive(Debug, Clone)]
pub struct PreloadedSource(pub Arc<TranslationTable>);

impl TranslationSource for PreloadedSource {
    async fn load(&self) -> Result<Arc<TranslationTable>, LoadError> {
        Ok(Arc::clone(&self.0))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    const RESOURCE: &str = r#"{
  "en": {
    "book_your_stay": "Book Your Stay",
    "form": { "email": "Email Address" }
  },
  "ka": {
    "book_your_stay": "დაჯავშნეთ ახლავე"
  }
}"#;

    #[googletest::test]
    fn test_from_json_str_flattens_per_language() {
        let table = TranslationTable::from_json_str(RESOURCE, ".").unwrap();

        expect_that!(table.get("en", "book_your_stay"), some(eq("Book Your Stay")));
        expect_that!(table.get("en", "form.email"), some(eq("Email Address")));
        expect_that!(table.get("ka", "book_your_stay"), some(eq("დაჯავშნეთ ახლავე")));
        expect_that!(table.get("ka", "form.email"), none());
        assert_eq!(table.languages().collect::<Vec<_>>(), vec!["en", "ka"]);
    }

    #[googletest::test]
    fn test_malformed_language_codes_are_skipped() {
        let json = json!({
            "en": { "a": "A" },
            "not a language!": { "a": "?" },
            "ka": "not an object"
        });

        let table = TranslationTable::from_json(&json, ".").unwrap();

        assert_eq!(table.languages().collect::<Vec<_>>(), vec!["en"]);
    }

    #[rstest]
    #[case::array(json!(["en", "ka"]))]
    #[case::string(json!("en"))]
    fn test_non_object_resource_is_invalid(#[case] json: Value) {
        let result = TranslationTable::from_json(&json, ".");

        assert!(matches!(result, Err(LoadError::InvalidShape)));
    }

    #[rstest]
    fn test_malformed_json_is_a_load_error() {
        let result = TranslationTable::from_json_str("{ \"en\": ", ".");

        assert!(matches!(result, Err(LoadError::Json(_))));
    }

    #[rstest]
    #[case::en("en", true)]
    #[case::ka("ka", true)]
    #[case::region("en-US", true)]
    #[case::script("sr-Cyrl-RS", true)]
    #[case::empty("", false)]
    #[case::spaces("e n", false)]
    #[case::too_long("englishlanguage", false)]
    fn test_is_valid_language_code(#[case] code: &str, #[case] expected: bool) {
        assert_eq!(is_valid_language_code(code), expected);
    }

    #[rstest]
    #[case::wraps("ka", Some("en"))]
    #[case::advances("en", Some("fr"))]
    #[case::unknown_starts_over("de", Some("en"))]
    fn test_next_language(#[case] current: &str, #[case] expected: Option<&str>) {
        let table = TranslationTable::from_entries([
            ("en", vec![]),
            ("fr", vec![]),
            ("ka", vec![]),
        ]);

        assert_eq!(table.next_language(current), expected);
    }

    #[googletest::test]
    fn test_flatten_json_arrays_and_scalars() {
        let flat = flatten_json(&json!({ "items": ["a", "b"], "count": 3, "on": true }), ".");

        expect_that!(flat.get("items[0]").map(String::as_str), some(eq("a")));
        expect_that!(flat.get("items[1]").map(String::as_str), some(eq("b")));
        expect_that!(flat.get("count").map(String::as_str), some(eq("3")));
        expect_that!(flat.get("on").map(String::as_str), some(eq("true")));
    }

    #[googletest::test]
    fn test_locate_keys_points_at_key_in_language_block() {
        let ranges = locate_keys(RESOURCE, ".");

        let range = ranges.get(&("ka".to_string(), "book_your_stay".to_string()));
        expect_that!(range.map(|r| r.start.line), some(eq(7)));
        expect_that!(range.map(|r| r.start.character), some(eq(4)));
        expect_true!(ranges.contains_key(&("en".to_string(), "form.email".to_string())));
        expect_false!(ranges.contains_key(&("en".to_string(), "form".to_string())));
    }

    #[tokio::test]
    async fn test_file_source_loads_table() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("translations.json");
        std::fs::write(&path, RESOURCE).unwrap();

        let table = FileSource::new(&path, ".").load().await.unwrap();

        assert_eq!(table.get("ka", "book_your_stay"), Some("დაჯავშნეთ ახლავე"));
    }

    #[tokio::test]
    async fn test_file_source_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();

        let result = FileSource::new(temp_dir.path().join("missing.json"), ".").load().await;

        assert!(matches!(result, Err(LoadError::Io(_))));
    }
}
