//! Durable storage for the visitor's language choice.
//!
//! The browser keeps the choice in `localStorage`; here a [`PreferenceStore`]
//! plays that role. [`FilePreferenceStore`] keeps a small JSON object keyed the
//! same way `localStorage` would be (`{"preferred-language": "ka"}`).

use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::{
    Map,
    Value,
};
use thiserror::Error;

/// Storage key used when none is configured.
pub const DEFAULT_PREFERENCE_KEY: &str = "preferred-language";

#[derive(Error, Debug)]
pub enum PreferenceError {
    #[error("Failed to access preference storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("Preference storage is corrupt: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Preference storage lock was poisoned")]
    Poisoned,
}

/// Persists a single language code.
pub trait PreferenceStore: Send + Sync {
    /// Returns the stored language, `None` when nothing has been stored.
    fn load(&self) -> Result<Option<String>, PreferenceError>;

    fn store(&self, language: &str) -> Result<(), PreferenceError>;
}

/// Keeps the preference in process memory.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    /// Stored language code
    value: Mutex<Option<String>>,
}

impl MemoryPreferenceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `language`.
    #[must_use]
    pub fn with_language(language: impl Into<String>) -> Self {
        Self { value: Mutex::new(Some(language.into())) }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Option<String>, PreferenceError> {
        let value = self.value.lock().map_err(|_| PreferenceError::Poisoned)?;
        Ok(value.clone())
    }

    fn store(&self, language: &str) -> Result<(), PreferenceError> {
        let mut value = self.value.lock().map_err(|_| PreferenceError::Poisoned)?;
        *value = Some(language.to_string());
        Ok(())
    }
}

/// Keeps the preference in a JSON file next to other entries.
///
/// Other keys in the file are preserved on write.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    /// JSON file holding the preferences
    path: PathBuf,
    /// Entry that holds the language
    key: String,
}

impl FilePreferenceStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self { path: path.into(), key: key.into() }
    }

    /// Current file contents; a missing file is empty.
    fn read_entries(&self) -> Result<Map<String, Value>, PreferenceError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(entries) => Ok(entries),
            _ => {
                tracing::warn!(path = %self.path.display(), "Preference file is not an object; ignoring");
                Ok(Map::new())
            }
        }
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<Option<String>, PreferenceError> {
        let entries = self.read_entries()?;
        Ok(entries.get(&self.key).and_then(Value::as_str).map(ToString::to_string))
    }

    fn store(&self, language: &str) -> Result<(), PreferenceError> {
        let mut entries = self.read_entries()?;
        entries.insert(self.key.clone(), Value::String(language.to_string()));

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&Value::Object(entries))?;
        std::fs::write(&self.path, content)?;

        tracing::debug!(path = %self.path.display(), language, "Stored language preference");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;
    use tempfile::TempDir;

    use super::*;

    #[fixture]
    fn temp_dir() -> TempDir {
        TempDir::new().unwrap()
    }

    #[rstest]
    fn memory_store_starts_empty_then_remembers() {
        let store = MemoryPreferenceStore::new();

        assert_that!(store.load().unwrap(), none());

        store.store("ka").unwrap();

        assert_that!(store.load().unwrap(), some(eq("ka")));
    }

    #[rstest]
    fn file_store_missing_file_is_unset(temp_dir: TempDir) {
        let store = FilePreferenceStore::new(temp_dir.path().join("prefs.json"), "preferred-language");

        assert_that!(store.load().unwrap(), none());
    }

    #[rstest]
    fn file_store_round_trips_and_keeps_other_entries(temp_dir: TempDir) {
        let path = temp_dir.path().join("state").join("prefs.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"theme": "dark"}"#).unwrap();
        let store = FilePreferenceStore::new(&path, DEFAULT_PREFERENCE_KEY);

        store.store("ka").unwrap();

        assert_that!(store.load().unwrap(), some(eq("ka")));
        let saved: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["theme"], "dark");
        assert_eq!(saved["preferred-language"], "ka");
    }

    #[rstest]
    fn file_store_creates_parent_directories(temp_dir: TempDir) {
        let path = temp_dir.path().join("nested").join("dir").join("prefs.json");
        let store = FilePreferenceStore::new(&path, DEFAULT_PREFERENCE_KEY);

        store.store("en").unwrap();

        assert!(path.exists());
    }

    #[rstest]
    fn file_store_corrupt_file_is_error(temp_dir: TempDir) {
        let path = temp_dir.path().join("prefs.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = FilePreferenceStore::new(&path, DEFAULT_PREFERENCE_KEY);

        assert!(matches!(store.load(), Err(PreferenceError::Json(_))));
    }

    #[rstest]
    fn file_store_non_string_value_is_unset(temp_dir: TempDir) {
        let path = temp_dir.path().join("prefs.json");
        std::fs::write(&path, r#"{"preferred-language": 3}"#).unwrap();
        let store = FilePreferenceStore::new(&path, DEFAULT_PREFERENCE_KEY);

        assert_that!(store.load().unwrap(), none());
    }
}
