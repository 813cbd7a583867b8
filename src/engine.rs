//! 言語エンジン
//!
//! Tracks the active language, loads the translation table and re-renders
//! the shared document whenever the language changes.
//!
//! # ロック順序
//!
//! 複数のロックを同時に取得する場合は、以下の順序を厳守してください：
//! 1. `document`
//! 2. `status`

pub mod render;
pub mod special;
pub mod state;
pub mod toggle;
pub mod transition;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{
    Mutex,
    MutexGuard,
};
use tokio::task::JoinHandle;

pub use render::{
    LanguageView,
    MissingKey,
    RenderReport,
    Renderer,
};
pub use special::SpecialRenderer;
pub use state::EngineState;
pub use toggle::LanguageToggle;
pub use transition::{
    DelayTransition,
    ImmediateTransition,
    Transition,
};

use crate::config::SiteSettings;
use crate::dom::{
    Document,
    SelectorError,
    SharedDocument,
};
use crate::input::preference::PreferenceStore;
use crate::input::translation::{
    LoadError,
    TranslationSource,
    TranslationTable,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The loaded table has no entries for the requested language.
    #[error("Language not supported: {0}")]
    UnsupportedLanguage(String),

    #[error("No translations are loaded")]
    NoTranslations,

    #[error("Invalid selector in settings: {0}")]
    Selector(#[from] SelectorError),
}

/// Mutable engine bookkeeping.
#[derive(Debug)]
struct Status {
    /// Lifecycle state
    state: EngineState,
    /// Language of the last committed render
    current: String,
    /// Loaded translations, `None` before a successful load
    table: Option<Arc<TranslationTable>>,
    /// Switches begun but not yet finished
    pending: usize,
}

/// The i18n engine of one document.
///
/// Construct once and share through `Arc`.
pub struct LanguageEngine {
    /// Document the engine renders into
    document: SharedDocument,
    /// Where the chosen language is remembered
    preferences: Arc<dyn PreferenceStore>,
    /// Render pass for bound nodes
    renderer: Renderer,
    /// Toggle affordance and switching class
    toggle: LanguageToggle,
    /// Language the markup is authored in
    default_language: String,
    /// Transition from the site settings
    transition: DelayTransition,
    /// Mutable bookkeeping, locked after `document`
    status: Mutex<Status>,
}

impl std::fmt::Debug for LanguageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageEngine")
            .field("default_language", &self.default_language)
            .field("transition", &self.transition)
            .finish_non_exhaustive()
    }
}

impl LanguageEngine {
    /// Creates an engine in the `Uninitialized` state.
    pub fn new(
        document: SharedDocument,
        preferences: Arc<dyn PreferenceStore>,
        settings: &SiteSettings,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            document,
            preferences,
            renderer: Renderer::new(settings)?,
            toggle: LanguageToggle::new(&settings.toggle)?,
            default_language: settings.default_language.clone(),
            transition: DelayTransition::from(settings.transition),
            status: Mutex::new(Status {
                state: EngineState::Uninitialized,
                current: settings.default_language.clone(),
                table: None,
                pending: 0,
            }),
        })
    }

    /// Locks `document` then `status`, in that order.
    async fn lock_document_and_status(&self) -> (MutexGuard<'_, Document>, MutexGuard<'_, Status>) {
        let document = self.document.lock().await;
        let status = self.status.lock().await;
        (document, status)
    }

    #[must_use]
    pub fn document(&self) -> SharedDocument {
        Arc::clone(&self.document)
    }

    /// The transition configured in the site settings.
    #[must_use]
    pub const fn transition(&self) -> DelayTransition {
        self.transition
    }

    #[must_use]
    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    pub async fn state(&self) -> EngineState {
        self.status.lock().await.state.clone()
    }

    pub async fn current_language(&self) -> String {
        self.status.lock().await.current.clone()
    }

    pub async fn table(&self) -> Option<Arc<TranslationTable>> {
        self.status.lock().await.table.clone()
    }

    /// Current-language lookup; falls back to the key itself.
    pub async fn translate(&self, key: &str) -> String {
        let status = self.status.lock().await;
        status
            .table
            .as_ref()
            .and_then(|table| table.get(&status.current, key))
            .map_or_else(|| key.to_string(), ToString::to_string)
    }

    /// Loads translations and renders the preferred language.
    ///
    /// On a load failure the engine settles in `DegradedReady(default)` and the
    /// document is left as authored. Returns the report of the initial render,
    /// if one was needed.
    pub async fn initialize<S>(&self, source: &S) -> Result<Option<RenderReport>, LoadError>
    where
        S: TranslationSource + Sync,
    {
        self.status.lock().await.state = EngineState::Loading;

        let preferred = match self.preferences.load() {
            Ok(preferred) => preferred,
            Err(error) => {
                tracing::warn!(%error, "Failed to read language preference");
                None
            }
        };

        let loaded = source.load().await.and_then(|table| {
            if table.supports(&self.default_language) {
                Ok(table)
            } else {
                Err(LoadError::MissingDefaultLanguage(self.default_language.clone()))
            }
        });

        let table = match loaded {
            Ok(table) => table,
            Err(error) => {
                tracing::error!(%error, "Failed to load translations");
                let mut status = self.status.lock().await;
                status.current.clone_from(&self.default_language);
                status.state = EngineState::DegradedReady(self.default_language.clone());
                return Err(error);
            }
        };

        let language = preferred
            .filter(|language| {
                let supported = table.supports(language);
                if !supported {
                    tracing::debug!(language = %language, "Ignoring unsupported stored preference");
                }
                supported
            })
            .unwrap_or_else(|| self.default_language.clone());

        let (mut document, mut status) = self.lock_document_and_status().await;
        status.table = Some(Arc::clone(&table));
        let report = if language == self.default_language {
            self.show_toggle(&mut document, &table, &language);
            None
        } else {
            Some(self.apply(&mut document, &table, &language))
        };
        status.current.clone_from(&language);
        status.state = EngineState::Ready(language.clone());

        tracing::info!(language = %language, languages = ?table.languages().collect::<Vec<_>>(), "Language engine ready");
        Ok(report)
    }

    /// Runs [`Self::initialize`] on a separate task.
    pub fn spawn_initialize<S>(
        self: &Arc<Self>,
        source: S,
    ) -> JoinHandle<Result<Option<RenderReport>, LoadError>>
    where
        S: TranslationSource + Send + Sync + 'static,
    {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.initialize(&source).await })
    }

    /// Switches to `target` with the switching visual state around the render.
    pub async fn switch_language<T>(
        &self,
        target: &str,
        transition: &T,
    ) -> Result<RenderReport, EngineError>
    where
        T: Transition + Sync,
    {
        self.begin_switch(target).await?;
        transition.entered().await;
        let result = self.commit_switch(target).await;
        transition.exited().await;
        self.finish_switch().await;
        result
    }

    /// Switches to the language after the current one.
    pub async fn toggle_language<T>(&self, transition: &T) -> Result<RenderReport, EngineError>
    where
        T: Transition + Sync,
    {
        let target = {
            let status = self.status.lock().await;
            let table = status.table.as_ref().ok_or(EngineError::NoTranslations)?;
            table.next_language(&status.current).ok_or(EngineError::NoTranslations)?.to_string()
        };
        self.switch_language(&target, transition).await
    }

    /// Enters the switching visual state.
    ///
    /// Rejects languages the loaded table does not contain; the engine is then
    /// left exactly as it was.
    pub async fn begin_switch(&self, target: &str) -> Result<(), EngineError> {
        let (mut document, mut status) = self.lock_document_and_status().await;
        if !status.table.as_ref().is_some_and(|table| table.supports(target)) {
            tracing::warn!(language = target, "Language not supported");
            return Err(EngineError::UnsupportedLanguage(target.to_string()));
        }

        status.pending += 1;
        status.state = EngineState::Switching { from: status.current.clone(), to: target.to_string() };
        self.toggle.set_switching(&mut document, true);
        tracing::debug!(language = target, pending = status.pending, "Switch started");
        Ok(())
    }

    /// Persists `target` and renders it. The last commit wins.
    pub async fn commit_switch(&self, target: &str) -> Result<RenderReport, EngineError> {
        let (mut document, mut status) = self.lock_document_and_status().await;
        let table = status
            .table
            .clone()
            .filter(|table| table.supports(target))
            .ok_or_else(|| EngineError::UnsupportedLanguage(target.to_string()))?;

        if let Err(error) = self.preferences.store(target) {
            tracing::warn!(%error, language = target, "Failed to persist language preference");
        }
        let report = self.apply(&mut document, &table, target);
        target.clone_into(&mut status.current);
        if status.pending == 0 {
            status.state = EngineState::Ready(target.to_string());
        }
        Ok(report)
    }

    /// Leaves the switching visual state once no switch is in flight.
    pub async fn finish_switch(&self) {
        let (mut document, mut status) = self.lock_document_and_status().await;
        status.pending = status.pending.saturating_sub(1);
        if status.pending > 0 {
            return;
        }
        self.toggle.set_switching(&mut document, false);
        status.state = EngineState::Ready(status.current.clone());
        tracing::debug!(language = %status.current, "Switch finished");
    }

    /// Sets `<html lang>`, renders and updates the toggle.
    fn apply(&self, document: &mut Document, table: &TranslationTable, language: &str) -> RenderReport {
        let Some(entries) = table.language(language) else {
            return RenderReport::new(language);
        };
        if let Some(html) = document.document_element() {
            document.set_attribute(html, "lang", language);
        }
        let report = self.renderer.render_all(document, &LanguageView::new(entries, language));
        self.show_toggle(document, table, language);
        tracing::info!(
            language,
            applied = report.applied,
            missing = report.missing.len(),
            "Rendered language"
        );
        report
    }

    /// Points the toggle at the language after `current`.
    fn show_toggle(&self, document: &mut Document, table: &TranslationTable, current: &str) {
        if let Some(next) = table.next_language(current) {
            self.toggle.show_target(document, next);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;
    use crate::dom::share;
    use crate::input::preference::MemoryPreferenceStore;
    use crate::input::translation::PreloadedSource;

    const PAGE: &str = r#"<html lang="en"><body><button id="language-toggle" title="Switch to Georgian"><span class="language-flag">🇬🇪</span><span class="language-text">ქართული</span></button><h2 data-translate="gallery_title">Gallery</h2></body></html>"#;

    fn source() -> PreloadedSource {
        PreloadedSource(Arc::new(TranslationTable::from_entries([
            ("en", vec![("gallery_title", "Gallery")]),
            ("ka", vec![("gallery_title", "გალერეა")]),
        ])))
    }

    fn engine(store: Arc<MemoryPreferenceStore>) -> LanguageEngine {
        let document = share(Document::parse(PAGE).unwrap());
        LanguageEngine::new(document, store, &SiteSettings::default()).unwrap()
    }

    async fn heading(engine: &LanguageEngine) -> String {
        let document = engine.document();
        let document = document.lock().await;
        let h2 = document.first_element_named("h2").unwrap();
        document.text_content(h2)
    }

    #[tokio::test]
    async fn new_engine_is_uninitialized() {
        let engine = engine(Arc::new(MemoryPreferenceStore::new()));

        assert_eq!(engine.state().await, EngineState::Uninitialized);
        assert_eq!(engine.current_language().await, "en");
        assert_eq!(engine.translate("gallery_title").await, "gallery_title");
    }

    #[tokio::test]
    async fn initialize_with_default_language_does_not_render() {
        let engine = engine(Arc::new(MemoryPreferenceStore::new()));

        let report = engine.initialize(&source()).await.unwrap();

        assert!(report.is_none());
        assert_eq!(engine.state().await, EngineState::Ready("en".to_string()));
        assert_eq!(engine.document().lock().await.to_html(), PAGE);
    }

    #[tokio::test]
    async fn initialize_renders_stored_preference() {
        let engine = engine(Arc::new(MemoryPreferenceStore::with_language("ka")));

        let report = engine.initialize(&source()).await.unwrap().unwrap();

        assert_that!(report.applied, eq(1));
        assert_eq!(heading(&engine).await, "გალერეა");
        assert_eq!(engine.translate("gallery_title").await, "გალერეა");
    }

    #[tokio::test]
    async fn initialize_ignores_unsupported_preference() {
        let engine = engine(Arc::new(MemoryPreferenceStore::with_language("fr")));

        engine.initialize(&source()).await.unwrap();

        assert_eq!(engine.state().await, EngineState::Ready("en".to_string()));
    }

    #[tokio::test]
    async fn initialize_without_default_language_degrades() {
        let engine = engine(Arc::new(MemoryPreferenceStore::with_language("ka")));
        let source =
            PreloadedSource(Arc::new(TranslationTable::from_entries([("ka", vec![("a", "b")])])));

        let result = engine.initialize(&source).await;

        assert!(matches!(result, Err(LoadError::MissingDefaultLanguage(_))));
        assert_eq!(engine.state().await, EngineState::DegradedReady("en".to_string()));
        assert_eq!(engine.document().lock().await.to_html(), PAGE);
    }

    #[tokio::test]
    async fn switch_persists_and_renders() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let engine = engine(Arc::clone(&store));
        engine.initialize(&source()).await.unwrap();

        engine.switch_language("ka", &ImmediateTransition).await.unwrap();

        assert_eq!(heading(&engine).await, "გალერეა");
        assert_that!(store.load().unwrap(), some(eq("ka")));
        let document = engine.document();
        let document = document.lock().await;
        let html = document.document_element().unwrap();
        assert_that!(document.attribute(html, "lang"), some(eq("ka")));
        let toggle = document.element_by_id("language-toggle").unwrap();
        assert_that!(document.attribute(toggle, "title"), some(eq("Switch to English")));
        assert_that!(document.has_class(toggle, "language-switching"), eq(false));
    }

    #[tokio::test]
    async fn switch_to_unknown_language_changes_nothing() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let engine = engine(Arc::clone(&store));
        engine.initialize(&source()).await.unwrap();

        let result = engine.switch_language("fr", &ImmediateTransition).await;

        assert_eq!(result, Err(EngineError::UnsupportedLanguage("fr".to_string())));
        assert_eq!(engine.state().await, EngineState::Ready("en".to_string()));
        assert_that!(store.load().unwrap(), none());
        assert_eq!(engine.document().lock().await.to_html(), PAGE);
    }

    #[tokio::test]
    async fn toggle_cycles_languages() {
        let engine = engine(Arc::new(MemoryPreferenceStore::new()));
        engine.initialize(&source()).await.unwrap();

        engine.toggle_language(&ImmediateTransition).await.unwrap();
        assert_eq!(engine.current_language().await, "ka");

        engine.toggle_language(&ImmediateTransition).await.unwrap();
        assert_eq!(engine.current_language().await, "en");
        assert_eq!(heading(&engine).await, "Gallery");
    }

    #[tokio::test]
    async fn toggle_before_load_is_rejected() {
        let engine = engine(Arc::new(MemoryPreferenceStore::new()));

        let result = engine.toggle_language(&ImmediateTransition).await;

        assert_eq!(result, Err(EngineError::NoTranslations));
    }

    #[tokio::test]
    async fn switching_class_stays_until_every_switch_finishes() {
        let engine = engine(Arc::new(MemoryPreferenceStore::new()));
        engine.initialize(&source()).await.unwrap();

        engine.begin_switch("ka").await.unwrap();
        engine.begin_switch("en").await.unwrap();
        engine.commit_switch("ka").await.unwrap();
        engine.commit_switch("en").await.unwrap();
        engine.finish_switch().await;

        {
            let document = engine.document();
            let document = document.lock().await;
            assert!(document.has_class(document.body().unwrap(), "language-switching"));
        }
        assert!(matches!(engine.state().await, EngineState::Switching { .. }));

        engine.finish_switch().await;

        let document = engine.document();
        let document = document.lock().await;
        assert!(!document.has_class(document.body().unwrap(), "language-switching"));
        drop(document);
        assert_eq!(engine.state().await, EngineState::Ready("en".to_string()));
    }

    #[tokio::test]
    async fn spawn_initialize_runs_in_background() {
        let engine = Arc::new(engine(Arc::new(MemoryPreferenceStore::with_language("ka"))));

        let handle = engine.spawn_initialize(source());
        let report = handle.await.unwrap().unwrap();

        assert!(report.is_some());
        assert_eq!(engine.current_language().await, "ka");
    }
}
