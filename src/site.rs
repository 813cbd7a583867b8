//! Static pre-rendering of a whole site.
//!
//! Every page matched by the settings is tagged once and then rendered by a
//! fresh [`LanguageEngine`] per language, into `<out>/<lang>/<page>`.

use std::path::{
    Path,
    PathBuf,
};
use std::sync::Arc;

use futures::StreamExt;
use ignore::WalkBuilder;
use thiserror::Error;

use crate::config::{
    ConfigError,
    ConfigManager,
    MatcherError,
    PageMatcher,
    SiteSettings,
};
use crate::dom::{
    Document,
    DomError,
    share,
};
use crate::engine::{
    EngineError,
    LanguageEngine,
    RenderReport,
};
use crate::input::preference::MemoryPreferenceStore;
use crate::input::translation::{
    FileSource,
    LoadError,
    PreloadedSource,
    TranslationSource,
    TranslationTable,
};
use crate::tagger::{
    AttributeTagger,
    TagReport,
};

#[derive(Error, Debug)]
pub enum SiteError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Matcher(#[from] MatcherError),

    #[error("Failed to load translations: {0}")]
    Load(#[from] LoadError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Failed to parse {path}: {source}")]
    Dom {
        path: PathBuf,
        #[source]
        source: DomError,
    },

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of rendering one page in one language.
#[derive(Debug, Clone)]
pub struct PageOutput {
    /// Page path relative to the site root
    pub page: PathBuf,
    pub language: String,
    pub output: PathBuf,
    /// `None` when the page was written in its authored language
    pub render: Option<RenderReport>,
}

#[derive(Debug, Default)]
pub struct SiteReport {
    pub outputs: Vec<PageOutput>,
    /// Tagging outcome per page
    pub tagging: Vec<(PathBuf, TagReport)>,
    /// Pages that could not be processed
    pub failures: Vec<SiteError>,
}

impl SiteReport {
    /// Number of missing translations across all outputs.
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.outputs.iter().filter_map(|o| o.render.as_ref()).map(|r| r.missing.len()).sum()
    }
}

/// Parallel page count: 80% of the CPU cores, at least one.
#[must_use]
pub fn default_concurrency() -> usize {
    (num_cpus::get() * 4 / 5).max(1)
}

/// Lists pages under `site_root`, honouring `.gitignore` and the settings' patterns.
pub fn find_pages(site_root: &Path, settings: &SiteSettings) -> Result<Vec<PathBuf>, SiteError> {
    walk_pages(site_root, settings, None)
}

/// `dir` spelled under `site_root`, when it is a subdirectory of the site.
fn inside_site(site_root: &Path, dir: &Path) -> Option<PathBuf> {
    let root = std::fs::canonicalize(site_root).ok()?;
    let dir = std::fs::canonicalize(dir).ok()?;
    let relative = dir.strip_prefix(&root).ok()?;
    (!relative.as_os_str().is_empty()).then(|| site_root.join(relative))
}

/// Like [`find_pages`], without descending into `skip_dir`.
fn walk_pages(
    site_root: &Path,
    settings: &SiteSettings,
    skip_dir: Option<&Path>,
) -> Result<Vec<PathBuf>, SiteError> {
    let matcher = PageMatcher::new(site_root.to_path_buf(), settings)?;
    let skipped = skip_dir.and_then(|dir| inside_site(site_root, dir));
    let mut pages = Vec::new();

    for result in WalkBuilder::new(site_root)
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .follow_links(false)
        .filter_entry(move |entry| skipped.as_deref() != Some(entry.path()))
        .build()
    {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(?err, "Failed to read directory entry");
                continue;
            }
        };

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        if matcher.is_page(entry.path()) {
            pages.push(entry.path().to_path_buf());
        }
    }

    pages.sort();
    Ok(pages)
}

/// Loads the site's translation table and checks it has the default language.
pub async fn load_table(config: &ConfigManager) -> Result<Arc<TranslationTable>, SiteError> {
    let settings = config.get_settings();
    let table = FileSource::new(config.translations_path(), settings.key_separator.clone())
        .load()
        .await?;
    if !table.supports(&settings.default_language) {
        return Err(LoadError::MissingDefaultLanguage(settings.default_language.clone()).into());
    }
    Ok(table)
}

/// Renders a site directory into per-language copies.
#[derive(Debug)]
pub struct SiteRenderer {
    /// Directory holding the pages
    site_root: PathBuf,
    /// Settings loaded for the site
    settings: SiteSettings,
    /// Translations shared by every page
    table: Arc<TranslationTable>,
    /// Tags each page before it is rendered
    tagger: AttributeTagger,
    /// Pages rendered at the same time
    concurrency: usize,
}

impl SiteRenderer {
    /// Loads settings and translations for `site_root`.
    pub async fn open(site_root: &Path) -> Result<Self, SiteError> {
        let mut config = ConfigManager::new();
        config.load_settings(Some(site_root.to_path_buf()))?;
        let table = load_table(&config).await?;
        Ok(Self::new(site_root.to_path_buf(), config.get_settings().clone(), table))
    }

    #[must_use]
    pub fn new(site_root: PathBuf, settings: SiteSettings, table: Arc<TranslationTable>) -> Self {
        let tagger = AttributeTagger::new(
            settings.effective_tag_rules(),
            settings.marker_attribute.clone(),
            settings.html_marker_attribute.clone(),
        );
        Self { site_root, settings, table, tagger, concurrency: default_concurrency() }
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = if concurrency == 0 { 1 } else { concurrency };
        self
    }

    #[must_use]
    pub fn table(&self) -> &TranslationTable {
        &self.table
    }

    /// Renders every page in `languages` (all table languages when empty).
    ///
    /// Unsupported languages are rejected before anything is written. A page
    /// that fails is recorded in the report and does not stop the others.
    pub async fn render(&self, out_dir: &Path, languages: &[String]) -> Result<SiteReport, SiteError> {
        let languages: Vec<String> = if languages.is_empty() {
            self.table.languages().map(ToString::to_string).collect()
        } else {
            languages.to_vec()
        };
        if let Some(unsupported) = languages.iter().find(|l| !self.table.supports(l)) {
            return Err(EngineError::UnsupportedLanguage(unsupported.clone()).into());
        }

        // Output written inside the site must not be read back as pages.
        let pages = walk_pages(&self.site_root, &self.settings, Some(out_dir))?;
        tracing::info!(
            pages = pages.len(),
            languages = ?languages,
            out_dir = %out_dir.display(),
            "Rendering site"
        );

        let results: Vec<_> = futures::stream::iter(pages.iter())
            .map(|page| self.render_page(page, out_dir, &languages))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = SiteReport::default();
        for result in results {
            match result {
                Ok((page, tagging, outputs)) => {
                    report.tagging.push((page, tagging));
                    report.outputs.extend(outputs);
                }
                Err(error) => {
                    tracing::warn!(%error, "Skipping page");
                    report.failures.push(error);
                }
            }
        }
        report.outputs.sort_by(|a, b| (&a.page, &a.language).cmp(&(&b.page, &b.language)));
        report.tagging.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(report)
    }

    /// Tags one page and renders it in every language.
    async fn render_page(
        &self,
        page: &Path,
        out_dir: &Path,
        languages: &[String],
    ) -> Result<(PathBuf, TagReport, Vec<PageOutput>), SiteError> {
        let relative = page.strip_prefix(&self.site_root).unwrap_or(page).to_path_buf();
        let source = tokio::fs::read_to_string(page)
            .await
            .map_err(|source| SiteError::Io { path: page.to_path_buf(), source })?;
        let mut document = Document::parse(&source)
            .map_err(|source| SiteError::Dom { path: page.to_path_buf(), source })?;
        let tagging = self.tagger.run(&mut document);

        let mut outputs = Vec::with_capacity(languages.len());
        for language in languages {
            let (html, render) = self.render_language(&document, language).await?;
            let output = out_dir.join(language).join(&relative);
            if let Some(parent) = output.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| SiteError::Io { path: parent.to_path_buf(), source })?;
            }
            tokio::fs::write(&output, html)
                .await
                .map_err(|source| SiteError::Io { path: output.clone(), source })?;
            tracing::debug!(page = %relative.display(), language = %language, "Wrote page");
            outputs.push(PageOutput { page: relative.clone(), language: language.clone(), output, render });
        }

        Ok((relative, tagging, outputs))
    }

    /// Renders a tagged document as a visitor who prefers `language` would see it.
    async fn render_language(
        &self,
        document: &Document,
        language: &str,
    ) -> Result<(String, Option<RenderReport>), SiteError> {
        let shared = share(document.clone());
        let engine = LanguageEngine::new(
            Arc::clone(&shared),
            Arc::new(MemoryPreferenceStore::with_language(language)),
            &self.settings,
        )?;
        let render = engine.initialize(&PreloadedSource(Arc::clone(&self.table))).await?;
        let html = shared.lock().await.to_html();
        Ok((html, render))
    }
}
