//! Page pattern matcher.

use std::path::{
    Path,
    PathBuf,
};

use globset::{
    Glob,
    GlobSet,
    GlobSetBuilder,
};

use super::SiteSettings;

#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("Invalid page include pattern '{pattern}': {source}")]
    InvalidIncludePattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidExcludePattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to build glob set: {0}")]
    GlobSetBuild(#[from] globset::Error),
}

/// Decides which files under the site root are pages to render.
#[derive(Debug, Clone)]
pub struct PageMatcher {
    /// Root the patterns are relative to
    site_root: PathBuf,
    /// A page must match one of these
    include_set: GlobSet,
    /// A page must match none of these
    exclude_set: GlobSet,
}

impl PageMatcher {
    pub fn new(site_root: PathBuf, settings: &SiteSettings) -> Result<Self, MatcherError> {
        let include_set = Self::build_glob_set(&settings.include_patterns, |pattern, source| {
            MatcherError::InvalidIncludePattern { pattern, source }
        })?;

        let exclude_set = Self::build_glob_set(&settings.exclude_patterns, |pattern, source| {
            MatcherError::InvalidExcludePattern { pattern, source }
        })?;

        Ok(Self { site_root, include_set, exclude_set })
    }

    /// Compiles patterns into one set; `make_error` labels a bad pattern.
    fn build_glob_set<F>(patterns: &[String], make_error: F) -> Result<GlobSet, MatcherError>
    where
        F: Fn(String, globset::Error) -> MatcherError,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| make_error(pattern.clone(), e))?;
            builder.add(glob);
        }
        Ok(builder.build()?)
    }

    #[must_use]
    pub fn site_root(&self) -> &Path {
        &self.site_root
    }

    /// The path must be absolute and under the site root.
    #[must_use]
    pub fn is_page(&self, absolute_path: &Path) -> bool {
        let Some(relative_path) = absolute_path.strip_prefix(&self.site_root).ok() else {
            return false;
        };

        self.is_page_relative(relative_path)
    }

    /// Returns true if the path matches `includePatterns` but not `excludePatterns`.
    #[must_use]
    pub fn is_page_relative(&self, relative_path: &Path) -> bool {
        self.include_set.is_match(relative_path) && !self.exclude_set.is_match(relative_path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn create_settings(include: &[&str], exclude: &[&str]) -> SiteSettings {
        SiteSettings {
            include_patterns: include.iter().copied().map(String::from).collect(),
            exclude_patterns: exclude.iter().copied().map(String::from).collect(),
            ..SiteSettings::default()
        }
    }

    #[rstest]
    #[case::root_page("/site/index.html", true)]
    #[case::nested_page("/site/rooms/deluxe.html", true)]
    #[case::stylesheet("/site/styles.css", false)]
    #[case::translations("/site/translations.json", false)]
    #[case::dependency("/site/node_modules/pkg/demo.html", false)]
    #[case::outside_site("/other/index.html", false)]
    fn is_page_with_default_patterns(#[case] path: &str, #[case] expected: bool) {
        let matcher =
            PageMatcher::new(PathBuf::from("/site"), &SiteSettings::default()).expect("valid patterns");

        assert_eq!(matcher.is_page(Path::new(path)), expected);
    }

    #[rstest]
    fn is_page_with_exclude_patterns() {
        let settings = create_settings(&["**/*.html"], &["dist/**", "**/drafts/**"]);
        let matcher = PageMatcher::new(PathBuf::from("/site"), &settings).expect("valid patterns");

        assert!(matcher.is_page_relative(Path::new("index.html")));
        assert!(!matcher.is_page_relative(Path::new("dist/index.html")));
        assert!(!matcher.is_page_relative(Path::new("blog/drafts/new.html")));
    }

    #[rstest]
    fn new_with_invalid_include_pattern() {
        let settings = create_settings(&["**/*.{html"], &[]);

        let result = PageMatcher::new(PathBuf::from("/site"), &settings);

        assert!(matches!(result, Err(MatcherError::InvalidIncludePattern { .. })));
    }

    #[rstest]
    fn new_with_invalid_exclude_pattern() {
        let settings = create_settings(&["**/*.html"], &["[invalid"]);

        let result = PageMatcher::new(PathBuf::from("/site"), &settings);

        assert!(matches!(result, Err(MatcherError::InvalidExcludePattern { .. })));
    }

    #[rstest]
    fn site_root_accessor() {
        let matcher =
            PageMatcher::new(PathBuf::from("/site"), &SiteSettings::default()).expect("valid patterns");

        assert_eq!(matcher.site_root(), Path::new("/site"));
    }
}
