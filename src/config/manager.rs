//! サイト設定の保持

use std::path::{
    Path,
    PathBuf,
};

use super::{
    ConfigError,
    SiteSettings,
    loader,
};

/// サイトごとに読み込んだ設定を保持する
#[derive(Default, Debug, Clone)]
pub struct ConfigManager {
    /// 現在の設定
    current_settings: SiteSettings,

    /// サイトのルートパス
    site_root: Option<PathBuf>,
}

impl ConfigManager {
    #[must_use]
    pub fn new() -> Self {
        Self { current_settings: SiteSettings::default(), site_root: None }
    }

    /// `site_root` の `.site-i18n.json` を読み込む。ファイルが無ければデフォルト値。
    ///
    /// 検証に失敗した場合は以前の設定を保持する。
    pub fn load_settings(&mut self, site_root: Option<PathBuf>) -> Result<(), ConfigError> {
        let settings = match &site_root {
            Some(root) => loader::load_from_site(root)?.unwrap_or_else(|| {
                tracing::debug!(site = %root.display(), "No site config, using defaults");
                SiteSettings::default()
            }),
            None => SiteSettings::default(),
        };
        settings.validate().map_err(ConfigError::ValidationErrors)?;

        tracing::debug!(
            default_language = %settings.default_language,
            translations = %settings.translations_file,
            "Site settings loaded"
        );
        self.current_settings = settings;
        self.site_root = site_root;

        Ok(())
    }

    #[must_use]
    pub const fn get_settings(&self) -> &SiteSettings {
        &self.current_settings
    }

    #[must_use]
    pub const fn site_root(&self) -> Option<&PathBuf> {
        self.site_root.as_ref()
    }

    /// 翻訳ファイルのパス（サイトルートからの相対パスを解決）
    #[must_use]
    pub fn translations_path(&self) -> PathBuf {
        let file = Path::new(&self.current_settings.translations_file);
        match &self.site_root {
            Some(root) if file.is_relative() => root.join(file),
            _ => file.to_path_buf(),
        }
    }
}
