//! 設定ファイルの読み込み関数

use std::path::Path;

use jsonc_parser::ParseOptions;

use super::{
    ConfigError,
    SiteSettings,
};

/// 設定ファイル名
pub const CONFIG_FILE_NAME: &str = ".site-i18n.json";

/// サイトルートから設定を読み込む
///
/// `.site-i18n.json` ファイルを探して読み込む。コメントと末尾カンマを許容する。
///
/// # Returns
/// - `Ok(Some(settings))`: 設定ファイルが見つかり、読み込みに成功
/// - `Ok(None)`: 設定ファイルが見つからない
/// - `Err(ConfigError)`: ファイル読み込みまたはパースエラー
pub(super) fn load_from_site(site_root: &Path) -> Result<Option<SiteSettings>, ConfigError> {
    let config_path = site_root.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        tracing::debug!("Configuration file not found: {:?}", config_path);
        return Ok(None);
    }

    tracing::debug!("Loading configuration from: {:?}", config_path);

    let content = std::fs::read_to_string(&config_path)?;
    parse_settings(&content).map(Some)
}

/// JSONC テキストを設定としてパースする
///
/// 空のファイルはデフォルト設定として扱う。
pub(super) fn parse_settings(content: &str) -> Result<SiteSettings, ConfigError> {
    let value = jsonc_parser::parse_to_serde_value(content, &ParseOptions::default())
        .map_err(|e| ConfigError::SyntaxError(e.to_string()))?;

    match value {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(SiteSettings::default()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::fs;

    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    /// `load_from_site`: 設定ファイルが存在する場合
    #[rstest]
    fn test_load_from_site_with_valid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_content = r#"{"keySeparator": "-"}"#;
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), config_content).unwrap();

        let result = load_from_site(temp_dir.path());

        assert!(result.is_ok());
        let settings = result.unwrap();
        assert!(settings.is_some());
        assert_eq!(settings.unwrap().key_separator, "-");
    }

    /// `load_from_site`: コメントと末尾カンマを含む設定
    #[rstest]
    fn test_load_from_site_with_comments() {
        let temp_dir = TempDir::new().unwrap();
        let config_content = r#"{
  // Georgian first
  "defaultLanguage": "ka",
  /* trailing comma below */
  "translationsFile": "i18n/translations.json",
}"#;
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), config_content).unwrap();

        let settings = load_from_site(temp_dir.path()).unwrap().unwrap();

        assert_eq!(settings.default_language, "ka");
        assert_eq!(settings.translations_file, "i18n/translations.json");
    }

    /// `load_from_site`: 設定ファイルが存在しない場合
    #[rstest]
    fn test_load_from_site_no_config_file() {
        let temp_dir = TempDir::new().unwrap();

        let result = load_from_site(temp_dir.path());

        assert!(result.is_ok());
        assert!(result.unwrap().is_none());
    }

    /// `load_from_site`: 構文エラー
    #[rstest]
    fn test_load_from_site_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "{ invalid json").unwrap();

        let result = load_from_site(temp_dir.path());

        assert!(matches!(result, Err(ConfigError::SyntaxError(_))));
    }

    /// `parse_settings`: 型が合わない
    #[rstest]
    fn test_parse_settings_wrong_type() {
        let result = parse_settings(r#"{"includePatterns": "**/*.html"}"#);

        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    /// `parse_settings`: 空のファイル
    #[rstest]
    fn test_parse_settings_empty_file() {
        let settings = parse_settings("  // nothing yet\n").unwrap();

        assert_eq!(settings, SiteSettings::default());
    }
}
