use std::collections::BTreeMap;

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::dom::Selector;
use crate::input::preference::DEFAULT_PREFERENCE_KEY;
use crate::input::translation::is_valid_language_code;
use crate::tagger::TagRule;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "includePatterns[0]")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Failed to parse configuration: {0}")]
    SyntaxError(String),
}

/// Numbered list, one error per line.
fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Settings read from `.site-i18n.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteSettings {
    /// Translation resource, relative to the site root.
    pub translations_file: String,

    /// Language shown when nothing else is known.
    pub default_language: String,

    /// Joins nested keys of the translation resource.
    pub key_separator: String,

    pub marker_attribute: String,
    pub html_marker_attribute: String,

    /// Storage key of the persisted language.
    pub preference_key: String,

    /// Matches the icon kept in front of a translated label.
    pub icon_selector: String,

    /// Pages to render (globs relative to the site root).
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,

    pub transition: TransitionConfig,
    pub toggle: ToggleConfig,
    pub bindings: BindingsConfig,

    /// Replaces the built-in tag rules when set.
    pub tag_rules: Option<Vec<TagRule>>,
}

/// Durations of the language switch animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransitionConfig {
    pub enter_delay_ms: u64,
    pub exit_delay_ms: u64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self { enter_delay_ms: 50, exit_delay_ms: 300 }
    }
}

/// The language toggle affordance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToggleConfig {
    pub element_id: String,
    pub flag_selector: String,
    pub text_selector: String,
    /// Class present on `<body>` and the toggle while a switch runs.
    pub switching_class: String,
    /// How each language is advertised when it is the toggle's target.
    pub labels: BTreeMap<String, ToggleLabel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLabel {
    pub flag: String,
    pub text: String,
    pub title: String,
}

impl ToggleLabel {
    #[must_use]
    pub fn new(flag: &str, text: &str, title: &str) -> Self {
        Self { flag: flag.to_string(), text: text.to_string(), title: title.to_string() }
    }
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self {
            element_id: "language-toggle".to_string(),
            flag_selector: ".language-flag".to_string(),
            text_selector: ".language-text".to_string(),
            switching_class: "language-switching".to_string(),
            labels: BTreeMap::from([
                ("en".to_string(), ToggleLabel::new("🇺🇸", "English", "Switch to English")),
                ("ka".to_string(), ToggleLabel::new("🇬🇪", "ქართული", "Switch to Georgian")),
            ]),
        }
    }
}

/// Bindings the special-element pass resolves by position or id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BindingsConfig {
    /// Element id → placeholder key.
    pub placeholders: BTreeMap<String, String>,
    /// `<select>` id → key of option N.
    pub dropdowns: BTreeMap<String, Vec<String>>,
    pub ordinal_groups: Vec<OrdinalGroup>,
}

/// Position-bound labels: match N of `selector` gets `keys[N]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdinalGroup {
    pub selector: String,
    /// Descendant of each match that receives the text.
    #[serde(default)]
    pub target: Option<String>,
    pub keys: Vec<String>,
    /// Skip the whole group unless every position exists.
    #[serde(default)]
    pub require_full: bool,
}

impl OrdinalGroup {
    /// Builds a group from borrowed keys.
    fn new(selector: &str, target: Option<&str>, keys: &[&str], require_full: bool) -> Self {
        Self {
            selector: selector.to_string(),
            target: target.map(ToString::to_string),
            keys: keys.iter().map(ToString::to_string).collect(),
            require_full,
        }
    }
}

/// Owned id → key map.
fn owned_pairs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

/// Owned key list.
fn owned_keys(keys: &[&str]) -> Vec<String> {
    keys.iter().map(ToString::to_string).collect()
}

impl Default for BindingsConfig {
    fn default() -> Self {
        Self {
            placeholders: owned_pairs(&[
                ("fullname", "full_name_placeholder"),
                ("email", "email_placeholder"),
                ("phone", "phone_placeholder"),
                ("requests", "special_requests_placeholder"),
                ("firstname", "first_name_placeholder"),
                ("lastname", "last_name_placeholder"),
                ("contact-email", "email_placeholder"),
                ("contact-phone", "phone_placeholder"),
                ("subject", "subject_placeholder"),
                ("message", "message_placeholder"),
            ]),
            dropdowns: BTreeMap::from([
                (
                    "guests".to_string(),
                    owned_keys(&[
                        "select_guests",
                        "guest_1",
                        "guest_2",
                        "guest_3",
                        "guest_4",
                        "guest_5_plus",
                    ]),
                ),
                (
                    "roomtype".to_string(),
                    owned_keys(&[
                        "select_room",
                        "deluxe_room",
                        "executive_suite",
                        "presidential_suite",
                        "sports_package",
                    ]),
                ),
            ]),
            ordinal_groups: vec![
                OrdinalGroup::new(
                    ".stat-label",
                    None,
                    &["stat_happy_guests", "stat_years_experience", "stat_satisfaction"],
                    true,
                ),
                OrdinalGroup::new(
                    ".filter-btn",
                    None,
                    &["all_photos", "football_field", "tennis_court", "fitness_center", "swimming_pool"],
                    false,
                ),
                OrdinalGroup::new(
                    ".rating-label",
                    None,
                    &["overall_rating", "happy_guests", "would_recommend"],
                    true,
                ),
                OrdinalGroup::new(
                    ".amenity-item",
                    Some("span"),
                    &["free_wifi", "gym_access", "pool_access", "parking", "concierge", "room_service"],
                    false,
                ),
            ],
        }
    }
}

impl SiteSettings {
    /// # Errors
    /// - Malformed default language or toggle label language
    /// - Empty or clashing marker attributes
    /// - Invalid glob pattern or selector
    /// - Empty key lists
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !is_valid_language_code(&self.default_language) {
            errors.push(ValidationError::new(
                "defaultLanguage",
                format!(
                    "'{}' is not a valid language code. Example: \"en\"",
                    self.default_language
                ),
            ));
        }

        if self.translations_file.is_empty() {
            errors.push(ValidationError::new(
                "translationsFile",
                "The path cannot be empty. Example: \"translations.json\"",
            ));
        }

        if self.key_separator.is_empty() {
            errors.push(ValidationError::new(
                "keySeparator",
                "The separator cannot be empty. Please specify a separator, for example: \".\" (dot)",
            ));
        }

        for (field, value) in [
            ("markerAttribute", &self.marker_attribute),
            ("htmlMarkerAttribute", &self.html_marker_attribute),
            ("preferenceKey", &self.preference_key),
        ] {
            if value.is_empty() {
                errors.push(ValidationError::new(field, "The value cannot be empty"));
            }
        }

        if !self.marker_attribute.is_empty() && self.marker_attribute == self.html_marker_attribute
        {
            errors.push(ValidationError::new(
                "htmlMarkerAttribute",
                "Must differ from 'markerAttribute' so that each node has a single binding",
            ));
        }

        if self.include_patterns.is_empty() {
            errors.push(ValidationError::new(
                "includePatterns",
                "At least one pattern is required. Example: [\"**/*.html\"]",
            ));
        }

        for (index, pattern) in self.include_patterns.iter().enumerate() {
            if let Err(e) = globset::Glob::new(pattern) {
                errors.push(ValidationError::new(
                    format!("includePatterns[{index}]"),
                    format!("Invalid glob pattern '{pattern}': {e}"),
                ));
            }
        }

        for (index, pattern) in self.exclude_patterns.iter().enumerate() {
            if let Err(e) = globset::Glob::new(pattern) {
                errors.push(ValidationError::new(
                    format!("excludePatterns[{index}]"),
                    format!("Invalid glob pattern '{pattern}': {e}"),
                ));
            }
        }

        validate_selector(&mut errors, "iconSelector", &self.icon_selector);
        validate_selector(&mut errors, "toggle.flagSelector", &self.toggle.flag_selector);
        validate_selector(&mut errors, "toggle.textSelector", &self.toggle.text_selector);

        if self.toggle.element_id.is_empty() {
            errors.push(ValidationError::new("toggle.elementId", "The value cannot be empty"));
        }

        for code in self.toggle.labels.keys() {
            if !is_valid_language_code(code) {
                errors.push(ValidationError::new(
                    format!("toggle.labels.{code}"),
                    format!("'{code}' is not a valid language code"),
                ));
            }
        }

        for (id, keys) in &self.bindings.dropdowns {
            if keys.is_empty() {
                errors.push(ValidationError::new(
                    format!("bindings.dropdowns.{id}"),
                    "At least one option key is required",
                ));
            }
        }

        for (index, group) in self.bindings.ordinal_groups.iter().enumerate() {
            let path = format!("bindings.ordinalGroups[{index}]");
            validate_selector(&mut errors, &format!("{path}.selector"), &group.selector);
            if let Some(target) = &group.target {
                validate_selector(&mut errors, &format!("{path}.target"), target);
            }
            if group.keys.is_empty() {
                errors.push(ValidationError::new(
                    format!("{path}.keys"),
                    "At least one key is required",
                ));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Rules used by the tagger.
    #[must_use]
    pub fn effective_tag_rules(&self) -> Vec<TagRule> {
        self.tag_rules.clone().unwrap_or_else(crate::tagger::resort_rules)
    }
}

/// Records an error when `css` does not parse.
fn validate_selector(errors: &mut Vec<ValidationError>, field_path: &str, css: &str) {
    if let Err(e) = Selector::parse(css) {
        errors.push(ValidationError::new(field_path, format!("Invalid selector '{css}': {e}")));
    }
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            translations_file: "translations.json".to_string(),
            default_language: "en".to_string(),
            key_separator: ".".to_string(),
            marker_attribute: "data-translate".to_string(),
            html_marker_attribute: "data-translate-html".to_string(),
            preference_key: DEFAULT_PREFERENCE_KEY.to_string(),
            icon_selector: "i".to_string(),
            include_patterns: vec!["**/*.html".to_string()],
            exclude_patterns: vec!["node_modules/**".to_string()],
            transition: TransitionConfig::default(),
            toggle: ToggleConfig::default(),
            bindings: BindingsConfig::default(),
            tag_rules: None,
        }
    }
}
