//! Site configuration loaded from `.site-i18n.json`.

/// Config file loader
mod loader;
/// Configuration manager
mod manager;
/// Page pattern matcher
mod matcher;
/// Configuration types and settings
mod types;

pub use loader::CONFIG_FILE_NAME;
pub use manager::ConfigManager;
pub use matcher::{
    MatcherError,
    PageMatcher,
};
pub use types::{
    BindingsConfig,
    ConfigError,
    OrdinalGroup,
    SiteSettings,
    ToggleConfig,
    ToggleLabel,
    TransitionConfig,
    ValidationError,
};
