//! site-i18n
//!
//! リゾートサイト向けの翻訳エンジン。マークアップへの翻訳キー付与、言語切り替え、
//! 言語ごとの静的ページ生成を行う。

pub mod audit;
pub mod config;
pub mod dom;
pub mod engine;
pub mod forms;
pub mod input;
pub mod site;
pub mod tagger;
pub mod types;
pub mod ui;

pub use engine::{
    EngineError,
    LanguageEngine,
};
pub use site::SiteRenderer;
