//! Lifecycle of the language engine.

use std::fmt;

/// Where the engine is in its lifecycle.
///
/// `Uninitialized → Loading → Ready(lang) → Switching → Ready(lang')`.
/// A failed load ends in `DegradedReady(default)`, which is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Loading,
    Ready(String),
    /// At least one switch is in flight; `to` is the most recent target.
    Switching { from: String, to: String },
    /// Translations could not be loaded; the document stays as authored.
    DegradedReady(String),
}

impl EngineState {
    /// Whether translations are available for switching.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Switching { .. })
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Loading => write!(f, "loading"),
            Self::Ready(language) => write!(f, "ready({language})"),
            Self::Switching { from, to } => write!(f, "switching({from} → {to})"),
            Self::DegradedReady(language) => write!(f, "degraded({language})"),
        }
    }
}
