//! Inputs consumed by the language engine: translation tables and the
//! persisted language preference.

pub mod preference;
pub mod translation;
