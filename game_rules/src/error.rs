//! Error types for the rules crate.
//!
//! Mechanics degrade to no-op outcomes instead of failing, so the only
//! fallible surface here is loading configuration.

use std::path::PathBuf;

/// Errors that can occur while preparing the rules layer.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    /// The configuration file could not be read.
    #[error("failed to read rules config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid TOML for [`crate::RulesConfig`].
    #[error("invalid rules config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A configured value breaks an invariant of the mechanics.
    #[error("invalid rules config value: {0}")]
    ConfigValue(String),
}
