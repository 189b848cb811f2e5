//! Error types for the narrative core.
//!
//! None of these reach the player: backend and response failures are
//! absorbed by the fallback path, and config errors surface at startup.

use std::path::PathBuf;

/// Errors raised while loading narrative configuration.
#[derive(Debug, thiserror::Error)]
pub enum NarrativeError {
    /// The configuration file could not be read.
    #[error("failed to read narrative config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid TOML.
    #[error("invalid narrative config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// The narrative backend could not produce a reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// No backend is configured or it refused the connection.
    #[error("narrative backend unavailable: {0}")]
    Unavailable(String),

    /// The backend did not answer within the caller's deadline.
    #[error("narrative backend timed out")]
    Timeout,

    /// The backend answered with a transport or protocol error.
    #[error("narrative backend request failed: {0}")]
    Request(String),
}

/// A backend reply that does not satisfy the response contract.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    /// No JSON object could be found in the reply text.
    #[error("reply contains no structured data")]
    NotStructured,

    /// The JSON object has fields of the wrong shape.
    #[error("reply has invalid field types: {0}")]
    InvalidShape(#[from] serde_json::Error),

    /// A mandatory field is absent.
    #[error("reply is missing mandatory field `{0}`")]
    MissingField(&'static str),

    /// The narration only echoes the action back ("You performed the X action: Y").
    #[error("reply message is an echo of the action")]
    EchoedAction,
}
