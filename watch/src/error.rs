//! Error types for glob watching.

use thiserror::Error;

/// Result type alias for watch operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors that can occur while watching.
#[derive(Error, Debug)]
pub enum WatchError {
    /// Invalid glob pattern.
    #[error("invalid glob pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed.
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// The observer stopped delivering events.
    #[error("observer closed its event stream")]
    ObserverClosed,

    /// The watched pipeline failed.
    #[error("pipeline failed: {0}")]
    Pipeline(#[from] startkit_plugin::PluginError),

    /// The background watch task failed.
    #[error("watch task failed: {0}")]
    Task(String),
}

impl WatchError {
    pub(crate) fn invalid_pattern(pattern: &str, err: glob::PatternError) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        }
    }
}
