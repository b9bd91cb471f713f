//! Error types for pipeline plugins.

use thiserror::Error;

/// Result type alias for plugin operations.
pub type Result<T> = std::result::Result<T, PluginError>;

/// Errors that can occur while running a plugin.
#[derive(Error, Debug)]
pub enum PluginError {
    /// A plugin reported a failure.
    #[error("{plugin} failed: {message}")]
    Failed { plugin: String, message: String },

    /// An external command exited unsuccessfully.
    #[error("command `{command}` exited with {status}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// Invalid glob pattern.
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other error raised inside a plugin.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PluginError {
    /// Create a failure attributed to a plugin.
    pub fn failed(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}
