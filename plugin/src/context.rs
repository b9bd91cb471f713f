//! Execution context shared by every plugin in a pipeline.
//!
//! The context carries the logging sink (`Reporter`) plus caller supplied
//! fields. Composers hand each plugin a copy scoped to that plugin's name so
//! log lines can be attributed.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, error, info};

use crate::error::PluginError;

/// Sink for pipeline progress and log output.
pub trait Reporter: Send + Sync {
    /// A plugin started running.
    fn start(&self, _plugin: &str) {}

    /// A plugin logged a message.
    fn message(&self, plugin: &str, message: &str);

    /// A plugin produced or touched a file.
    fn file(&self, _plugin: &str, _path: &Path) {}

    /// A plugin finished successfully.
    fn done(&self, _plugin: &str) {}

    /// A plugin failed.
    fn error(&self, _plugin: &str, _error: &PluginError) {}
}

/// Reporter that forwards everything to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn start(&self, plugin: &str) {
        debug!(plugin, "start");
    }

    fn message(&self, plugin: &str, message: &str) {
        info!(plugin, "{message}");
    }

    fn file(&self, plugin: &str, path: &Path) {
        info!(plugin, "{}", path.display());
    }

    fn done(&self, plugin: &str) {
        debug!(plugin, "done");
    }

    fn error(&self, plugin: &str, error: &PluginError) {
        error!(plugin, "{error}");
    }
}

/// A single entry recorded by `MemoryReporter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Start(String),
    Message { plugin: String, message: String },
    File { plugin: String, path: PathBuf },
    Done(String),
    Error { plugin: String, message: String },
}

/// Reporter that keeps every entry in memory.
///
/// Useful for assertions in tests and for callers that render output
/// themselves.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    entries: Mutex<Vec<Report>>,
}

impl MemoryReporter {
    /// Create an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries recorded so far.
    pub fn entries(&self) -> Vec<Report> {
        self.lock().clone()
    }

    /// Messages logged by plugins, in order.
    pub fn messages(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|entry| match entry {
                Report::Message { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, report: Report) {
        self.lock().push(report);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Report>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Reporter for MemoryReporter {
    fn start(&self, plugin: &str) {
        self.push(Report::Start(plugin.to_string()));
    }

    fn message(&self, plugin: &str, message: &str) {
        self.push(Report::Message {
            plugin: plugin.to_string(),
            message: message.to_string(),
        });
    }

    fn file(&self, plugin: &str, path: &Path) {
        self.push(Report::File {
            plugin: plugin.to_string(),
            path: path.to_path_buf(),
        });
    }

    fn done(&self, plugin: &str) {
        self.push(Report::Done(plugin.to_string()));
    }

    fn error(&self, plugin: &str, error: &PluginError) {
        self.push(Report::Error {
            plugin: plugin.to_string(),
            message: error.to_string(),
        });
    }
}

/// Context for plugin execution.
#[derive(Clone)]
pub struct ExecutionContext {
    /// Logging sink.
    reporter: Arc<dyn Reporter>,

    /// Environment variables to set for spawned processes.
    pub env: HashMap<String, String>,

    /// Base directory for relative paths.
    pub working_dir: Option<PathBuf>,

    /// Name of the plugin this context is scoped to.
    scope: String,
}

impl ExecutionContext {
    /// Create a context that logs through `tracing`.
    pub fn new() -> Self {
        Self {
            reporter: Arc::new(TracingReporter),
            env: HashMap::new(),
            working_dir: None,
            scope: String::new(),
        }
    }

    /// Replace the reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Set an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Copy of this context attributed to another plugin.
    pub fn scoped(&self, plugin: impl Into<String>) -> Self {
        Self {
            scope: plugin.into(),
            ..self.clone()
        }
    }

    /// Name of the plugin this context is scoped to.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// The logging sink.
    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.reporter
    }

    /// Log a message on behalf of the scoped plugin.
    pub fn log_message(&self, message: impl AsRef<str>) {
        self.reporter.message(&self.scope, message.as_ref());
    }

    /// Report a file on behalf of the scoped plugin.
    pub fn log_file(&self, path: &Path) {
        self.reporter.file(&self.scope, path);
    }

    /// Resolve a path against the working directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.working_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("env", &self.env)
            .field("working_dir", &self.working_dir)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scoped_context_keeps_fields() {
        let ctx = ExecutionContext::new()
            .with_env("NODE_ENV", "production")
            .with_working_dir("/repo");
        let scoped = ctx.scoped("read");

        assert_eq!(scoped.scope(), "read");
        assert_eq!(scoped.env.get("NODE_ENV"), Some(&"production".to_string()));
        assert_eq!(scoped.working_dir, Some(PathBuf::from("/repo")));
        assert_eq!(ctx.scope(), "");
    }

    #[test]
    fn test_log_message_is_attributed() {
        let reporter = Arc::new(MemoryReporter::new());
        let ctx = ExecutionContext::new()
            .with_reporter(reporter.clone())
            .scoped("watch");

        ctx.log_message("hello");
        ctx.log_file(Path::new("out/a.flow"));

        assert_eq!(
            reporter.entries(),
            vec![
                Report::Message {
                    plugin: "watch".to_string(),
                    message: "hello".to_string(),
                },
                Report::File {
                    plugin: "watch".to_string(),
                    path: PathBuf::from("out/a.flow"),
                },
            ]
        );
    }

    #[test]
    fn test_resolve_relative_paths() {
        let ctx = ExecutionContext::new().with_working_dir("/repo");
        assert_eq!(ctx.resolve(Path::new("src/a.ts")), PathBuf::from("/repo/src/a.ts"));
        assert_eq!(ctx.resolve(Path::new("/abs/b.ts")), PathBuf::from("/abs/b.ts"));

        let bare = ExecutionContext::new();
        assert_eq!(bare.resolve(Path::new("src/a.ts")), PathBuf::from("src/a.ts"));
    }
}
