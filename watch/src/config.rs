//! Configuration types for glob watching.

use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WatchError};
use crate::event::EventKind;

/// What to watch and which changes re-invoke the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Glob patterns to watch.
    pub patterns: Vec<String>,

    /// Change kinds that trigger an invocation.
    #[serde(default = "default_events")]
    pub events: Vec<EventKind>,

    /// Observer options.
    #[serde(default)]
    pub options: WatchOptions,
}

fn default_events() -> Vec<EventKind> {
    vec![EventKind::Add, EventKind::Change]
}

/// Layout of a config file: everything lives under `[watch]`.
#[derive(Deserialize)]
struct ConfigFile {
    watch: WatchConfig,
}

impl WatchConfig {
    /// Watch a single pattern with the default events.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self::with_patterns([pattern])
    }

    /// Watch several patterns with the default events.
    pub fn with_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            events: default_events(),
            options: WatchOptions::default(),
        }
    }

    /// Add a pattern.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Replace the triggering events.
    pub fn with_events(mut self, events: impl IntoIterator<Item = EventKind>) -> Self {
        self.events = events.into_iter().collect();
        self
    }

    /// Replace the observer options.
    pub fn with_options(mut self, options: WatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Configured events in order, without duplicates.
    pub fn event_kinds(&self) -> Vec<EventKind> {
        self.events
            .iter()
            .copied()
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    /// Check that there is something to watch and something to react to.
    pub fn validate(&self) -> Result<()> {
        if self.patterns.is_empty() {
            return Err(WatchError::Config("at least one glob pattern is required".into()));
        }
        if let Some(empty) = self.patterns.iter().find(|p| p.trim().is_empty()) {
            return Err(WatchError::Config(format!("empty glob pattern: {empty:?}")));
        }
        if self.events.is_empty() {
            return Err(WatchError::Config("at least one event kind is required".into()));
        }
        Ok(())
    }

    /// Parse the `[watch]` section of a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        file.watch.validate()?;
        Ok(file.watch)
    }

    /// Load the `[watch]` section from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

/// Options passed through to the observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
    /// Keep watching after the initial batch. When false the watch returns
    /// as soon as the initial invocation settles.
    pub persistent: bool,

    /// Poll the filesystem at this interval instead of using native events.
    pub poll_interval_ms: Option<u64>,

    /// Patterns excluded from both the initial scan and change events.
    pub ignored: Vec<String>,

    /// Whether to follow symbolic links during the initial scan.
    pub follow_symlinks: bool,

    /// Base directory for relative patterns (defaults to the process
    /// working directory).
    pub cwd: Option<PathBuf>,
}

impl WatchOptions {
    /// Set persistence.
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Use the polling backend.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = Some(u64::try_from(interval.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Add an ignore pattern.
    pub fn ignore(mut self, pattern: impl Into<String>) -> Self {
        self.ignored.push(pattern.into());
        self
    }

    /// Follow symbolic links.
    pub fn follow_symlinks(mut self) -> Self {
        self.follow_symlinks = true;
        self
    }

    /// Set the base directory for relative patterns.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Polling interval, if polling was requested.
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_ms.map(Duration::from_millis)
    }

    /// Base directory for relative patterns.
    pub fn resolve_cwd(&self) -> Result<PathBuf> {
        match &self.cwd {
            Some(cwd) if cwd.is_absolute() => Ok(cwd.clone()),
            Some(cwd) => Ok(std::env::current_dir()?.join(cwd)),
            None => Ok(std::env::current_dir()?),
        }
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            persistent: true,
            poll_interval_ms: None,
            ignored: Vec::new(),
            follow_symlinks: false,
            cwd: None,
        }
    }
}
