//! Observers that feed filesystem changes into the watch loop.
//!
//! An observer reports every path matching the configured globs as an `add`
//! event, then `Ready`, then live changes. `GlobObserver` does this over
//! `notify`; `ChannelObserver` lets callers push events themselves.

use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use glob::{MatchOptions, Pattern};
use indexmap::IndexMap;
use notify::{PollWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{WatchConfig, WatchOptions};
use crate::error::{Result, WatchError};
use crate::event::{ObserverEvent, classify};

/// Capacity of the channel between the observer and the watch loop.
const CHANNEL_CAPACITY: usize = 1000;

/// `*` stays within one path segment; `**` crosses segments.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Source of filesystem notifications for the watch loop.
pub trait Observer: Send + Sync {
    /// Start observing. Called once per watch run.
    fn observe(&self) -> Result<Observation>;
}

/// A running observation: the event stream plus whatever keeps the backend
/// alive. Dropping it stops the backend.
pub struct Observation {
    events: mpsc::Receiver<ObserverEvent>,
    _backend: Option<Box<dyn Send>>,
}

impl Observation {
    /// Wrap an event stream.
    pub fn new(events: mpsc::Receiver<ObserverEvent>) -> Self {
        Self {
            events,
            _backend: None,
        }
    }

    /// Keep a backend alive for as long as the observation.
    pub fn with_backend(mut self, backend: impl Send + 'static) -> Self {
        self._backend = Some(Box::new(backend));
        self
    }

    /// Next notification, or `None` once the observer is gone.
    pub async fn next(&mut self) -> Option<ObserverEvent> {
        self.events.recv().await
    }
}

/// Observer fed through a channel.
pub struct ChannelObserver {
    events: Mutex<Option<mpsc::Receiver<ObserverEvent>>>,
}

impl ChannelObserver {
    /// Create the observer and the sender that feeds it.
    pub fn new() -> (Self, mpsc::Sender<ObserverEvent>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let observer = Self {
            events: Mutex::new(Some(rx)),
        };
        (observer, tx)
    }
}

impl Observer for ChannelObserver {
    fn observe(&self) -> Result<Observation> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(Observation::new)
            .ok_or_else(|| WatchError::Config("channel observer can only be observed once".into()))
    }
}

/// A compiled include pattern.
#[derive(Debug)]
struct GlobPattern {
    pattern: Pattern,

    /// Whether the user wrote it relative to the working directory.
    relative: bool,
}

/// Decides which paths are watched and how they are reported.
#[derive(Debug)]
struct Matcher {
    include: Vec<GlobPattern>,
    ignored: Vec<Pattern>,
    cwd: PathBuf,
}

impl Matcher {
    fn new(patterns: &[String], ignored: &[String], cwd: &Path) -> Result<Self> {
        let include = patterns
            .iter()
            .map(|raw| {
                Ok(GlobPattern {
                    pattern: compile(cwd, raw)?,
                    relative: Path::new(raw).is_relative(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let ignored = ignored
            .iter()
            .map(|raw| compile(cwd, raw))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            include,
            ignored,
            cwd: cwd.to_path_buf(),
        })
    }

    /// Path to report for `path`, or `None` when it is not watched.
    ///
    /// Matches of relative patterns are reported relative to the working
    /// directory.
    fn report(&self, path: &Path) -> Option<PathBuf> {
        if self
            .ignored
            .iter()
            .any(|p| p.matches_path_with(path, MATCH_OPTIONS))
        {
            return None;
        }

        let matched = self
            .include
            .iter()
            .find(|g| g.pattern.matches_path_with(path, MATCH_OPTIONS))?;

        if matched.relative {
            let relative = path.strip_prefix(&self.cwd).unwrap_or(path);
            Some(relative.to_path_buf())
        } else {
            Some(path.to_path_buf())
        }
    }
}

fn compile(cwd: &Path, raw: &str) -> Result<Pattern> {
    Pattern::new(&absolute_pattern(cwd, raw)).map_err(|e| WatchError::invalid_pattern(raw, e))
}

/// Anchor a relative pattern at `cwd`, escaping any glob syntax in `cwd`.
fn absolute_pattern(cwd: &Path, raw: &str) -> String {
    if Path::new(raw).is_absolute() {
        return raw.to_string();
    }
    let base = Pattern::escape(&cwd.to_string_lossy());
    let raw = raw.trim_start_matches("./");
    format!("{}/{raw}", base.trim_end_matches('/'))
}

fn has_magic(component: &str) -> bool {
    component.contains(['*', '?', '['])
}

/// Directory to watch for a pattern, and how many levels below it matches
/// can occur (`None` for unbounded).
fn watch_root(cwd: &Path, raw: &str) -> (PathBuf, Option<usize>) {
    let pattern = Path::new(raw);
    let mut root = if pattern.is_absolute() {
        PathBuf::new()
    } else {
        cwd.to_path_buf()
    };
    let mut rest: Vec<String> = Vec::new();

    for component in pattern.components() {
        if component == Component::CurDir {
            continue;
        }
        let text = component.as_os_str().to_string_lossy();
        if rest.is_empty() && !has_magic(&text) {
            root.push(component);
        } else {
            rest.push(text.into_owned());
        }
    }

    let mut depth = if rest.is_empty() {
        // Literal file path: watch the directory holding it.
        root.pop();
        Some(1)
    } else if rest.iter().any(|c| c.contains("**")) {
        None
    } else {
        Some(rest.len())
    };

    while !root.exists() {
        if !root.pop() {
            break;
        }
        depth = None;
    }

    (root, depth)
}

fn deepest(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        _ => None,
    }
}

/// Whether a root is registered with `RecursiveMode::Recursive`.
fn is_recursive(depth: Option<usize>) -> bool {
    depth != Some(1)
}

/// Watch roots for all patterns. Roots nested inside a recursive root are
/// folded into it so no change is reported twice; the outer root's scan
/// depth grows to still reach their matches.
fn watch_roots(cwd: &Path, patterns: &[String]) -> Vec<(PathBuf, Option<usize>)> {
    let mut roots: IndexMap<PathBuf, Option<usize>> = IndexMap::new();
    for raw in patterns {
        let (root, depth) = watch_root(cwd, raw);
        roots
            .entry(root)
            .and_modify(|d| *d = deepest(*d, depth))
            .or_insert(depth);
    }

    // Outermost recursive ancestor of each nested root.
    let nested: Vec<(PathBuf, PathBuf, Option<usize>)> = roots
        .iter()
        .filter_map(|(root, depth)| {
            roots
                .iter()
                .filter(|(outer, d)| {
                    *outer != root && is_recursive(**d) && root.starts_with(outer)
                })
                .min_by_key(|(outer, _)| outer.components().count())
                .map(|(outer, _)| (root.clone(), outer.clone(), *depth))
        })
        .collect();

    for (root, outer, depth) in nested {
        roots.shift_remove(&root);
        let below = root
            .strip_prefix(&outer)
            .map(|rest| rest.components().count())
            .unwrap_or_default();
        if let Some(d) = roots.get_mut(&outer) {
            *d = deepest(*d, depth.map(|depth| depth + below));
        }
    }

    roots.into_iter().collect()
}

/// Report every existing match as `add`, then `Ready`.
fn initial_scan(
    matcher: &Matcher,
    roots: &[(PathBuf, Option<usize>)],
    follow_symlinks: bool,
    tx: &mpsc::Sender<ObserverEvent>,
) {
    for (root, depth) in roots {
        let walker = WalkDir::new(root)
            .follow_links(follow_symlinks)
            .max_depth(depth.unwrap_or(usize::MAX))
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry during initial scan: {e}");
                    continue;
                }
            };

            if !entry.path().is_file() {
                continue;
            }

            if let Some(path) = matcher.report(entry.path()) {
                if tx.blocking_send(ObserverEvent::add(path)).is_err() {
                    return;
                }
            }
        }
    }

    let _ = tx.blocking_send(ObserverEvent::Ready);
}

/// Observer backed by `notify` and glob patterns.
#[derive(Debug, Clone)]
pub struct GlobObserver {
    patterns: Vec<String>,
    options: WatchOptions,
}

impl GlobObserver {
    /// Create an observer for patterns with the given options.
    pub fn new(patterns: Vec<String>, options: WatchOptions) -> Self {
        Self { patterns, options }
    }

    /// Create an observer for a watch configuration.
    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(config.patterns.clone(), config.options.clone())
    }

    fn backend(
        &self,
        matcher: Arc<Matcher>,
        tx: mpsc::Sender<ObserverEvent>,
    ) -> Result<Box<dyn Watcher + Send>> {
        let handler = move |res: notify::Result<notify::Event>| {
            let events: Vec<ObserverEvent> = match res {
                Ok(event) => classify(&event)
                    .into_iter()
                    .filter_map(|(kind, path)| {
                        matcher
                            .report(&path)
                            .map(|reported| ObserverEvent::Event(kind, reported))
                    })
                    .collect(),
                Err(e) => vec![ObserverEvent::Error(e.into())],
            };

            for event in events {
                if tx.blocking_send(event).is_err() {
                    debug!("Observer channel closed, dropping event");
                    break;
                }
            }
        };

        let watcher: Box<dyn Watcher + Send> = match self.options.poll_interval() {
            Some(interval) => Box::new(PollWatcher::new(
                handler,
                notify::Config::default().with_poll_interval(interval),
            )?),
            None => Box::new(notify::recommended_watcher(handler)?),
        };
        Ok(watcher)
    }
}

impl Observer for GlobObserver {
    fn observe(&self) -> Result<Observation> {
        let cwd = self.options.resolve_cwd()?;
        let matcher = Arc::new(Matcher::new(&self.patterns, &self.options.ignored, &cwd)?);
        let roots = watch_roots(&cwd, &self.patterns);
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        // Register watches before scanning so nothing created mid-scan is lost.
        let mut backend = self.backend(matcher.clone(), tx.clone())?;
        for (root, depth) in &roots {
            let mode = if is_recursive(*depth) {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            backend.watch(root, mode)?;
            debug!("Watching {} ({mode:?})", root.display());
        }

        let follow_symlinks = self.options.follow_symlinks;
        std::thread::Builder::new()
            .name("startkit-scan".to_string())
            .spawn(move || initial_scan(&matcher, &roots, follow_symlinks, &tx))?;

        Ok(Observation::new(rx).with_backend(backend))
    }
}
