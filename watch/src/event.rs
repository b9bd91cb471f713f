//! Change kinds and observer notifications.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use serde::{Deserialize, Serialize};

use crate::error::WatchError;

/// Kind of change reported for a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// A file appeared.
    Add,

    /// A directory appeared.
    AddDir,

    /// A file's contents changed.
    Change,

    /// A file was removed.
    Unlink,

    /// A directory was removed.
    UnlinkDir,
}

impl EventKind {
    /// All kinds, in declaration order.
    pub const ALL: [EventKind; 5] = [
        EventKind::Add,
        EventKind::AddDir,
        EventKind::Change,
        EventKind::Unlink,
        EventKind::UnlinkDir,
    ];

    /// Name used in config files and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Add => "add",
            EventKind::AddDir => "addDir",
            EventKind::Change => "change",
            EventKind::Unlink => "unlink",
            EventKind::UnlinkDir => "unlinkDir",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                WatchError::Config(format!(
                    "unknown event kind `{s}` (expected one of: add, addDir, change, unlink, unlinkDir)"
                ))
            })
    }
}

/// Notification produced by an observer.
///
/// Observers deliver every initial match as an `add` event, then `Ready`,
/// then live events.
#[derive(Debug)]
pub enum ObserverEvent {
    /// A path changed.
    Event(EventKind, PathBuf),

    /// The initial scan finished.
    Ready,

    /// The observer hit an error.
    Error(WatchError),
}

impl ObserverEvent {
    /// Convenience constructor for an `add` event.
    pub fn add(path: impl Into<PathBuf>) -> Self {
        Self::Event(EventKind::Add, path.into())
    }

    /// Convenience constructor for a `change` event.
    pub fn change(path: impl Into<PathBuf>) -> Self {
        Self::Event(EventKind::Change, path.into())
    }
}

fn added(path: &Path) -> (EventKind, PathBuf) {
    let kind = if path.is_dir() {
        EventKind::AddDir
    } else {
        EventKind::Add
    };
    (kind, path.to_path_buf())
}

fn removed(path: &Path) -> (EventKind, PathBuf) {
    (EventKind::Unlink, path.to_path_buf())
}

/// Translate a raw `notify` event into change kinds per path.
///
/// Renames become an unlink of the old path and an add of the new one.
/// Metadata and access notifications are not changes.
pub fn classify(event: &notify::Event) -> Vec<(EventKind, PathBuf)> {
    match &event.kind {
        notify::EventKind::Create(CreateKind::Folder) => event
            .paths
            .iter()
            .map(|p| (EventKind::AddDir, p.clone()))
            .collect(),
        notify::EventKind::Create(CreateKind::File) => event
            .paths
            .iter()
            .map(|p| (EventKind::Add, p.clone()))
            .collect(),
        notify::EventKind::Create(_) => event.paths.iter().map(|p| added(p)).collect(),
        notify::EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => event.paths.iter().map(|p| removed(p)).collect(),
            RenameMode::To => event.paths.iter().map(|p| added(p)).collect(),
            RenameMode::Both if event.paths.len() == 2 => {
                vec![removed(&event.paths[0]), added(&event.paths[1])]
            }
            _ => event
                .paths
                .iter()
                .map(|p| if p.exists() { added(p) } else { removed(p) })
                .collect(),
        },
        notify::EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        notify::EventKind::Modify(_) => event
            .paths
            .iter()
            .filter(|p| !p.is_dir())
            .map(|p| (EventKind::Change, p.clone()))
            .collect(),
        notify::EventKind::Remove(RemoveKind::Folder) => event
            .paths
            .iter()
            .map(|p| (EventKind::UnlinkDir, p.clone()))
            .collect(),
        notify::EventKind::Remove(_) => event.paths.iter().map(|p| removed(p)).collect(),
        _ => Vec::new(),
    }
}
