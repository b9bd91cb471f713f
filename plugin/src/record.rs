//! File records exchanged between pipeline stages.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// An ordered list of file records handed to one plugin invocation.
pub type Batch = Vec<FileRecord>;

/// A single file flowing through a pipeline.
///
/// The path is the identity key: a batch never holds two records with the
/// same path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path to the file.
    pub path: PathBuf,

    /// File contents, once a stage has read them.
    pub data: Option<String>,

    /// Source map produced by a transform stage.
    pub map: Option<serde_json::Value>,
}

impl FileRecord {
    /// Create a record for a path with no contents and no source map.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            data: None,
            map: None,
        }
    }

    /// Attach file contents.
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Attach a source map.
    pub fn with_map(mut self, map: serde_json::Value) -> Self {
        self.map = Some(map);
        self
    }

    /// Path of the record.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
