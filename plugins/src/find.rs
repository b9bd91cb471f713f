//! Expand glob patterns into a batch.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use glob::{MatchOptions, Pattern};
use indexmap::IndexSet;
use startkit_plugin::{Batch, ExecutionContext, FileRecord, Plugin, Result};
use tracing::warn;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Replaces the batch with every file matching the patterns.
///
/// Relative patterns are resolved against the context working directory.
/// Files keep pattern order, sorted within each pattern, without duplicates.
#[derive(Debug, Clone)]
pub struct Find {
    patterns: Vec<String>,
}

/// Find files matching one or more glob patterns.
pub fn find<I, S>(patterns: I) -> Find
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Find {
        patterns: patterns.into_iter().map(Into::into).collect(),
    }
}

impl Find {
    fn expand(&self, ctx: &ExecutionContext) -> Result<Vec<PathBuf>> {
        let mut found = IndexSet::new();

        for raw in &self.patterns {
            let resolved = match &ctx.working_dir {
                Some(dir) if Path::new(raw).is_relative() => {
                    format!("{}/{raw}", Pattern::escape(&dir.to_string_lossy()))
                }
                _ => raw.clone(),
            };

            for entry in glob::glob_with(&resolved, MATCH_OPTIONS)? {
                match entry {
                    Ok(path) if path.is_file() => {
                        found.insert(path);
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Skipping unreadable path: {e}"),
                }
            }
        }

        Ok(found.into_iter().collect())
    }
}

#[async_trait]
impl Plugin for Find {
    fn name(&self) -> &str {
        "find"
    }

    async fn run(&self, ctx: &ExecutionContext, _input: Batch) -> Result<Batch> {
        let files = self.expand(ctx)?;
        ctx.log_message(format!("found {} files", files.len()));
        Ok(files.into_iter().map(FileRecord::new).collect())
    }
}
