//! Load file contents into a batch.

use async_trait::async_trait;
use futures::future::try_join_all;
use startkit_plugin::{Batch, ExecutionContext, FileRecord, Plugin, PluginError, Result};

/// Fills `data` with each file's UTF-8 contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Read;

/// Read every file in the batch.
pub fn read() -> Read {
    Read
}

#[async_trait]
impl Plugin for Read {
    fn name(&self) -> &str {
        "read"
    }

    async fn run(&self, ctx: &ExecutionContext, input: Batch) -> Result<Batch> {
        try_join_all(input.into_iter().map(|record| async move {
            let contents = tokio::fs::read_to_string(ctx.resolve(&record.path)).await?;
            ctx.log_file(&record.path);
            Ok::<FileRecord, PluginError>(record.with_data(contents))
        }))
        .await
    }
}
