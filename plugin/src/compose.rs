//! Sequential and parallel composition of plugins.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::plugin::Plugin;
use crate::record::Batch;

/// Run one plugin in a context scoped to its name, reporting start, done
/// and failure.
async fn run_reported(plugin: &dyn Plugin, ctx: &ExecutionContext, input: Batch) -> Result<Batch> {
    let scoped = ctx.scoped(plugin.name());
    let reporter = scoped.reporter();

    reporter.start(plugin.name());
    match plugin.run(&scoped, input).await {
        Ok(output) => {
            reporter.done(plugin.name());
            Ok(output)
        }
        Err(e) => {
            reporter.error(plugin.name(), &e);
            Err(e)
        }
    }
}

/// Runs plugins one after another, feeding each output into the next.
#[derive(Default, Clone)]
pub struct Sequence {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl Sequence {
    /// Create an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plugin.
    pub fn then(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Append an already shared plugin.
    pub fn then_shared(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Number of plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Check if the sequence has no plugins.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[async_trait]
impl Plugin for Sequence {
    fn name(&self) -> &str {
        "sequence"
    }

    async fn run(&self, ctx: &ExecutionContext, input: Batch) -> Result<Batch> {
        let mut batch = input;
        for plugin in &self.plugins {
            batch = run_reported(plugin.as_ref(), ctx, batch).await?;
        }
        Ok(batch)
    }
}

/// Runs plugins concurrently on copies of the same input.
///
/// Outputs are concatenated in plugin order. The first failure is returned.
#[derive(Default, Clone)]
pub struct Parallel {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl Parallel {
    /// Create an empty parallel group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plugin.
    pub fn with(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Number of plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Check if the group has no plugins.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[async_trait]
impl Plugin for Parallel {
    fn name(&self) -> &str {
        "parallel"
    }

    async fn run(&self, ctx: &ExecutionContext, input: Batch) -> Result<Batch> {
        let runs = self
            .plugins
            .iter()
            .map(|plugin| run_reported(plugin.as_ref(), ctx, input.clone()));

        let outputs = try_join_all(runs).await?;
        Ok(outputs.into_iter().flatten().collect())
    }
}
