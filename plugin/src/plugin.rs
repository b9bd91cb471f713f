//! The plugin contract.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::record::Batch;

/// An async transform from one batch of files to the next.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Name used to attribute log output.
    fn name(&self) -> &str;

    /// Transform the input batch.
    async fn run(&self, ctx: &ExecutionContext, input: Batch) -> Result<Batch>;
}

#[async_trait]
impl<P: Plugin + ?Sized> Plugin for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn run(&self, ctx: &ExecutionContext, input: Batch) -> Result<Batch> {
        (**self).run(ctx, input).await
    }
}

#[async_trait]
impl<P: Plugin + ?Sized> Plugin for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn run(&self, ctx: &ExecutionContext, input: Batch) -> Result<Batch> {
        (**self).run(ctx, input).await
    }
}

/// Plugin backed by an async closure.
pub struct FnPlugin<F> {
    name: String,
    f: F,
}

/// Turn an async closure into a plugin.
///
/// The closure receives its own copy of the context.
pub fn plugin_fn<F, Fut>(name: impl Into<String>, f: F) -> FnPlugin<F>
where
    F: Fn(ExecutionContext, Batch) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Batch>> + Send + 'static,
{
    FnPlugin {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<F, Fut> Plugin for FnPlugin<F>
where
    F: Fn(ExecutionContext, Batch) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Batch>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &ExecutionContext, input: Batch) -> Result<Batch> {
        (self.f)(ctx.clone(), input).await
    }
}
