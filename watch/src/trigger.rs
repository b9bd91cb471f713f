//! The watch trigger loop.
//!
//! Wraps a pipeline so it runs once over everything the globs match, then
//! again for every single change afterwards.
//!
//! The loop is a two-phase state machine:
//!
//! ```text
//! Starting { buffer }  ──ready──►  SteadyState { armed per event kind }
//! ```
//!
//! While starting, `add` events are collected into the initial batch. On
//! ready the initial batch is dispatched with every kind disarmed. Once it
//! settles all configured kinds are armed. An event of an armed kind disarms
//! it and dispatches a single-file batch; the kind is re-armed when that
//! invocation settles, whatever its outcome. Events of a disarmed kind are
//! dropped, so one kind never has two invocations in flight while different
//! kinds run independently.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use indexmap::{IndexMap, IndexSet};
use startkit_plugin::{Batch, ExecutionContext, FileRecord, Plugin, PluginError};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::WatchConfig;
use crate::error::{Result, WatchError};
use crate::event::{EventKind, ObserverEvent};
use crate::observer::{GlobObserver, Observation, Observer};

/// Message logged once the initial batch has been dispatched.
pub const WATCHING_MESSAGE: &str = "watching for changes, press ctrl-c to exit";

/// Start building a watch over `config`.
pub fn watch(config: WatchConfig) -> WatchTrigger {
    WatchTrigger::new(config)
}

/// A watch configuration waiting for the pipeline it will drive.
pub struct WatchTrigger {
    config: WatchConfig,
    observer: Option<Arc<dyn Observer>>,
}

impl WatchTrigger {
    /// Watch with the default `notify` based observer.
    pub fn new(config: WatchConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    /// Use a custom observer.
    pub fn with_observer(mut self, observer: impl Observer + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Drive `pipeline` from this watch.
    pub fn wrap(self, pipeline: impl Plugin + 'static) -> WatchPipeline {
        self.wrap_shared(Arc::new(pipeline))
    }

    /// Drive an already shared pipeline from this watch.
    pub fn wrap_shared(self, pipeline: Arc<dyn Plugin>) -> WatchPipeline {
        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(GlobObserver::from_config(&self.config)));

        WatchPipeline {
            config: self.config,
            observer,
            pipeline,
        }
    }
}

/// What caused an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Initial,
    Event(EventKind),
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Initial => f.write_str("initial"),
            Trigger::Event(kind) => write!(f, "{kind}"),
        }
    }
}

type Outcome = std::result::Result<startkit_plugin::Result<Batch>, JoinError>;

/// A pipeline driven by a watch. Usable as a plugin itself.
#[derive(Clone)]
pub struct WatchPipeline {
    config: WatchConfig,
    observer: Arc<dyn Observer>,
    pipeline: Arc<dyn Plugin>,
}

impl WatchPipeline {
    /// The watch configuration.
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Watch until the observer fails. Non-persistent watches return after
    /// the initial invocation with its outcome.
    pub async fn watch(&self, ctx: &ExecutionContext) -> Result<()> {
        self.watch_until(ctx, CancellationToken::new()).await
    }

    /// Run the watch in a background task.
    pub fn spawn(&self, ctx: ExecutionContext) -> WatchHandle {
        let this = self.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { this.watch_until(&ctx, token).await });

        WatchHandle { cancel, task }
    }

    /// Watch until `cancel` fires or the observer fails.
    ///
    /// On cancellation the loop stops taking events, waits for in-flight
    /// invocations to settle and returns `Ok(())`.
    pub async fn watch_until(&self, ctx: &ExecutionContext, cancel: CancellationToken) -> Result<()> {
        self.config.validate()?;
        let kinds = self.config.event_kinds();
        let mut observation = self.observer.observe()?;

        let initial = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            initial = collect_initial(&mut observation) => initial?,
        };
        info!(
            "Initial scan found {} files, running {}",
            initial.len(),
            self.pipeline.name()
        );

        let mut armed: IndexMap<EventKind, bool> = kinds.iter().map(|kind| (*kind, false)).collect();
        let mut inflight = FuturesUnordered::new();
        inflight.push(dispatch(self.pipeline.clone(), ctx.clone(), Trigger::Initial, initial));

        let result = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break Ok(()),

                Some((trigger, outcome)) = inflight.next(), if !inflight.is_empty() => {
                    let settled = self.settle(ctx, trigger, outcome);
                    match trigger {
                        Trigger::Initial if !self.config.options.persistent => break settled,
                        Trigger::Initial => {
                            armed.values_mut().for_each(|flag| *flag = true);
                            ctx.scoped("watch").log_message(WATCHING_MESSAGE);
                        }
                        Trigger::Event(kind) => {
                            armed.insert(kind, true);
                        }
                    }
                }

                event = observation.next() => match event {
                    Some(ObserverEvent::Event(kind, path)) => match armed.get_mut(&kind) {
                        Some(flag) if *flag => {
                            *flag = false;
                            debug!("{kind} {}", path.display());
                            inflight.push(dispatch(
                                self.pipeline.clone(),
                                ctx.clone(),
                                Trigger::Event(kind),
                                vec![FileRecord::new(path)],
                            ));
                        }
                        Some(_) => debug!(
                            "Dropping {kind} {}: previous {kind} invocation still running",
                            path.display()
                        ),
                        None => debug!("Ignoring unwatched {kind} {}", path.display()),
                    },
                    Some(ObserverEvent::Ready) => debug!("Ignoring repeated ready notification"),
                    Some(ObserverEvent::Error(e)) => error!("Watch error: {e}"),
                    None => break Err(WatchError::ObserverClosed),
                },
            }
        };

        drop(observation);
        while let Some((trigger, outcome)) = inflight.next().await {
            // Already logged and reported; stopping succeeds regardless.
            let _drained = self.settle(ctx, trigger, outcome);
        }

        if result.is_ok() {
            info!("Watch stopped");
        }
        result
    }

    /// Log how an invocation ended.
    ///
    /// Failures are returned for callers that care; the watch itself only
    /// logs them.
    fn settle(&self, ctx: &ExecutionContext, trigger: Trigger, outcome: Outcome) -> Result<()> {
        let name = self.pipeline.name();
        match outcome {
            Ok(Ok(output)) => {
                debug!("{name} ({trigger}) finished with {} files", output.len());
                Ok(())
            }
            Ok(Err(e)) => {
                warn!("{name} ({trigger}) failed: {e}");
                ctx.reporter().error(name, &e);
                Err(WatchError::Pipeline(e))
            }
            Err(e) => {
                warn!("{name} ({trigger}) panicked: {e}");
                Err(WatchError::Task(e.to_string()))
            }
        }
    }
}

/// Start one invocation in its own task.
fn dispatch(
    pipeline: Arc<dyn Plugin>,
    ctx: ExecutionContext,
    trigger: Trigger,
    batch: Batch,
) -> impl Future<Output = (Trigger, Outcome)> + Send + 'static {
    let task: JoinHandle<startkit_plugin::Result<Batch>> =
        tokio::spawn(async move { pipeline.run(&ctx, batch).await });

    async move { (trigger, task.await) }
}

/// Collect `add` notifications until the observer is ready.
async fn collect_initial(observation: &mut Observation) -> Result<Batch> {
    let mut buffer: IndexSet<PathBuf> = IndexSet::new();

    loop {
        match observation.next().await {
            Some(ObserverEvent::Event(EventKind::Add, path)) => {
                buffer.insert(path);
            }
            Some(ObserverEvent::Event(kind, path)) => {
                debug!("Ignoring {kind} {} before ready", path.display());
            }
            Some(ObserverEvent::Ready) => break,
            Some(ObserverEvent::Error(e)) => return Err(e),
            None => return Err(WatchError::ObserverClosed),
        }
    }

    Ok(buffer.into_iter().map(FileRecord::new).collect())
}

#[async_trait]
impl Plugin for WatchPipeline {
    fn name(&self) -> &str {
        "watch"
    }

    async fn run(&self, ctx: &ExecutionContext, _input: Batch) -> startkit_plugin::Result<Batch> {
        self.watch(ctx)
            .await
            .map_err(|e| PluginError::Other(anyhow::Error::from(e)))?;
        Ok(Vec::new())
    }
}

/// Handle to a watch running in the background.
pub struct WatchHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl WatchHandle {
    /// Whether the watch has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop watching and wait for in-flight invocations to settle.
    pub async fn stop(self) -> Result<()> {
        self.cancel.cancel();
        self.wait().await
    }

    /// Run until `signal` completes, then stop. Returns early if the watch
    /// ends on its own.
    pub async fn stop_on(mut self, signal: impl Future<Output = ()>) -> Result<()> {
        tokio::select! {
            joined = &mut self.task => {
                return joined.map_err(|e| WatchError::Task(e.to_string()))?;
            }
            () = signal => {}
        }
        info!("Stopping watch");
        self.stop().await
    }

    /// Wait for the watch to end on its own.
    pub async fn wait(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| WatchError::Task(e.to_string()))?
    }
}
