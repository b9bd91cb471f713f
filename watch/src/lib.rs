//! # Watch
//!
//! Turns any startkit pipeline into a long-running watch service. The
//! pipeline runs once over every file the globs match, then once more for
//! each single change afterwards.
//!
//! ## Features
//!
//! - **Initial Batch**: Every existing match is collected before the first run
//! - **Per-kind Re-arming**: One invocation per event kind in flight at a time
//! - **Self-healing**: Failed or panicking invocations never stop the watch
//! - **Graceful Stop**: Background watches drain in-flight runs on stop
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            Watch                                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  WatchConfig ──► GlobObserver ──► ObserverEvent                │
//! │       │               │                 │                       │
//! │       ▼               ▼                 ▼                       │
//! │  WatchOptions      notify          WatchPipeline ──► Plugin     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use startkit_watch::{WatchConfig, watch};
//!
//! let handle = watch(WatchConfig::new("src/**/*.ts"))
//!     .wrap(pipeline)
//!     .spawn(ExecutionContext::new());
//! tokio::signal::ctrl_c().await?;
//! handle.stop().await?;
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod observer;
pub mod trigger;

pub use config::{WatchConfig, WatchOptions};
pub use error::{Result, WatchError};
pub use event::{EventKind, ObserverEvent, classify};
pub use observer::{ChannelObserver, GlobObserver, Observation, Observer};
pub use trigger::{WATCHING_MESSAGE, WatchHandle, WatchPipeline, WatchTrigger, watch};
