//! # Pipeline Plugins
//!
//! Shared vocabulary for startkit pipelines: the file records exchanged
//! between stages, the execution context handed to every stage, and the
//! composers that chain stages together.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Pipeline                                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Batch ──► Plugin ──► Batch ──► Plugin ──► Batch               │
//! │              │                    │                             │
//! │              ▼                    ▼                             │
//! │      ExecutionContext ──► Reporter (logging sink)              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use startkit_plugin::{ExecutionContext, Plugin, Sequence};
//!
//! let pipeline = Sequence::new().then(find).then(read);
//! let output = pipeline.run(&ExecutionContext::new(), Vec::new()).await?;
//! ```

pub mod compose;
pub mod context;
pub mod error;
pub mod plugin;
pub mod record;

pub use compose::{Parallel, Sequence};
pub use context::{ExecutionContext, MemoryReporter, Report, Reporter, TracingReporter};
pub use error::{PluginError, Result};
pub use plugin::{FnPlugin, Plugin, plugin_fn};
pub use record::{Batch, FileRecord};
