//! # Stock Plugins
//!
//! Ready-made plugins for startkit pipelines.
//!
//! - [`find`]: expand globs into a batch
//! - [`read`]: load file contents
//! - [`exec`]: run a program over the batch paths
//! - [`flow_generate`]: generate Flow type stubs per file

mod command;
pub mod exec;
pub mod find;
pub mod flow_generate;
pub mod read;

pub use exec::{Exec, exec};
pub use find::{Find, find};
pub use flow_generate::{FlowGenerate, flow_generate};
pub use read::{Read, read};
