//! Compilation pipeline.
//!
//! - [`staleness`] - Timestamp comparison between artifacts and their inputs
//! - [`artifact`] - Artifact and build folder naming
//! - [`modules`] - Module precompilation through child invocations
//! - [`command`] - Compiler argument vectors
//! - [`executor`] - Process execution
//! - [`matrix`] - Every backend with every standard

pub mod artifact;
pub mod command;
pub mod executor;
pub mod invoke;
pub mod matrix;
pub mod modules;
pub mod pipeline;
pub mod staleness;

pub use invoke::{Invoker, SelfInvoker};
pub use matrix::run_matrix;
pub use pipeline::{Compiled, clean, compile, run_program};
