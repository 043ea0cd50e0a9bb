//! # retrain-pipeline
//!
//! Entry-point dispatcher and pipeline orchestrator.
//!
//! [`Orchestrator::trigger_run`] executes one full pipeline sequence for a
//! triggering revision: sync the working copy, reload the descriptors,
//! rebuild the environment if its declaration changed, then re-run every
//! entry point whose file changed since that revision.

pub mod dispatch;
mod error;
pub mod orchestrator;

pub use dispatch::{Dispatcher, JobOutcome};
pub use error::PipelineError;
pub use orchestrator::{run_blocking, Orchestrator, PipelineStage, RunReport};
