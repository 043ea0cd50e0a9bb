//! # retrain-core
//!
//! Domain types and descriptor loading for the Retrain pipeline.
//!
//! Call [`descriptor::load_project_descriptor`] to read a repository's
//! `MLproject` manifest together with the environment declaration it names,
//! or [`config::load_config`] to read the process-wide pipeline config.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod types;

pub use config::{PipelineConfig, ToolConfig};
pub use error::{ConfigError, DescriptorError};
pub use types::{
    ChangeVerdict, CommandSpec, EntryPoint, EntrypointName, EnvironmentDescriptor,
    PipelineRun, ProjectDescriptor, Revision, RunStatus,
};
