//! Error types for retrain-sync.

use thiserror::Error;

/// All errors that can arise from repository or environment synchronization.
///
/// Every variant aborts the pipeline run that hit it; neither synchronizer
/// retries on its own.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A git sub-step exited nonzero. The working copy is left in whatever
    /// partial state git left it; git's own partial-operation semantics apply.
    #[error("git {step} exited with code {code}")]
    Git { step: &'static str, code: i32 },

    /// The environment manager reported a failed rebuild.
    #[error("environment update exited with code {code}")]
    EnvUpdate { code: i32 },

    /// Spawning or waiting on a tool process failed before it could report
    /// an exit status.
    #[error("failed to run {tool}: {source}")]
    Process {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn process_err(tool: impl Into<String>, source: std::io::Error) -> SyncError {
    SyncError::Process {
        tool: tool.into(),
        source,
    }
}
