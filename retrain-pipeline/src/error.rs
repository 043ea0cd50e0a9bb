use thiserror::Error;

/// Fatal error surface of one pipeline run.
///
/// Detector errors and individual job failures never appear here; they are
/// contained to their unit of work inside dispatch.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A run is already in progress; concurrent triggers are rejected
    /// rather than queued.
    #[error("a pipeline run is already in progress")]
    Busy,

    #[error("sync error: {0}")]
    Sync(#[from] retrain_sync::SyncError),

    #[error("descriptor error: {0}")]
    Descriptor(#[from] retrain_core::DescriptorError),

    /// The tokio runtime could not be built for a blocking run.
    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}
