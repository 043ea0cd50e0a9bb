//! Error types for retrain-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from descriptor loading.
///
/// Every variant is fatal for the pipeline run that hit it: a partial or
/// invalid reload aborts the run instead of replacing valid state.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// Underlying I/O failure, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The `MLproject` manifest did not exist at the repository root.
    #[error("project manifest not found at {path}")]
    ManifestNotFound { path: PathBuf },

    /// Two entry points in the manifest share a name.
    #[error("duplicate entry point '{name}' in project manifest")]
    DuplicateEntryPoint { name: String },

    /// An entry point value was not a `{command: ...}` mapping.
    #[error("entry point '{name}' has no command")]
    InvalidEntryPoint { name: String },
}

/// Convenience constructor for [`DescriptorError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DescriptorError {
    DescriptorError::Io {
        path: path.into(),
        source,
    }
}

/// Errors from loading the process-wide pipeline config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
