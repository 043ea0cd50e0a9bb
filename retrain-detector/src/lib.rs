//! Change-detection subprocess client for Retrain.
//!
//! [`ChangeDetector::check`] launches one external detection process per call
//! and returns a [`CheckHandle`] immediately; awaiting
//! [`CheckHandle::verdict`] blocks until the process exits and maps its exit
//! status to a [`ChangeVerdict`]:
//!
//! ```text
//! <tool> <file> <since> --repo=<repository> [--no-check-imports]
//! ```
//!
//! Exit 0 = unchanged, 1 = changed, anything else = detector error. Callers
//! are expected to treat `Error` as "assume unchanged" rather than fail the
//! whole run.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::{Child, Command};

use retrain_core::ChangeVerdict;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Whether a check inspects the file's dependency closure or the file alone.
///
/// `FileOnly` is used for the environment declaration file, where transitive
/// import scanning is not meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyScan {
    WithDependencies,
    FileOnly,
}

/// Errors from launching or resolving a detector process.
#[derive(Debug, Error)]
pub enum DetectError {
    /// The detector binary could not be spawned at all.
    #[error("failed to spawn detector '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on an already-running detector process failed.
    #[error("failed to wait on detector for {file}: {source}")]
    Wait {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Client for the external per-file change-detection tool.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    program: String,
    repository: PathBuf,
}

/// A launched, not-yet-resolved check. Dropping the handle does not kill the
/// underlying process.
#[derive(Debug)]
pub struct CheckHandle {
    file: PathBuf,
    child: Child,
}

// ---------------------------------------------------------------------------
// Implementation
// ---------------------------------------------------------------------------

impl ChangeDetector {
    pub fn new(program: impl Into<String>, repository: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            repository: repository.into(),
        }
    }

    /// Launch one detection process for `file` against `since`.
    ///
    /// Returns as soon as the process is spawned; resolve the returned handle
    /// with [`CheckHandle::verdict`].
    pub fn check(
        &self,
        file: &Path,
        since: &str,
        scan: DependencyScan,
    ) -> Result<CheckHandle, DetectError> {
        let mut command = Command::new(&self.program);
        command
            .arg(file)
            .arg(since)
            .arg(format!("--repo={}", self.repository.display()));
        if scan == DependencyScan::FileOnly {
            command.arg("--no-check-imports");
        }

        let child = command.spawn().map_err(|e| DetectError::Spawn {
            program: self.program.clone(),
            source: e,
        })?;

        tracing::debug!(
            file = %file.display(),
            since,
            scan = ?scan,
            "launched change check",
        );

        Ok(CheckHandle {
            file: file.to_path_buf(),
            child,
        })
    }
}

impl CheckHandle {
    /// File path this check was launched against.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Block until the detector exits and normalize its exit status.
    pub async fn verdict(mut self) -> Result<ChangeVerdict, DetectError> {
        let status = self.child.wait().await.map_err(|e| DetectError::Wait {
            file: self.file.clone(),
            source: e,
        })?;
        Ok(ChangeVerdict::from_exit_code(status.code()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
