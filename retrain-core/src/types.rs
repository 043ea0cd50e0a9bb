//! Domain types for the Retrain pipeline.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! Descriptor types are deserializable via serde + serde_yaml.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed name for a declared entry point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntrypointName(pub String);

impl fmt::Display for EntrypointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for EntrypointName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntrypointName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed revision identifier (e.g. a commit hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision(pub String);

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Revision {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Revision {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

/// The normalized result of one change-detection invocation.
///
/// Only meaningful relative to the exact `(file, revision)` pair that
/// produced it; verdicts are never cached or reused across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeVerdict {
    /// Exit status 0 — the file (and its scanned dependencies) did not change.
    Unchanged,
    /// Exit status 1 — the file or a scanned dependency changed.
    Changed,
    /// Any other exit status. Callers assume unchanged rather than fail the run.
    Error(i32),
}

impl ChangeVerdict {
    /// Map a detector exit code to a verdict. A missing code (killed by
    /// signal) maps to `Error(-1)`.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => ChangeVerdict::Unchanged,
            Some(1) => ChangeVerdict::Changed,
            Some(other) => ChangeVerdict::Error(other),
            None => ChangeVerdict::Error(-1),
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, ChangeVerdict::Changed)
    }
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// The command string a declared entry point executes.
///
/// Follows the MLproject convention `"<interpreter> <file> [args...]"`; the
/// second whitespace token is the file the entry point runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub command: String,
}

impl CommandSpec {
    /// Absolute path of the file this command targets, resolved against the
    /// repository root. `None` when the command has no second token.
    pub fn target_path(&self, repo: &Path) -> Option<PathBuf> {
        let file = self.command.split_whitespace().nth(1)?;
        Some(repo.join(file))
    }
}

/// A named entry point declared in the project manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub name: EntrypointName,
    pub spec: CommandSpec,
}

/// In-memory form of the `MLproject` manifest.
///
/// `entry_points` preserves declaration order from the manifest; the loader
/// enforces name uniqueness. Reloaded fresh on every pipeline run — never
/// cached, since the manifest itself may change after a pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    /// Path of the environment declaration file, relative to the repo root.
    pub environment_file: PathBuf,
    pub entry_points: Vec<EntryPoint>,
}

/// Parsed environment declaration (e.g. a conda environment file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentDescriptor {
    pub name: String,
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

/// Terminal state of one orchestrated run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed(String),
}

/// Ephemeral value object scoping one trigger. Not persisted; no run
/// history is retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineRun {
    pub before_revision: Revision,
    pub started_at: DateTime<Utc>,
    pub status: RunStatus,
}

impl PipelineRun {
    pub fn start(before_revision: Revision) -> Self {
        Self {
            before_revision,
            started_at: Utc::now(),
            status: RunStatus::Running,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
