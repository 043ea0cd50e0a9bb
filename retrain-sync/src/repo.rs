//! Repository synchronizer: fast-forward the working copy onto the tracked
//! branch.
//!
//! Two sequential git invocations with the repository as working directory:
//! `git pull origin <branch>` (fetch + fast-forward) then
//! `git checkout <branch>` (land the working copy on the branch). Nonzero
//! exit of either sub-step aborts the pipeline run; there is no automatic
//! retry and no rollback of whatever partial state git left behind.
//!
//! This is the one place outside the environment manager that intentionally
//! mutates disk state.

use std::path::Path;

use tokio::process::Command;

use crate::error::{process_err, SyncError};

/// Fetch remote changes for `branch` and check the working copy out onto it.
pub async fn synchronize(git: &str, repository: &Path, branch: &str) -> Result<(), SyncError> {
    run_git_step(git, repository, "pull", &["pull", "origin", branch]).await?;
    run_git_step(git, repository, "checkout", &["checkout", branch]).await?;
    tracing::info!(branch, repo = %repository.display(), "working copy synchronized");
    Ok(())
}

async fn run_git_step(
    git: &str,
    repository: &Path,
    step: &'static str,
    args: &[&str],
) -> Result<(), SyncError> {
    let status = Command::new(git)
        .args(args)
        .current_dir(repository)
        .status()
        .await
        .map_err(|e| process_err(git, e))?;

    if !status.success() {
        let code = status.code().unwrap_or(-1);
        tracing::error!(step, code, "git sub-step failed");
        return Err(SyncError::Git { step, code });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
