//! Environment synchronizer: rebuild the declared environment when its
//! declaration file changed since a revision.
//!
//! The declaration file is checked with transitive import scanning disabled
//! (dependency closure is meaningless for an environment file). Detector
//! errors — including a detector that cannot be spawned at all — degrade to
//! "assume unchanged": under-triggering an environment rebuild is preferred
//! over crashing the pipeline on a flaky detector.

use std::path::Path;

use retrain_core::ChangeVerdict;
use retrain_detector::{ChangeDetector, DependencyScan};

use crate::error::{process_err, SyncError};

/// Check the environment declaration at `env_file` against `since` and, if
/// it changed, invoke the environment manager's update operation on it.
///
/// Fails with [`SyncError::EnvUpdate`] only when the manager itself reports
/// a failed rebuild.
pub async fn sync_if_changed(
    env_manager: &str,
    detector: &ChangeDetector,
    env_file: &Path,
    since: &str,
) -> Result<(), SyncError> {
    let verdict = match detector.check(env_file, since, DependencyScan::FileOnly) {
        Ok(handle) => handle.verdict().await,
        Err(err) => Err(err),
    };

    match verdict {
        Ok(ChangeVerdict::Changed) => update_environment(env_manager, env_file).await,
        Ok(ChangeVerdict::Unchanged) => {
            tracing::debug!(file = %env_file.display(), "environment declaration unchanged");
            Ok(())
        }
        Ok(ChangeVerdict::Error(code)) => {
            tracing::warn!(
                file = %env_file.display(),
                code,
                "environment change check errored; assuming unchanged",
            );
            Ok(())
        }
        Err(err) => {
            tracing::warn!(
                file = %env_file.display(),
                error = %err,
                "environment change check failed to run; assuming unchanged",
            );
            Ok(())
        }
    }
}

async fn update_environment(env_manager: &str, env_file: &Path) -> Result<(), SyncError> {
    tracing::info!(file = %env_file.display(), "environment declaration changed; updating");
    let status = tokio::process::Command::new(env_manager)
        .arg("env")
        .arg("update")
        .arg("-f")
        .arg(env_file)
        .status()
        .await
        .map_err(|e| process_err(env_manager, e))?;

    if !status.success() {
        let code = status.code().unwrap_or(-1);
        tracing::error!(code, "environment update failed");
        return Err(SyncError::EnvUpdate { code });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
