//! Entry-point dispatcher: fan out change checks, run the changed subset.
//!
//! Fan-out launches one detector process per declared entry point,
//! bounded by a semaphore sized from the pipeline config. Fan-in resolves
//! the checks in declaration order, so the changed set — and the job
//! execution order derived from it — is stable in declaration order even
//! when detector processes finish out of order.
//!
//! Job runs are strictly sequential and mutually isolated: one entry
//! point's nonzero exit is logged and recorded, never allowed to block the
//! remaining jobs.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;

use retrain_core::{ChangeVerdict, EntryPoint, EntrypointName};
use retrain_detector::{ChangeDetector, DependencyScan};

/// The recorded result of one job-runner invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobOutcome {
    pub name: EntrypointName,
    pub exit_code: i32,
}

impl JobOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs change checks across declared entry points and dispatches the
/// changed ones to the job runner.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    detector: ChangeDetector,
    runner: String,
    repository: PathBuf,
    check_permits: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(
        detector: ChangeDetector,
        runner: impl Into<String>,
        repository: impl Into<PathBuf>,
        max_concurrent_checks: usize,
    ) -> Self {
        Self {
            detector,
            runner: runner.into(),
            repository: repository.into(),
            check_permits: Arc::new(Semaphore::new(max_concurrent_checks.max(1))),
        }
    }

    /// Check every entry point against `since` and run the job runner once
    /// for each one whose file (or dependency closure) changed.
    ///
    /// Returns the outcomes of the executed jobs, in entry-point declaration
    /// order. Infallible: unresolvable targets, detector errors, and failed
    /// jobs are all contained to their own entry point.
    pub async fn dispatch_changed(
        &self,
        entry_points: &[EntryPoint],
        since: &str,
    ) -> Vec<JobOutcome> {
        let changed = self.collect_changed(entry_points, since).await;

        let mut outcomes = Vec::with_capacity(changed.len());
        for name in changed {
            outcomes.push(self.run_job(name).await);
        }
        outcomes
    }

    /// Fan-out/fan-in: the changed entry point names, in declaration order.
    async fn collect_changed(
        &self,
        entry_points: &[EntryPoint],
        since: &str,
    ) -> Vec<EntrypointName> {
        let mut checks = Vec::with_capacity(entry_points.len());
        for entry in entry_points {
            let Some(target) = entry.spec.target_path(&self.repository) else {
                tracing::warn!(
                    entrypoint = %entry.name,
                    command = %entry.spec.command,
                    "entry point has no resolvable target file; skipping",
                );
                continue;
            };

            let detector = self.detector.clone();
            let permits = self.check_permits.clone();
            let since = since.to_owned();
            let handle = tokio::spawn(async move {
                // The dispatcher never closes its semaphore; if acquisition
                // fails anyway, run the check unbounded rather than panic.
                let _permit = permits.acquire_owned().await.ok();
                let check = detector.check(&target, &since, DependencyScan::WithDependencies)?;
                check.verdict().await
            });
            checks.push((entry.name.clone(), handle));
        }

        let mut changed = Vec::new();
        for (name, handle) in checks {
            match handle.await {
                Ok(Ok(ChangeVerdict::Changed)) => changed.push(name),
                Ok(Ok(ChangeVerdict::Unchanged)) => {
                    tracing::debug!(entrypoint = %name, "unchanged");
                }
                Ok(Ok(ChangeVerdict::Error(code))) => {
                    tracing::warn!(
                        entrypoint = %name,
                        code,
                        "change check errored; assuming unchanged",
                    );
                }
                Ok(Err(err)) => {
                    tracing::warn!(
                        entrypoint = %name,
                        error = %err,
                        "change check failed to run; assuming unchanged",
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        entrypoint = %name,
                        error = %err,
                        "change check task panicked; assuming unchanged",
                    );
                }
            }
        }
        changed
    }

    /// Invoke the job runner once for `name` and record its exit status.
    async fn run_job(&self, name: EntrypointName) -> JobOutcome {
        tracing::info!(entrypoint = %name, "running changed entry point");
        let status = tokio::process::Command::new(&self.runner)
            .arg("run")
            .arg(&self.repository)
            .arg("-e")
            .arg(&name.0)
            .status()
            .await;

        let exit_code = match status {
            Ok(status) => status.code().unwrap_or(-1),
            Err(err) => {
                tracing::error!(entrypoint = %name, error = %err, "job runner failed to spawn");
                -1
            }
        };

        if exit_code != 0 {
            tracing::error!(entrypoint = %name, exit_code, "entry point run failed");
        } else {
            tracing::info!(entrypoint = %name, "entry point run finished");
        }

        JobOutcome { name, exit_code }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
