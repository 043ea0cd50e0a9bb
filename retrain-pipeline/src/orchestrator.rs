//! Pipeline orchestrator: the stage machine behind one triggered run.
//!
//! Stage sequence for a trigger carrying `before_revision`:
//!
//! ```text
//! SyncingRepo → ReloadingConfig → SyncingEnvironment → DetectingChanges → Dispatching
//! ```
//!
//! A fatal failure in any of the first four stages aborts the run; job-level
//! failures during dispatch are isolated and never fail the run. The
//! orchestrator is reusable across runs — nothing persists between runs
//! beyond logs.
//!
//! Concurrent triggers are rejected, not queued: a second trigger while a
//! run is active gets [`PipelineError::Busy`] immediately.

use std::time::Instant;

use serde::Serialize;
use tokio::sync::Mutex;

use retrain_core::{descriptor, PipelineConfig, PipelineRun, Revision, RunStatus};
use retrain_detector::ChangeDetector;
use retrain_sync::{env, repo};

use crate::dispatch::{Dispatcher, JobOutcome};
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// The active stage of a pipeline run, used for per-step logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    SyncingRepo,
    ReloadingConfig,
    SyncingEnvironment,
    DetectingChanges,
    Dispatching,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::SyncingRepo => "syncing-repo",
            PipelineStage::ReloadingConfig => "reloading-config",
            PipelineStage::SyncingEnvironment => "syncing-environment",
            PipelineStage::DetectingChanges => "detecting-changes",
            PipelineStage::Dispatching => "dispatching",
        };
        f.write_str(name)
    }
}

/// Serializable summary of one completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run: PipelineRun,
    /// Number of entry points whose files were handed to the change
    /// detector. Entries without a resolvable target file are not counted.
    pub checked: usize,
    /// Outcomes of the jobs that ran, in declaration order.
    pub jobs: Vec<JobOutcome>,
    pub duration_ms: u128,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Top-level pipeline state machine. One instance serves the whole process;
/// `trigger_run` may be called repeatedly, but never concurrently.
#[derive(Debug)]
pub struct Orchestrator {
    config: PipelineConfig,
    run_guard: Mutex<()>,
}

impl Orchestrator {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            run_guard: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute one full pipeline sequence for `before_revision`.
    ///
    /// Returns [`PipelineError::Busy`] without side effects when a run is
    /// already in progress.
    pub async fn trigger_run(&self, before_revision: Revision) -> Result<RunReport, PipelineError> {
        let _guard = self
            .run_guard
            .try_lock()
            .map_err(|_| PipelineError::Busy)?;

        let started = Instant::now();
        let mut run = PipelineRun::start(before_revision.clone());
        tracing::info!(before = %before_revision, "pipeline run triggered");

        match self.execute(&before_revision).await {
            Ok((checked, jobs)) => {
                run.status = RunStatus::Succeeded;
                let report = RunReport {
                    run,
                    checked,
                    jobs,
                    duration_ms: started.elapsed().as_millis(),
                };
                tracing::info!(
                    checked = report.checked,
                    dispatched = report.jobs.len(),
                    duration_ms = report.duration_ms,
                    "pipeline run finished",
                );
                Ok(report)
            }
            Err(err) => {
                run.status = RunStatus::Failed(err.to_string());
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        before_revision: &Revision,
    ) -> Result<(usize, Vec<JobOutcome>), PipelineError> {
        let tools = &self.config.tools;
        let repository = &self.config.repository;

        // Stage 1: land the working copy on the tracked branch.
        self.enter(PipelineStage::SyncingRepo);
        repo::synchronize(&tools.git, repository, &self.config.branch)
            .await
            .map_err(|e| self.fail(PipelineStage::SyncingRepo, e))?;

        // Stage 2: reload both descriptors from the now-updated working copy.
        // Parse failure aborts here, before any further tool runs.
        self.enter(PipelineStage::ReloadingConfig);
        let (project, environment) = descriptor::load_project_descriptor(repository)
            .map_err(|e| self.fail(PipelineStage::ReloadingConfig, e))?;
        tracing::info!(
            environment = %environment.name,
            entry_points = project.entry_points.len(),
            "descriptors reloaded",
        );

        let detector = ChangeDetector::new(tools.detector.clone(), repository.clone());

        // Stage 3: rebuild the environment if its declaration changed.
        self.enter(PipelineStage::SyncingEnvironment);
        let env_file = repository.join(&project.environment_file);
        env::sync_if_changed(&tools.env_manager, &detector, &env_file, &before_revision.0)
            .await
            .map_err(|e| self.fail(PipelineStage::SyncingEnvironment, e))?;

        // Stages 4–5: fan out checks, then run the changed subset. Job-level
        // failures are already contained inside the dispatcher.
        self.enter(PipelineStage::DetectingChanges);
        let dispatcher = Dispatcher::new(
            detector,
            tools.runner.clone(),
            repository.clone(),
            self.config.max_concurrent_checks,
        );
        self.enter(PipelineStage::Dispatching);
        let jobs = dispatcher
            .dispatch_changed(&project.entry_points, &before_revision.0)
            .await;

        let checked = project
            .entry_points
            .iter()
            .filter(|entry| entry.spec.target_path(repository).is_some())
            .count();
        Ok((checked, jobs))
    }

    fn enter(&self, stage: PipelineStage) {
        tracing::info!(stage = %stage, "pipeline stage");
    }

    fn fail<E: Into<PipelineError>>(&self, stage: PipelineStage, err: E) -> PipelineError {
        let err = err.into();
        tracing::error!(stage = %stage, error = %err, "pipeline stage failed; aborting run");
        err
    }
}

// ---------------------------------------------------------------------------
// Blocking entrypoint
// ---------------------------------------------------------------------------

/// Build a runtime, initialize tracing, and drive one pipeline run to
/// completion. Used by the CLI trigger.
pub fn run_blocking(
    config: PipelineConfig,
    before_revision: Revision,
) -> Result<RunReport, PipelineError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let orchestrator = Orchestrator::new(config);
        orchestrator.trigger_run(before_revision).await
    })
}

// Logs go to stderr: stdout belongs to the CLI's report output (plain or
// JSON) and must stay parseable.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_match_log_vocabulary() {
        assert_eq!(PipelineStage::SyncingRepo.to_string(), "syncing-repo");
        assert_eq!(PipelineStage::ReloadingConfig.to_string(), "reloading-config");
        assert_eq!(PipelineStage::Dispatching.to_string(), "dispatching");
    }

    #[test]
    fn busy_error_is_descriptive() {
        assert!(PipelineError::Busy.to_string().contains("already in progress"));
    }
}
