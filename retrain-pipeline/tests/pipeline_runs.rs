//! End-to-end pipeline runs against fake external tools.
//!
//! Every external collaborator (git, change detector, environment manager,
//! job runner) is a scripted shell executable in a TempDir that records its
//! argv and exits with a scripted code.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use retrain_core::{PipelineConfig, Revision, RunStatus, ToolConfig};
use retrain_pipeline::{Orchestrator, PipelineError};
use retrain_sync::SyncError;
use tempfile::TempDir;

const MANIFEST: &str = "\
name: example
conda_env: conda.yaml
entry_points:
  train:
    command: python train.py
  eval:
    command: python eval.py --split=test
";

struct Fixture {
    tools: TempDir,
    repo: TempDir,
}

impl Fixture {
    /// Repo with the `{train, eval}` manifest and a conda declaration.
    fn new() -> Self {
        let repo = TempDir::new().expect("repo");
        fs::write(repo.path().join("MLproject"), MANIFEST).expect("manifest");
        fs::write(repo.path().join("conda.yaml"), "name: example-env\n").expect("env file");
        Self {
            tools: TempDir::new().expect("tools"),
            repo,
        }
    }

    /// Install a fake tool that appends its argv to `<name>.log` and runs `body`.
    fn script(&self, name: &str, body: &str) -> PathBuf {
        let log = self.tools.path().join(format!("{name}.log"));
        let path = self.tools.path().join(name);
        fs::write(
            &path,
            format!("#!/bin/sh\necho \"$@\" >> \"{}\"\n{body}\n", log.display()),
        )
        .expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    fn invocations(&self, name: &str) -> usize {
        fs::read_to_string(self.tools.path().join(format!("{name}.log")))
            .map(|log| log.lines().count())
            .unwrap_or(0)
    }

    fn log(&self, name: &str) -> String {
        fs::read_to_string(self.tools.path().join(format!("{name}.log"))).unwrap_or_default()
    }

    fn config(&self, git: &Path, detector: &Path, env_manager: &Path, runner: &Path) -> PipelineConfig {
        PipelineConfig {
            branch: "main".to_string(),
            repository: self.repo.path().to_path_buf(),
            tools: ToolConfig {
                git: git.display().to_string(),
                detector: detector.display().to_string(),
                env_manager: env_manager.display().to_string(),
                runner: runner.display().to_string(),
            },
            max_concurrent_checks: 4,
        }
    }
}

#[tokio::test]
async fn changed_entry_point_is_detected_and_run() {
    let fx = Fixture::new();
    let git = fx.script("git", "exit 0");
    // Only train.py changed since the trigger revision.
    let detector = fx.script(
        "check-changes",
        "case \"$1\" in *train.py) exit 1;; *) exit 0;; esac",
    );
    let conda = fx.script("conda", "exit 0");
    let mlflow = fx.script("mlflow", "exit 0");

    let orchestrator = Orchestrator::new(fx.config(&git, &detector, &conda, &mlflow));
    let report = orchestrator
        .trigger_run(Revision::from("abc123"))
        .await
        .expect("run");

    assert_eq!(report.run.status, RunStatus::Succeeded);
    assert_eq!(report.checked, 2);
    let names: Vec<_> = report.jobs.iter().map(|j| j.name.0.as_str()).collect();
    assert_eq!(names, vec!["train"]);

    assert_eq!(fx.invocations("git"), 2, "pull + checkout");
    assert_eq!(fx.invocations("mlflow"), 1, "exactly one job run");
    assert!(fx.log("mlflow").contains("-e train"), "got: {}", fx.log("mlflow"));
    assert_eq!(fx.invocations("conda"), 0, "env unchanged — no rebuild");
}

#[tokio::test]
async fn failed_repo_sync_prevents_all_later_stages() {
    let fx = Fixture::new();
    let git = fx.script("git", "exit 4");
    let detector = fx.script("check-changes", "exit 1");
    let conda = fx.script("conda", "exit 0");
    let mlflow = fx.script("mlflow", "exit 0");

    let orchestrator = Orchestrator::new(fx.config(&git, &detector, &conda, &mlflow));
    let err = orchestrator
        .trigger_run(Revision::from("abc123"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, PipelineError::Sync(SyncError::Git { step: "pull", code: 4 })),
        "got: {err}"
    );
    assert_eq!(fx.invocations("check-changes"), 0, "no checks after a failed sync");
    assert_eq!(fx.invocations("conda"), 0);
    assert_eq!(fx.invocations("mlflow"), 0);
}

#[tokio::test]
async fn malformed_manifest_aborts_before_any_check() {
    let fx = Fixture::new();
    fs::write(fx.repo.path().join("MLproject"), ": : broken [yaml").expect("corrupt manifest");
    let git = fx.script("git", "exit 0");
    let detector = fx.script("check-changes", "exit 1");
    let conda = fx.script("conda", "exit 0");
    let mlflow = fx.script("mlflow", "exit 0");

    let orchestrator = Orchestrator::new(fx.config(&git, &detector, &conda, &mlflow));
    let err = orchestrator
        .trigger_run(Revision::from("abc123"))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Descriptor(_)), "got: {err}");
    assert_eq!(fx.invocations("check-changes"), 0);
    assert_eq!(fx.invocations("mlflow"), 0);
}

#[tokio::test]
async fn changed_environment_declaration_is_rebuilt() {
    let fx = Fixture::new();
    let git = fx.script("git", "exit 0");
    // Only the env declaration changed; entry points are untouched.
    let detector = fx.script(
        "check-changes",
        "case \"$1\" in *conda.yaml) exit 1;; *) exit 0;; esac",
    );
    let conda = fx.script("conda", "exit 0");
    let mlflow = fx.script("mlflow", "exit 0");

    let orchestrator = Orchestrator::new(fx.config(&git, &detector, &conda, &mlflow));
    let report = orchestrator
        .trigger_run(Revision::from("abc123"))
        .await
        .expect("run");

    assert_eq!(fx.invocations("conda"), 1, "env manager runs exactly once");
    assert!(fx.log("conda").contains("env update -f"), "got: {}", fx.log("conda"));
    assert!(report.jobs.is_empty(), "no entry point changed");
}

#[tokio::test]
async fn failed_environment_update_aborts_before_dispatch() {
    let fx = Fixture::new();
    let git = fx.script("git", "exit 0");
    let detector = fx.script("check-changes", "exit 1");
    let conda = fx.script("conda", "exit 9");
    let mlflow = fx.script("mlflow", "exit 0");

    let orchestrator = Orchestrator::new(fx.config(&git, &detector, &conda, &mlflow));
    let err = orchestrator
        .trigger_run(Revision::from("abc123"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, PipelineError::Sync(SyncError::EnvUpdate { code: 9 })),
        "got: {err}"
    );
    assert_eq!(fx.invocations("mlflow"), 0, "dispatch must not start");
}

#[tokio::test]
async fn unchanged_repo_dispatches_nothing() {
    let fx = Fixture::new();
    let git = fx.script("git", "exit 0");
    let detector = fx.script("check-changes", "exit 0");
    let conda = fx.script("conda", "exit 0");
    let mlflow = fx.script("mlflow", "exit 0");

    let orchestrator = Orchestrator::new(fx.config(&git, &detector, &conda, &mlflow));

    // Two consecutive runs with the same revision; both stay empty since the
    // working copy no longer differs from itself.
    for _ in 0..2 {
        let report = orchestrator
            .trigger_run(Revision::from("abc123"))
            .await
            .expect("run");
        assert!(report.jobs.is_empty());
        assert_eq!(report.run.status, RunStatus::Succeeded);
    }
    assert_eq!(fx.invocations("mlflow"), 0);
}

#[tokio::test]
async fn entry_point_without_target_is_not_counted_as_checked() {
    let fx = Fixture::new();
    // `clean` has no file token, so nothing is handed to the detector for it.
    fs::write(
        fx.repo.path().join("MLproject"),
        "conda_env: conda.yaml\nentry_points:\n  train:\n    command: python train.py\n  eval:\n    command: python eval.py\n  clean:\n    command: make\n",
    )
    .expect("manifest");
    let git = fx.script("git", "exit 0");
    let detector = fx.script("check-changes", "exit 0");
    let conda = fx.script("conda", "exit 0");
    let mlflow = fx.script("mlflow", "exit 0");

    let orchestrator = Orchestrator::new(fx.config(&git, &detector, &conda, &mlflow));
    let report = orchestrator
        .trigger_run(Revision::from("abc123"))
        .await
        .expect("run");

    assert_eq!(report.checked, 2, "unresolvable entry point must not count");
    assert!(report.jobs.is_empty());
}

#[tokio::test]
async fn concurrent_trigger_is_rejected_while_running() {
    let fx = Fixture::new();
    // Slow git keeps the first run in its sync stage long enough for the
    // second trigger to arrive.
    let git = fx.script("git", "sleep 1\nexit 0");
    let detector = fx.script("check-changes", "exit 0");
    let conda = fx.script("conda", "exit 0");
    let mlflow = fx.script("mlflow", "exit 0");

    let orchestrator = Arc::new(Orchestrator::new(fx.config(&git, &detector, &conda, &mlflow)));

    let first = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.trigger_run(Revision::from("abc123")).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let err = orchestrator
        .trigger_run(Revision::from("def456"))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Busy), "got: {err}");

    first.await.expect("join").expect("first run succeeds");
}
