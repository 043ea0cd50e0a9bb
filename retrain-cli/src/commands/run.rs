//! `retrain run` — trigger one pipeline run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use retrain_core::{config, Revision};
use retrain_pipeline::{run_blocking, RunReport};

/// Arguments for `retrain run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Revision the push started from (the webhook's `before` field).
    #[arg(long)]
    pub before: String,

    /// Path of the pipeline config file.
    #[arg(long, default_value = config::CONFIG_FILE)]
    pub config: PathBuf,

    /// Print the run report as JSON instead of a human-readable summary.
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let pipeline_config = config::load_config(&self.config)
            .with_context(|| format!("failed to load {}", self.config.display()))?;

        let report = run_blocking(pipeline_config, Revision::from(self.before))
            .context("pipeline run failed")?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        Ok(())
    }
}

fn print_report(report: &RunReport) {
    if report.jobs.is_empty() {
        println!(
            "✓ nothing to do — no entry point changed since {} ({} checked, {}ms)",
            report.run.before_revision, report.checked, report.duration_ms
        );
        return;
    }

    println!(
        "✓ dispatched {} of {} entry points since {} ({}ms)",
        report.jobs.len(),
        report.checked,
        report.run.before_revision,
        report.duration_ms
    );
    for job in &report.jobs {
        if job.succeeded() {
            println!("  ✎  {} (ok)", job.name);
        } else {
            println!("  ✗  {} (exit {})", job.name, job.exit_code);
        }
    }
}
