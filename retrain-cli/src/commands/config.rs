//! `retrain config` — parse and print the resolved pipeline config.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use retrain_core::config;

/// Arguments for `retrain config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Path of the pipeline config file.
    #[arg(long, default_value = config::CONFIG_FILE)]
    pub config: PathBuf,
}

impl ConfigArgs {
    pub fn run(self) -> Result<()> {
        let resolved = config::load_config(&self.config)
            .with_context(|| format!("failed to load {}", self.config.display()))?;

        println!("branch:                {}", resolved.branch);
        println!("repository:            {}", resolved.repository.display());
        println!("max concurrent checks: {}", resolved.max_concurrent_checks);
        println!("tools:");
        println!("  git:         {}", resolved.tools.git);
        println!("  detector:    {}", resolved.tools.detector);
        println!("  env manager: {}", resolved.tools.env_manager);
        println!("  runner:      {}", resolved.tools.runner);
        Ok(())
    }
}
