//! Process-wide pipeline configuration.
//!
//! Loaded once at startup from a YAML file and immutable for the process
//! lifetime. Unlike the descriptors in [`crate::descriptor`], the config
//! never changes between runs.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Default config filename, resolved against the current directory.
pub const CONFIG_FILE: &str = "retrain.yaml";

fn default_git() -> String {
    "git".to_string()
}
fn default_detector() -> String {
    "check-changes".to_string()
}
fn default_env_manager() -> String {
    "conda".to_string()
}
fn default_runner() -> String {
    "mlflow".to_string()
}
fn default_max_checks() -> usize {
    8
}

/// External programs the pipeline shells out to.
///
/// Every tool is invoked with an argument list (no shell); only the program
/// names are configurable so deployments and tests can point at alternates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolConfig {
    #[serde(default = "default_git")]
    pub git: String,
    #[serde(default = "default_detector")]
    pub detector: String,
    #[serde(default = "default_env_manager")]
    pub env_manager: String,
    #[serde(default = "default_runner")]
    pub runner: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            git: default_git(),
            detector: default_detector(),
            env_manager: default_env_manager(),
            runner: default_runner(),
        }
    }
}

/// Startup configuration for the pipeline orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PipelineConfig {
    /// Branch whose pushes trigger runs; also the branch the working copy is
    /// synchronized onto.
    pub branch: String,
    /// Absolute path of the managed repository's working copy.
    pub repository: PathBuf,
    #[serde(default)]
    pub tools: ToolConfig,
    /// Upper bound on concurrently outstanding change-detector processes
    /// during dispatch fan-out.
    #[serde(default = "default_max_checks")]
    pub max_concurrent_checks: usize,
}

/// Load the pipeline config from `path`.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
