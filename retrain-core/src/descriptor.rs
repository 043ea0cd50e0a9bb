//! Project and environment descriptor loading.
//!
//! # Manifest layout
//!
//! ```text
//! <repo>/
//!   MLproject          (project manifest — names the env file + entry points)
//!   <conda_env path>   (environment declaration — carries the env name)
//! ```
//!
//! Both files are reloaded together on every pipeline run and parsed before
//! either descriptor is handed to the orchestrator; a failure in either file
//! aborts the reload as a whole. No caching across runs.

use std::path::Path;

use serde::Deserialize;

use crate::error::{io_err, DescriptorError};
use crate::types::{
    CommandSpec, EntryPoint, EntrypointName, EnvironmentDescriptor, ProjectDescriptor,
};

/// Fixed manifest filename at the repository root.
pub const MANIFEST_FILE: &str = "MLproject";

/// Raw shape of the `MLproject` manifest on disk.
///
/// `entry_points` stays a `serde_yaml::Mapping` here so that declaration
/// order survives deserialization; it is validated into a `Vec<EntryPoint>`
/// below.
#[derive(Debug, Deserialize)]
struct RawManifest {
    conda_env: std::path::PathBuf,
    entry_points: serde_yaml::Mapping,
}

#[derive(Debug, Deserialize)]
struct RawEntryPoint {
    command: String,
}

/// Load the project manifest and, chained, the environment declaration it
/// names.
///
/// Returns `DescriptorError::ManifestNotFound` if `MLproject` is absent and
/// `DescriptorError::Parse` (with path context) if either file is malformed
/// or missing a required field.
pub fn load_project_descriptor(
    repo: &Path,
) -> Result<(ProjectDescriptor, EnvironmentDescriptor), DescriptorError> {
    let manifest_path = repo.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Err(DescriptorError::ManifestNotFound {
            path: manifest_path,
        });
    }

    let contents =
        std::fs::read_to_string(&manifest_path).map_err(|e| io_err(&manifest_path, e))?;
    let raw: RawManifest = serde_yaml::from_str(&contents).map_err(|e| DescriptorError::Parse {
        path: manifest_path.clone(),
        source: e,
    })?;

    let mut entry_points = Vec::with_capacity(raw.entry_points.len());
    let mut seen = std::collections::HashSet::new();
    for (key, value) in raw.entry_points {
        let name = key.as_str().map(str::to_owned).ok_or_else(|| {
            DescriptorError::InvalidEntryPoint {
                name: format!("{key:?}"),
            }
        })?;
        if !seen.insert(name.clone()) {
            return Err(DescriptorError::DuplicateEntryPoint { name });
        }
        let raw_entry: RawEntryPoint = serde_yaml::from_value(value)
            .map_err(|_| DescriptorError::InvalidEntryPoint { name: name.clone() })?;
        entry_points.push(EntryPoint {
            name: EntrypointName(name),
            spec: CommandSpec {
                command: raw_entry.command,
            },
        });
    }

    let project = ProjectDescriptor {
        environment_file: raw.conda_env,
        entry_points,
    };

    let environment = load_environment_descriptor(repo, &project)?;
    Ok((project, environment))
}

/// Parse the environment declaration file a manifest names.
fn load_environment_descriptor(
    repo: &Path,
    project: &ProjectDescriptor,
) -> Result<EnvironmentDescriptor, DescriptorError> {
    let path = repo.join(&project.environment_file);
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| DescriptorError::Parse { path, source: e })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;

    fn write_repo(manifest: &str, env: Option<&str>) -> TempDir {
        let repo = TempDir::new().expect("tempdir");
        fs::write(repo.path().join(MANIFEST_FILE), manifest).expect("write manifest");
        if let Some(env) = env {
            fs::write(repo.path().join("conda.yaml"), env).expect("write env file");
        }
        repo
    }

    const MANIFEST: &str = "\
name: example
conda_env: conda.yaml
entry_points:
  train:
    command: python train.py
  eval:
    command: python eval.py --split=test
";

    #[test]
    fn load_parses_both_descriptors() {
        let repo = write_repo(MANIFEST, Some("name: example-env\ndependencies: [numpy]\n"));
        let (project, environment) =
            load_project_descriptor(repo.path()).expect("load");

        assert_eq!(project.environment_file, PathBuf::from("conda.yaml"));
        assert_eq!(environment.name, "example-env");

        let names: Vec<_> = project
            .entry_points
            .iter()
            .map(|e| e.name.0.as_str())
            .collect();
        assert_eq!(names, vec!["train", "eval"], "declaration order preserved");
        assert_eq!(project.entry_points[1].spec.command, "python eval.py --split=test");
    }

    #[test]
    fn missing_manifest_is_not_found() {
        let repo = TempDir::new().expect("tempdir");
        let err = load_project_descriptor(repo.path()).unwrap_err();
        assert!(matches!(err, DescriptorError::ManifestNotFound { .. }), "got: {err}");
        assert!(err.to_string().contains("MLproject"));
    }

    #[test]
    fn malformed_manifest_is_parse_error_with_path() {
        let repo = write_repo(": : not yaml : [unclosed", None);
        let err = load_project_descriptor(repo.path()).unwrap_err();
        assert!(matches!(err, DescriptorError::Parse { .. }), "got: {err}");
        assert!(err.to_string().contains(MANIFEST_FILE), "got: {err}");
    }

    #[test]
    fn manifest_without_entry_points_is_parse_error() {
        let repo = write_repo("conda_env: conda.yaml\n", None);
        let err = load_project_descriptor(repo.path()).unwrap_err();
        assert!(matches!(err, DescriptorError::Parse { .. }), "got: {err}");
    }

    #[test]
    fn entry_point_without_command_is_invalid() {
        let repo = write_repo(
            "conda_env: conda.yaml\nentry_points:\n  train:\n    cmd: wrong-key\n",
            Some("name: e\n"),
        );
        let err = load_project_descriptor(repo.path()).unwrap_err();
        assert!(matches!(err, DescriptorError::InvalidEntryPoint { .. }), "got: {err}");
        assert!(err.to_string().contains("train"));
    }

    #[test]
    fn missing_env_file_fails_the_whole_load() {
        let repo = write_repo(MANIFEST, None);
        let err = load_project_descriptor(repo.path()).unwrap_err();
        assert!(matches!(err, DescriptorError::Io { .. }), "got: {err}");
        assert!(err.to_string().contains("conda.yaml"), "got: {err}");
    }

    #[test]
    fn env_file_without_name_is_parse_error() {
        let repo = write_repo(MANIFEST, Some("dependencies: [numpy]\n"));
        let err = load_project_descriptor(repo.path()).unwrap_err();
        assert!(matches!(err, DescriptorError::Parse { .. }), "got: {err}");
    }
}
