//! Project configuration from `[tool.pyext-release]`.
//!
//! Precedence, highest first: command line flag, environment variable (both
//! handled by clap), the pyproject table, built-in defaults.

use crate::build::DEFAULT_PURGE_TARGETS;
use crate::environment::{self, SystemPackage};
use crate::error::{DescriptorError, Result};
use crate::metadata::{PYPROJECT_FILE, load_pyproject};
use crate::pipeline::PipelineConfig;
use crate::publish::DEFAULT_REPOSITORY_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the table under `[tool]`
pub const TOOL_TABLE: &str = "pyext-release";

/// Default artifact directory, relative to the project
pub const DEFAULT_OUTPUT_DIR: &str = "dist";

/// Default Python interpreter
pub const DEFAULT_PYTHON: &str = "python3";

/// Release settings; unset fields fall back to defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ReleaseConfig {
    /// Artifact directory, relative to the project unless absolute
    pub output_dir: Option<PathBuf>,
    /// Stale outputs to purge before building
    pub purge: Option<Vec<String>>,
    /// Upload endpoint
    pub repository_url: Option<String>,
    /// Python interpreter
    pub python: Option<String>,
    /// Replaces the default system package list
    pub system_packages: Option<Vec<SystemPackage>>,
}

impl ReleaseConfig {
    /// Read `[tool.pyext-release]` from the project's pyproject.toml, if any
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(PYPROJECT_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }

        let file = load_pyproject(&path)?;
        let Some(table) = file.tool.and_then(|mut tool| tool.remove(TOOL_TABLE)) else {
            return Ok(Self::default());
        };
        log::debug!("Loaded [tool.{}] from {}", TOOL_TABLE, path.display());
        table.try_into().map_err(|e: toml::de::Error| {
            DescriptorError::ParseFailed {
                path,
                reason: format!("[tool.{}]: {}", TOOL_TABLE, e.message()),
            }
            .into()
        })
    }

    /// Overlay values given on the command line or through the environment
    pub fn merge(mut self, overrides: ReleaseConfig) -> Self {
        if overrides.output_dir.is_some() {
            self.output_dir = overrides.output_dir;
        }
        if overrides.purge.is_some() {
            self.purge = overrides.purge;
        }
        if overrides.repository_url.is_some() {
            self.repository_url = overrides.repository_url;
        }
        if overrides.python.is_some() {
            self.python = overrides.python;
        }
        if overrides.system_packages.is_some() {
            self.system_packages = overrides.system_packages;
        }
        self
    }

    /// Effective Python interpreter
    pub fn python(&self) -> &str {
        self.python.as_deref().unwrap_or(DEFAULT_PYTHON)
    }

    /// Effective artifact directory for a project
    pub fn output_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(
            self.output_dir
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_OUTPUT_DIR)),
        )
    }

    /// Effective purge list
    pub fn purge_targets(&self) -> Vec<String> {
        self.purge.clone().unwrap_or_else(|| {
            DEFAULT_PURGE_TARGETS.iter().map(|s| s.to_string()).collect()
        })
    }

    /// Resolve into pipeline settings for a project directory
    pub fn pipeline_config(&self, project_dir: &Path) -> PipelineConfig {
        PipelineConfig {
            project_dir: project_dir.to_path_buf(),
            output_dir: self.output_dir(project_dir),
            repository_url: self
                .repository_url
                .clone()
                .unwrap_or_else(|| DEFAULT_REPOSITORY_URL.to_string()),
            purge: self.purge_targets(),
            system_packages: self
                .system_packages
                .clone()
                .unwrap_or_else(environment::default_system_packages),
            python: self.python().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Probe;

    #[test]
    fn test_missing_pyproject_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReleaseConfig::load(dir.path()).unwrap();
        assert_eq!(config, ReleaseConfig::default());

        let pipeline = config.pipeline_config(dir.path());
        assert_eq!(pipeline.output_dir, dir.path().join("dist"));
        assert_eq!(pipeline.repository_url, DEFAULT_REPOSITORY_URL);
        assert_eq!(pipeline.python, "python3");
        assert_eq!(pipeline.purge, vec!["build", "*.egg-info"]);
    }

    #[test]
    fn test_loads_tool_table() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pyproject.toml"),
            r#"
[project]
name = "gbinder"
version = "1.2.7"

[tool.pyext-release]
output-dir = "wheelhouse"
repository-url = "https://test.pypi.org/legacy/"

[[tool.pyext-release.system-packages]]
name = "libgbinder-dev"
pkg-config = "libgbinder"
vendor = { repository = "https://github.com/mer-hybris/libgbinder.git", tag = "v1.1.42" }
"#,
        )
        .unwrap();

        let config = ReleaseConfig::load(dir.path()).unwrap();
        assert_eq!(config.output_dir, Some(PathBuf::from("wheelhouse")));
        let packages = config.system_packages.as_ref().unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].probe, Probe::PkgConfig("libgbinder".to_string()));
        assert_eq!(packages[0].vendor.as_ref().unwrap().tag, "v1.1.42");

        let pipeline = config.pipeline_config(dir.path());
        assert_eq!(pipeline.output_dir, dir.path().join("wheelhouse"));
        assert_eq!(pipeline.repository_url, "https://test.pypi.org/legacy/");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pyproject.toml"),
            "[tool.pyext-release]\noutput_directory = \"out\"\n",
        )
        .unwrap();
        assert!(ReleaseConfig::load(dir.path()).is_err());
    }

    #[test]
    fn test_overrides_win() {
        let file = ReleaseConfig {
            python: Some("python3.11".to_string()),
            repository_url: Some("https://test.pypi.org/legacy/".to_string()),
            ..Default::default()
        };
        let merged = file.merge(ReleaseConfig {
            python: Some("/opt/python/bin/python".to_string()),
            ..Default::default()
        });
        assert_eq!(merged.python(), "/opt/python/bin/python");
        assert_eq!(
            merged.repository_url.as_deref(),
            Some("https://test.pypi.org/legacy/")
        );
    }
}
