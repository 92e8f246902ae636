//! Artifact build: purge stale outputs, run the build frontend, collect and verify.

mod artifacts;

pub use artifacts::{Artifact, ArtifactKind, ArtifactSet};

use crate::error::{BuildError, Result};
use crate::process;
use path_absolutize::Absolutize;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};

/// Build outputs removed before every build, relative to the project
pub const DEFAULT_PURGE_TARGETS: &[&str] = &["build", "*.egg-info"];

/// Produces distributions for a project into an output directory
pub trait ArtifactBuilder: Send + Sync {
    /// Build an sdist and wheel(s) for `project_dir` into `output_dir`
    fn build(
        &self,
        project_dir: &Path,
        output_dir: &Path,
        env: &BTreeMap<String, String>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// PEP 517 build via `python -m build`
#[derive(Debug, Clone)]
pub struct PythonBuild {
    python: String,
}

impl PythonBuild {
    /// Build with the given interpreter
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }
}

impl ArtifactBuilder for PythonBuild {
    async fn build(
        &self,
        project_dir: &Path,
        output_dir: &Path,
        env: &BTreeMap<String, String>,
    ) -> Result<()> {
        let out = output_dir.to_string_lossy();
        let args = [
            "-m",
            "build",
            "--sdist",
            "--wheel",
            "--no-isolation",
            "--outdir",
            out.as_ref(),
        ];
        let command = process::display_command(&self.python, &args);
        log::info!("Building: {}", command);

        let output = process::run(&self.python, &args, Some(project_dir), env).await?;
        if !output.success {
            return Err(BuildError::CommandFailed {
                command,
                reason: output.stderr_tail(),
            }
            .into());
        }
        Ok(())
    }
}

/// Remove stale build outputs and recreate an empty output directory
///
/// Nothing is removed unless the output directory is separate from the
/// project and every purge match lies strictly inside the project. Returns
/// the paths that were removed.
pub fn purge_outputs(
    project_dir: &Path,
    output_dir: &Path,
    targets: &[String],
) -> Result<Vec<PathBuf>> {
    let project = resolve(project_dir).map_err(|e| purge_failed(project_dir, e))?;
    ensure_separate(project_dir, output_dir)?;

    let mut paths = vec![output_dir.to_path_buf()];
    let base = glob::Pattern::escape(&project_dir.to_string_lossy());
    for target in targets {
        let pattern = Path::new(&base).join(target);
        let matches = glob::glob(&pattern.to_string_lossy()).map_err(|e| BuildError::PurgeFailed {
            path: pattern.clone(),
            reason: e.to_string(),
        })?;
        for path in matches.filter_map(|m| m.ok()) {
            let entry = resolve_entry(&path).map_err(|e| purge_failed(&path, e))?;
            if entry == project || !entry.starts_with(&project) {
                return Err(BuildError::PurgeFailed {
                    path,
                    reason: format!("purge target '{}' reaches outside {}", target, project.display()),
                }
                .into());
            }
            paths.push(path);
        }
    }

    let mut removed = Vec::new();
    for path in paths {
        let Ok(meta) = std::fs::symlink_metadata(&path) else {
            continue;
        };
        let result = if meta.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        result.map_err(|e| purge_failed(&path, e))?;
        log::debug!("Purged {}", path.display());
        removed.push(path);
    }

    std::fs::create_dir_all(output_dir).map_err(|e| purge_failed(output_dir, e))?;
    Ok(removed)
}

/// Fail unless `output_dir` can be removed without touching the project
///
/// The output directory may live inside or outside the project, but it may
/// never be the project itself or one of its ancestors.
pub fn ensure_separate(project_dir: &Path, output_dir: &Path) -> Result<()> {
    let project = resolve(project_dir).map_err(|e| purge_failed(project_dir, e))?;
    let output = resolve(output_dir).map_err(|e| purge_failed(output_dir, e))?;
    if project.starts_with(&output) {
        return Err(BuildError::PurgeFailed {
            path: output_dir.to_path_buf(),
            reason: format!(
                "output directory {} contains the project {}",
                output.display(),
                project.display()
            ),
        }
        .into());
    }
    Ok(())
}

fn purge_failed(path: &Path, error: std::io::Error) -> crate::error::ReleaseError {
    BuildError::PurgeFailed {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
    .into()
}

/// Absolute path with symlinks resolved through its nearest existing ancestor
fn resolve(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = path.absolutize()?.into_owned();
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(mut resolved) => {
                resolved.extend(missing.iter().rev());
                return Ok(resolved);
            }
            Err(e) => match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name.to_os_string());
                    existing = parent;
                }
                _ => return Err(e),
            },
        }
    }
}

/// Location of a directory entry itself, without following a final symlink
fn resolve_entry(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = path.absolutize()?.into_owned();
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => Ok(resolve(parent)?.join(name)),
        _ => resolve(&absolute),
    }
}

/// Purge, build, collect and verify the Artifact Set for one release
pub async fn build_artifacts<B: ArtifactBuilder>(
    builder: &B,
    project_dir: &Path,
    output_dir: &Path,
    purge_targets: &[String],
    env: &BTreeMap<String, String>,
    project_name: &str,
    version: &str,
) -> Result<ArtifactSet> {
    let removed = purge_outputs(project_dir, output_dir, purge_targets)?;
    if !removed.is_empty() {
        log::info!("Purged {} stale build output(s)", removed.len());
    }

    builder.build(project_dir, output_dir, env).await?;

    let artifacts = ArtifactSet::collect(output_dir)?;
    artifacts.verify(project_name, version)?;
    Ok(artifacts)
}
