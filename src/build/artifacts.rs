//! The Artifact Set: distributable files produced by one build.

use crate::error::{BuildError, Result};
use crate::metadata::{normalize_name, version::same_version};
use flate2::read::GzDecoder;
use serde::Serialize;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Distribution format of an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ArtifactKind {
    /// Source distribution (`.tar.gz`)
    Sdist,
    /// Binary wheel (`.whl`)
    Wheel {
        /// Python tag, e.g. `cp311`
        python_tag: String,
        /// ABI tag, e.g. `cp311`
        abi_tag: String,
        /// Platform tag, e.g. `linux_x86_64`
        platform_tag: String,
    },
}

impl ArtifactKind {
    /// `filetype` field of the upload API
    pub fn filetype(&self) -> &'static str {
        match self {
            ArtifactKind::Sdist => "sdist",
            ArtifactKind::Wheel { .. } => "bdist_wheel",
        }
    }

    /// `pyversion` field of the upload API
    pub fn pyversion(&self) -> &str {
        match self {
            ArtifactKind::Sdist => "source",
            ArtifactKind::Wheel { python_tag, .. } => python_tag,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Sdist => write!(f, "sdist"),
            ArtifactKind::Wheel {
                python_tag,
                abi_tag,
                platform_tag,
            } => write!(f, "wheel {python_tag}-{abi_tag}-{platform_tag}"),
        }
    }
}

/// One distributable file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// Absolute path
    pub path: PathBuf,
    /// Filename
    pub file_name: String,
    /// Distribution format
    pub kind: ArtifactKind,
    /// Project name from the filename
    pub project: String,
    /// Version from the filename
    pub version: String,
}

impl Artifact {
    /// Classify a file by name; `None` for files that are not distributions
    pub fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();

        if let Some(stem) = file_name.strip_suffix(".tar.gz") {
            // {name}-{version}.tar.gz; names never contain '-' after normalization
            let (project, version) = stem.rsplit_once('-')?;
            return Some(Self {
                path: path.to_path_buf(),
                file_name: file_name.clone(),
                kind: ArtifactKind::Sdist,
                project: project.to_string(),
                version: version.to_string(),
            });
        }

        if let Some(stem) = file_name.strip_suffix(".whl") {
            // {name}-{version}(-{build})?-{python}-{abi}-{platform}.whl
            let parts: Vec<&str> = stem.split('-').collect();
            if parts.len() != 5 && parts.len() != 6 {
                return None;
            }
            let n = parts.len();
            return Some(Self {
                path: path.to_path_buf(),
                file_name: file_name.clone(),
                kind: ArtifactKind::Wheel {
                    python_tag: parts[n - 3].to_string(),
                    abi_tag: parts[n - 2].to_string(),
                    platform_tag: parts[n - 1].to_string(),
                },
                project: parts[0].to_string(),
                version: parts[1].to_string(),
            });
        }

        None
    }

    /// Version recorded in the artifact's embedded core metadata
    pub fn embedded_version(&self) -> Result<String> {
        let metadata = match self.kind {
            ArtifactKind::Sdist => read_sdist_pkg_info(&self.path)?,
            ArtifactKind::Wheel { .. } => read_wheel_metadata(&self.path)?,
        };
        metadata_field(&metadata, "Version").ok_or_else(|| {
            BuildError::InvalidArtifact {
                path: self.path.clone(),
                reason: "core metadata has no Version field".to_string(),
            }
            .into()
        })
    }
}

/// Distributable files found in the output directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArtifactSet {
    /// Directory the artifacts live in
    pub output_dir: PathBuf,
    /// Artifacts sorted sdist first, then wheels by filename
    pub artifacts: Vec<Artifact>,
}

impl ArtifactSet {
    /// Scan the output directory
    pub fn collect(output_dir: &Path) -> Result<Self> {
        let mut artifacts = Vec::new();
        if output_dir.is_dir() {
            for entry in std::fs::read_dir(output_dir)? {
                let path = entry?.path();
                if !path.is_file() {
                    continue;
                }
                match Artifact::from_path(&path) {
                    Some(artifact) => artifacts.push(artifact),
                    None => log::warn!("Ignoring non-distribution file {}", path.display()),
                }
            }
        }

        artifacts.sort_by(|a, b| {
            let rank = |k: &ArtifactKind| matches!(k, ArtifactKind::Wheel { .. });
            rank(&a.kind)
                .cmp(&rank(&b.kind))
                .then_with(|| a.file_name.cmp(&b.file_name))
        });

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            artifacts,
        })
    }

    /// Whether the set holds no artifacts
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Number of artifacts
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Source distributions in the set
    pub fn sdists(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(|a| a.kind == ArtifactKind::Sdist)
    }

    /// Wheels in the set
    pub fn wheels(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts
            .iter()
            .filter(|a| matches!(a.kind, ArtifactKind::Wheel { .. }))
    }

    /// Exactly one sdist, at least one wheel, every artifact named for this release
    pub fn verify(&self, project: &str, version: &str) -> Result<()> {
        let fail = |reason: String| -> Result<()> {
            Err(BuildError::VerificationFailed { reason }.into())
        };

        let sdists = self.sdists().count();
        if sdists != 1 {
            return fail(format!(
                "expected exactly one source distribution in {}, found {}",
                self.output_dir.display(),
                sdists
            ));
        }
        if self.wheels().next().is_none() {
            return fail(format!("no wheel found in {}", self.output_dir.display()));
        }

        let expected_project = normalize_name(project);
        for artifact in &self.artifacts {
            if normalize_name(&artifact.project) != expected_project {
                return fail(format!(
                    "{} belongs to project '{}', expected '{}'",
                    artifact.file_name, artifact.project, project
                ));
            }
            if !same_version(&artifact.version, version) {
                return fail(format!(
                    "{} has version {}, expected {}",
                    artifact.file_name, artifact.version, version
                ));
            }
            let embedded = artifact.embedded_version()?;
            if !same_version(&embedded, version) {
                return fail(format!(
                    "{} declares version {} in its metadata, expected {}",
                    artifact.file_name, embedded, version
                ));
            }
        }
        Ok(())
    }
}

fn invalid(path: &Path, reason: impl fmt::Display) -> crate::error::ReleaseError {
    BuildError::InvalidArtifact {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
    .into()
}

/// `{name}-{version}/PKG-INFO` from a source distribution
fn read_sdist_pkg_info(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    for entry in archive.entries().map_err(|e| invalid(path, e))? {
        let mut entry = entry.map_err(|e| invalid(path, e))?;
        let entry_path = entry.path().map_err(|e| invalid(path, e))?.into_owned();
        // Only the top-level PKG-INFO, not the one inside *.egg-info
        if entry_path.components().count() == 2 && entry_path.ends_with("PKG-INFO") {
            let mut content = String::new();
            entry
                .read_to_string(&mut content)
                .map_err(|e| invalid(path, e))?;
            return Ok(content);
        }
    }
    Err(invalid(path, "no PKG-INFO in source distribution"))
}

/// `*.dist-info/METADATA` from a wheel
fn read_wheel_metadata(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| invalid(path, e))?;
    let name = archive
        .file_names()
        .find(|n| {
            n.ends_with(".dist-info/METADATA") && n.matches('/').count() == 1
        })
        .map(str::to_string)
        .ok_or_else(|| invalid(path, "no .dist-info/METADATA in wheel"))?;

    let mut content = String::new();
    archive
        .by_name(&name)
        .map_err(|e| invalid(path, e))?
        .read_to_string(&mut content)
        .map_err(|e| invalid(path, e))?;
    Ok(content)
}

/// First value of an RFC 822-style header in core metadata
pub(crate) fn metadata_field(metadata: &str, field: &str) -> Option<String> {
    metadata
        .lines()
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(field))
        .map(|(_, value)| value.trim().to_string())
}
