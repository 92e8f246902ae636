//! Package descriptor discovery, parsing and resolution.
//!
//! A Python project may describe itself in `pyproject.toml`, `setup.py` or
//! `setup.cfg`. Exactly one of them must carry the project metadata; a project
//! with several descriptors for the same identity is rejected rather than
//! resolved by picking one.

mod pyproject;
mod setup_cfg;
mod setup_py;
mod validator;
pub mod version;

pub use pyproject::{BuildSystem, PyprojectFile, load as load_pyproject};
pub use validator::{DescriptorValidator, ValidationCheck, ValidationResult};

use crate::error::{DescriptorError, Result};
use crate::trigger::ReleaseTag;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// File name of the PEP 621 descriptor
pub const PYPROJECT_FILE: &str = "pyproject.toml";
/// File name of the setuptools script descriptor
pub const SETUP_PY_FILE: &str = "setup.py";
/// File name of the setuptools declarative descriptor
pub const SETUP_CFG_FILE: &str = "setup.cfg";

/// Which file a descriptor was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DescriptorKind {
    /// `[project]` table of pyproject.toml
    Pyproject,
    /// Keyword arguments of `setup(...)` in setup.py
    SetupPy,
    /// `[metadata]` section of setup.cfg
    SetupCfg,
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorKind::Pyproject => write!(f, "{PYPROJECT_FILE}"),
            DescriptorKind::SetupPy => write!(f, "{SETUP_PY_FILE}"),
            DescriptorKind::SetupCfg => write!(f, "{SETUP_CFG_FILE}"),
        }
    }
}

/// Author or maintainer identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
}

impl Person {
    pub(crate) fn from_parts(name: Option<String>, email: Option<String>) -> Option<Self> {
        if name.is_none() && email.is_none() {
            None
        } else {
            Some(Self { name, email })
        }
    }
}

/// Project metadata read from one descriptor file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageDescriptor {
    /// Descriptor kind
    pub kind: Option<DescriptorKind>,
    /// File the descriptor was read from
    pub path: PathBuf,
    /// Project name as declared
    pub name: Option<String>,
    /// Project version as declared
    pub version: Option<String>,
    /// One-line description
    pub description: Option<String>,
    /// Readme file or inline text
    pub readme: Option<String>,
    /// Supported interpreter range (`requires-python`)
    pub requires_python: Option<String>,
    /// License expression or text
    pub license: Option<String>,
    /// Authors
    pub authors: Vec<Person>,
    /// Maintainers
    pub maintainers: Vec<Person>,
    /// Keywords
    pub keywords: Vec<String>,
    /// Trove classifiers
    pub classifiers: Vec<String>,
    /// Source repository URL
    pub source_url: Option<String>,
    /// Build-system block (pyproject only)
    pub build_system: Option<BuildSystem>,
}

impl PackageDescriptor {
    /// Normalized project name, if declared
    pub fn identity(&self) -> Option<String> {
        self.name.as_deref().map(normalize_name)
    }

    /// `path (version)` label used in diagnostics
    pub fn label(&self) -> String {
        format!(
            "{} ({})",
            self.path.display(),
            self.version.as_deref().unwrap_or("no version")
        )
    }
}

/// The single, validated descriptor of a project
#[derive(Debug, Clone)]
pub struct ProjectDescriptor {
    /// Validated descriptor
    pub descriptor: PackageDescriptor,
    /// Declared name
    pub name: String,
    /// Declared version
    pub version: String,
    /// Build-system block from pyproject.toml, even when metadata lives elsewhere
    pub build_system: Option<BuildSystem>,
}

impl ProjectDescriptor {
    /// Project name in the form used inside distribution filenames
    pub fn filename_name(&self) -> String {
        normalize_name(&self.name).replace('-', "_")
    }

    /// Build requirements declared in `[build-system].requires`
    pub fn build_requires(&self) -> &[String] {
        self.build_system
            .as_ref()
            .map(|b| b.requires.as_slice())
            .unwrap_or(&[])
    }
}

/// PEP 503 name normalization: lowercase, runs of `-`, `_`, `.` collapse to `-`
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                normalized.push('-');
            }
            in_separator = true;
        } else {
            normalized.push(c.to_ascii_lowercase());
            in_separator = false;
        }
    }
    normalized
}

/// Find and parse every descriptor present in the project directory
pub fn discover(project_dir: &Path) -> Result<Vec<PackageDescriptor>> {
    let mut descriptors = Vec::new();

    let pyproject_path = project_dir.join(PYPROJECT_FILE);
    if pyproject_path.is_file() {
        if let Some(descriptor) = pyproject::parse(&pyproject_path)? {
            descriptors.push(descriptor);
        }
    }

    let setup_py_path = project_dir.join(SETUP_PY_FILE);
    if setup_py_path.is_file() {
        if let Some(descriptor) = setup_py::parse(&setup_py_path)? {
            descriptors.push(descriptor);
        }
    }

    let setup_cfg_path = project_dir.join(SETUP_CFG_FILE);
    if setup_cfg_path.is_file() {
        if let Some(descriptor) = setup_cfg::parse(&setup_cfg_path)? {
            descriptors.push(descriptor);
        }
    }

    log::debug!(
        "Discovered {} descriptor(s) in {}",
        descriptors.len(),
        project_dir.display()
    );
    Ok(descriptors)
}

/// Resolve the single authoritative descriptor of a project
pub fn resolve(project_dir: &Path) -> Result<ProjectDescriptor> {
    let descriptors = discover(project_dir)?;
    if descriptors.is_empty() {
        return Err(DescriptorError::NotFound {
            path: project_dir.to_path_buf(),
        }
        .into());
    }

    if let Some(conflict) = validator::find_conflict(&descriptors) {
        return Err(conflict.into());
    }

    let result = DescriptorValidator::new(&descriptors).validate();
    if !result.success {
        return Err(DescriptorError::Invalid {
            errors: result.critical_errors,
        }
        .into());
    }
    for warning in &result.warnings {
        log::warn!("{}", warning);
    }

    // find_conflict and validate guarantee exactly one descriptor with name and version
    let descriptor = descriptors
        .into_iter()
        .next()
        .ok_or_else(|| DescriptorError::NotFound {
            path: project_dir.to_path_buf(),
        })?;
    let (Some(name), Some(version)) = (descriptor.name.clone(), descriptor.version.clone()) else {
        return Err(DescriptorError::Invalid {
            errors: vec![format!("{} lacks a name or version", descriptor.path.display())],
        }
        .into());
    };

    let build_system = match &descriptor.build_system {
        Some(build_system) => Some(build_system.clone()),
        None => pyproject::read_build_system(&project_dir.join(PYPROJECT_FILE))?,
    };

    Ok(ProjectDescriptor {
        descriptor,
        name,
        version,
        build_system,
    })
}

/// Check that the release tag names the version the descriptor declares
pub fn check_tag_version(project: &ProjectDescriptor, tag: &ReleaseTag) -> Result<()> {
    // Only a plain X.Y.Z (or shorter) release may stand behind a vX.Y.Z tag
    let declared = version::Pep440Version::parse(&project.version).and_then(|v| v.final_release());
    match declared {
        Some(declared) if declared == tag.version => Ok(()),
        _ => Err(DescriptorError::TagMismatch {
            tag: tag.name.clone(),
            descriptor_version: project.version.clone(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("GBinder"), "gbinder");
        assert_eq!(normalize_name("gbinder_python"), "gbinder-python");
        assert_eq!(normalize_name("Foo.-_Bar"), "foo-bar");
    }

    #[test]
    fn test_filename_name_uses_underscores() {
        let project = ProjectDescriptor {
            descriptor: PackageDescriptor::default(),
            name: "Foo.Bar-baz".to_string(),
            version: "1.0.0".to_string(),
            build_system: None,
        };
        assert_eq!(project.filename_name(), "foo_bar_baz");
    }

    #[test]
    fn test_check_tag_version() {
        let project = ProjectDescriptor {
            descriptor: PackageDescriptor::default(),
            name: "gbinder".to_string(),
            version: "1.2.7".to_string(),
            build_system: None,
        };
        let matching = ReleaseTag {
            name: "v1.2.7".to_string(),
            version: semver::Version::new(1, 2, 7),
        };
        let other = ReleaseTag {
            name: "v1.2.1".to_string(),
            version: semver::Version::new(1, 2, 1),
        };
        assert!(check_tag_version(&project, &matching).is_ok());
        assert!(check_tag_version(&project, &other).is_err());
    }

    #[test]
    fn test_tag_rejects_versions_beyond_the_release() {
        let tag = ReleaseTag {
            name: "v1.2.7".to_string(),
            version: semver::Version::new(1, 2, 7),
        };
        for declared in ["1.2.7.post1", "1.2.7.1", "1.2.7+local", "1.2.7rc1"] {
            let project = ProjectDescriptor {
                descriptor: PackageDescriptor::default(),
                name: "gbinder".to_string(),
                version: declared.to_string(),
                build_system: None,
            };
            assert!(
                matches!(
                    check_tag_version(&project, &tag),
                    Err(crate::error::ReleaseError::Descriptor(DescriptorError::TagMismatch { .. }))
                ),
                "{declared} must not be released as v1.2.7"
            );
        }
    }
}
