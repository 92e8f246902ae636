//! Build environment description and provisioning.
//!
//! The environment is an ordered list of system packages (compiler toolchain,
//! build generators, native headers) and an ordered list of build-time Python
//! dependencies. Provisioning checks every entry before the build starts and
//! fails with the complete list of what is missing.

mod requirement;
mod toolchain;
mod vendor;

pub use requirement::{Comparator, Requirement};
pub use toolchain::{SystemToolchain, Toolchain};

use crate::error::{ProvisionError, Result};
use crate::metadata::ProjectDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Build dependencies assumed when the project declares no `[build-system]`
pub const DEFAULT_BUILD_REQUIREMENTS: &[&str] = &[
    "Cython>=0.29",
    "setuptools>=61.0",
    "wheel",
    "GitPython",
];

/// The build frontend is always required, whatever the backend declares
pub const BUILD_FRONTEND: &str = "build";

/// Native library source used when pkg-config cannot find it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorRecipe {
    /// Git repository URL
    pub repository: String,
    /// Tag or branch to check out
    pub tag: String,
}

/// How a system package is detected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Probe {
    /// Executable on `PATH`
    Binary(String),
    /// pkg-config module (native headers and libraries)
    PkgConfig(String),
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probe::Binary(name) => write!(f, "executable '{name}'"),
            Probe::PkgConfig(module) => write!(f, "pkg-config module '{module}'"),
        }
    }
}

/// A required system package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemPackage {
    /// Distribution package name, used in diagnostics
    pub name: String,
    /// Detection method
    #[serde(flatten)]
    pub probe: Probe,
    /// Optional source build fallback (pkg-config probes only)
    #[serde(default)]
    pub vendor: Option<VendorRecipe>,
}

impl SystemPackage {
    /// Package detected by an executable
    pub fn binary(name: &str, executable: &str) -> Self {
        Self {
            name: name.to_string(),
            probe: Probe::Binary(executable.to_string()),
            vendor: None,
        }
    }

    /// Package detected by a pkg-config module
    pub fn pkg_config(name: &str, module: &str) -> Self {
        Self {
            name: name.to_string(),
            probe: Probe::PkgConfig(module.to_string()),
            vendor: None,
        }
    }

    /// Attach a source build fallback
    pub fn with_vendor(mut self, repository: &str, tag: &str) -> Self {
        self.vendor = Some(VendorRecipe {
            repository: repository.to_string(),
            tag: tag.to_string(),
        });
        self
    }
}

/// System packages required to build the gbinder extension
pub fn default_system_packages() -> Vec<SystemPackage> {
    vec![
        SystemPackage::binary("build-essential", "cc"),
        SystemPackage::binary("meson", "meson"),
        SystemPackage::binary("ninja-build", "ninja"),
        SystemPackage::binary("pkg-config", "pkg-config"),
        SystemPackage::binary("git", "git"),
        SystemPackage::pkg_config("libglib2.0-dev", "glib-2.0"),
        SystemPackage::pkg_config("libgbinder-dev", "libgbinder")
            .with_vendor("https://github.com/mer-hybris/libgbinder.git", "v1.1.42"),
    ]
}

/// Ordered description of everything the build needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentDescriptor {
    /// System packages in check order
    pub system_packages: Vec<SystemPackage>,
    /// Build-time Python dependencies in check order
    pub build_requirements: Vec<Requirement>,
}

impl EnvironmentDescriptor {
    /// Combine configured system packages with the project's build requirements
    pub fn new(system_packages: Vec<SystemPackage>, project: &ProjectDescriptor) -> Result<Self> {
        let declared = project.build_requires();
        let raw: Vec<&str> = if declared.is_empty() {
            DEFAULT_BUILD_REQUIREMENTS.to_vec()
        } else {
            declared.iter().map(String::as_str).collect()
        };

        let mut build_requirements = raw
            .into_iter()
            .map(Requirement::parse)
            .collect::<Result<Vec<_>>>()?;
        if !build_requirements
            .iter()
            .any(|r| r.normalized_name() == BUILD_FRONTEND)
        {
            build_requirements.push(Requirement::parse(BUILD_FRONTEND)?);
        }

        Ok(Self {
            system_packages,
            build_requirements,
        })
    }
}

/// What provisioning found for one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionEntry {
    /// Entry name
    pub name: String,
    /// Whether it is usable
    pub available: bool,
    /// Version found or how it was satisfied
    pub detail: String,
}

/// Evidence that the environment is complete, plus what the build must see
#[derive(Debug, Clone, Default)]
pub struct ProvisionedEnvironment {
    /// Extra environment variables for the build step
    pub env: BTreeMap<String, String>,
    /// Per-entry results in check order
    pub entries: Vec<ProvisionEntry>,
    /// Vendored library pkg-config directories
    pub vendored: Vec<PathBuf>,
}

/// Check every required system package and build dependency
///
/// Nothing is built until all entries are present; the error lists every
/// missing entry, not only the first.
pub async fn provision<T: Toolchain>(
    descriptor: &EnvironmentDescriptor,
    toolchain: &T,
) -> Result<ProvisionedEnvironment> {
    let mut provisioned = ProvisionedEnvironment::default();
    let mut missing_system = Vec::new();
    let mut missing_python = Vec::new();

    for package in &descriptor.system_packages {
        let found = match &package.probe {
            Probe::Binary(executable) => toolchain.has_binary(executable),
            Probe::PkgConfig(module) => {
                toolchain.has_pkg_config(module, &provisioned.env).await?
            }
        };

        if found {
            log::debug!("Found {} ({})", package.name, package.probe);
            provisioned.entries.push(ProvisionEntry {
                name: package.name.clone(),
                available: true,
                detail: package.probe.to_string(),
            });
            continue;
        }

        let vendored = match (&package.probe, &package.vendor) {
            (Probe::PkgConfig(module), Some(recipe)) => {
                log::info!(
                    "{} not found via pkg-config; building {}@{}",
                    package.name,
                    recipe.repository,
                    recipe.tag
                );
                let pc_dir = toolchain.vendor(module, recipe).await?;
                extend_pkg_config_path(&mut provisioned.env, &pc_dir);
                provisioned.vendored.push(pc_dir);
                toolchain.has_pkg_config(module, &provisioned.env).await?
            }
            _ => false,
        };

        provisioned.entries.push(ProvisionEntry {
            name: package.name.clone(),
            available: vendored,
            detail: if vendored {
                format!("vendored {}", package.probe)
            } else {
                format!("missing {}", package.probe)
            },
        });
        if !vendored {
            log::warn!("Missing system package {} ({})", package.name, package.probe);
            missing_system.push(package.name.clone());
        }
    }

    for requirement in &descriptor.build_requirements {
        let installed = toolchain.python_package_version(&requirement.name).await?;
        let (available, detail) = match &installed {
            Some(version) if requirement.is_satisfied_by(version) => (true, version.clone()),
            Some(version) => (false, format!("{version} does not satisfy {requirement}")),
            None => (false, "not installed".to_string()),
        };

        if available {
            log::debug!("Found {} {}", requirement.name, detail);
        } else {
            log::warn!("Build dependency {}: {}", requirement, detail);
            missing_python.push(match installed {
                Some(version) => format!("{requirement} (found {version})"),
                None => requirement.to_string(),
            });
        }
        provisioned.entries.push(ProvisionEntry {
            name: requirement.to_string(),
            available,
            detail,
        });
    }

    if !missing_system.is_empty() || !missing_python.is_empty() {
        return Err(ProvisionError::Missing {
            system: missing_system,
            python: missing_python,
        }
        .into());
    }

    Ok(provisioned)
}

fn extend_pkg_config_path(env: &mut BTreeMap<String, String>, dir: &std::path::Path) {
    let existing = env
        .get("PKG_CONFIG_PATH")
        .cloned()
        .or_else(|| std::env::var("PKG_CONFIG_PATH").ok())
        .filter(|v| !v.is_empty());
    let dir = dir.to_string_lossy();
    let value = match existing {
        Some(existing) => format!("{dir}:{existing}"),
        None => dir.to_string(),
    };
    env.insert("PKG_CONFIG_PATH".to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{BuildSystem, PackageDescriptor};
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeToolchain {
        binaries: BTreeSet<String>,
        pkg_config: BTreeSet<String>,
        python: HashMap<String, String>,
        vendorable: BTreeSet<String>,
        vendored: Mutex<Vec<String>>,
    }

    impl Toolchain for FakeToolchain {
        fn has_binary(&self, name: &str) -> bool {
            self.binaries.contains(name)
        }

        async fn has_pkg_config(&self, module: &str, env: &BTreeMap<String, String>) -> Result<bool> {
            Ok(self.pkg_config.contains(module)
                || env
                    .get("PKG_CONFIG_PATH")
                    .is_some_and(|p| p.contains(module)))
        }

        async fn python_package_version(&self, package: &str) -> Result<Option<String>> {
            Ok(self.python.get(&package.to_ascii_lowercase()).cloned())
        }

        async fn vendor(&self, package: &str, _recipe: &VendorRecipe) -> Result<PathBuf> {
            self.vendored.lock().unwrap().push(package.to_string());
            if self.vendorable.contains(package) {
                Ok(PathBuf::from(format!("/vendor/{package}/lib/pkgconfig")))
            } else {
                Err(ProvisionError::VendorFailed {
                    package: package.to_string(),
                    reason: "clone failed".to_string(),
                }
                .into())
            }
        }

        fn python(&self) -> &str {
            "python3"
        }
    }

    fn project(requires: &[&str]) -> ProjectDescriptor {
        ProjectDescriptor {
            descriptor: PackageDescriptor::default(),
            name: "gbinder".to_string(),
            version: "1.2.7".to_string(),
            build_system: Some(BuildSystem {
                requires: requires.iter().map(|s| s.to_string()).collect(),
                build_backend: Some("setuptools.build_meta".to_string()),
            }),
        }
    }

    fn complete_toolchain() -> FakeToolchain {
        FakeToolchain {
            binaries: ["cc", "meson", "ninja", "pkg-config", "git"]
                .into_iter()
                .map(String::from)
                .collect(),
            pkg_config: ["glib-2.0", "libgbinder"].into_iter().map(String::from).collect(),
            python: [
                ("cython", "3.0.11"),
                ("setuptools", "69.5.1"),
                ("wheel", "0.43.0"),
                ("gitpython", "3.1.43"),
                ("build", "1.2.1"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_descriptor_uses_declared_requirements_and_adds_frontend() {
        let env = EnvironmentDescriptor::new(vec![], &project(&["setuptools>=61.0", "Cython"]))
            .unwrap();
        let names: Vec<_> = env.build_requirements.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["setuptools", "Cython", "build"]);
    }

    #[test]
    fn test_descriptor_falls_back_to_defaults() {
        let env = EnvironmentDescriptor::new(vec![], &project(&[])).unwrap();
        assert_eq!(env.build_requirements.len(), DEFAULT_BUILD_REQUIREMENTS.len() + 1);
    }

    #[tokio::test]
    async fn test_complete_environment_provisions() {
        let descriptor =
            EnvironmentDescriptor::new(default_system_packages(), &project(&[])).unwrap();
        let provisioned = provision(&descriptor, &complete_toolchain()).await.unwrap();
        assert!(provisioned.entries.iter().all(|e| e.available));
        assert!(provisioned.vendored.is_empty());
    }

    #[tokio::test]
    async fn test_reports_every_missing_entry() {
        let mut toolchain = complete_toolchain();
        toolchain.binaries.remove("meson");
        toolchain.pkg_config.remove("glib-2.0");
        toolchain.python.insert("setuptools".to_string(), "58.1.0".to_string());
        toolchain.python.remove("wheel");

        let descriptor =
            EnvironmentDescriptor::new(default_system_packages(), &project(&[])).unwrap();
        let err = provision(&descriptor, &toolchain).await.unwrap_err();
        match err {
            crate::error::ReleaseError::Provision(ProvisionError::Missing { system, python }) => {
                assert_eq!(system, vec!["meson", "libglib2.0-dev"]);
                assert_eq!(python.len(), 2);
                assert!(python[0].contains("found 58.1.0"));
                assert_eq!(python[1], "wheel");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_vendors_missing_native_library() {
        let mut toolchain = complete_toolchain();
        toolchain.pkg_config.remove("libgbinder");
        toolchain.vendorable.insert("libgbinder".to_string());

        let descriptor =
            EnvironmentDescriptor::new(default_system_packages(), &project(&[])).unwrap();
        let provisioned = provision(&descriptor, &toolchain).await.unwrap();
        assert_eq!(provisioned.vendored.len(), 1);
        assert!(provisioned.env["PKG_CONFIG_PATH"].starts_with("/vendor/libgbinder/lib/pkgconfig"));
        assert_eq!(*toolchain.vendored.lock().unwrap(), vec!["libgbinder"]);
    }

    #[tokio::test]
    async fn test_vendor_failure_is_fatal() {
        let mut toolchain = complete_toolchain();
        toolchain.pkg_config.remove("libgbinder");

        let descriptor =
            EnvironmentDescriptor::new(default_system_packages(), &project(&[])).unwrap();
        let err = provision(&descriptor, &toolchain).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::ReleaseError::Provision(ProvisionError::VendorFailed { .. })
        ));
    }
}
