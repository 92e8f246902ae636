//! Descriptor validation for release checks.

use super::{DescriptorKind, PackageDescriptor, version};
use crate::error::DescriptorError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Descriptor validator
#[derive(Debug)]
pub struct DescriptorValidator<'a> {
    descriptors: &'a [PackageDescriptor],
}

/// Validation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether every critical check passed
    pub success: bool,
    /// Individual checks in the order they ran
    pub checks: Vec<ValidationCheck>,
    /// Failures that make a build invalid
    pub critical_errors: Vec<String>,
    /// Non-fatal findings
    pub warnings: Vec<String>,
}

/// Individual validation check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationCheck {
    /// Check name
    pub name: String,
    /// Whether the check passed
    pub passed: bool,
    /// Detail message
    pub message: String,
    /// Whether a failure is critical
    pub critical: bool,
}

impl ValidationCheck {
    fn new(name: &str, passed: bool, message: String, critical: bool) -> Self {
        Self {
            name: name.to_string(),
            passed,
            message,
            critical,
        }
    }

    /// One-line rendering for detailed output
    pub fn format_result(&self) -> String {
        let icon = match (self.passed, self.critical) {
            (true, _) => "✓",
            (false, true) => "✗",
            (false, false) => "⚠",
        };
        format!("{} {}: {}", icon, self.name, self.message)
    }
}

impl ValidationResult {
    /// Short summary line
    pub fn summary(&self) -> String {
        let passed = self.checks.iter().filter(|c| c.passed).count();
        format!(
            "Descriptor validation {}: {}/{} checks passed, {} error(s), {} warning(s)",
            if self.success { "passed" } else { "failed" },
            passed,
            self.checks.len(),
            self.critical_errors.len(),
            self.warnings.len()
        )
    }
}

/// Fields a pyproject `[project]` table must declare for a release
const REQUIRED_PYPROJECT_FIELDS: &[&str] = &[
    "name",
    "version",
    "description",
    "readme",
    "requires-python",
    "license",
    "authors",
    "maintainers",
    "keywords",
    "classifiers",
    "urls.Source",
    "build-system.requires",
    "build-system.build-backend",
];

/// First pair of descriptors that make the project ambiguous
pub(super) fn find_conflict(descriptors: &[PackageDescriptor]) -> Option<DescriptorError> {
    if descriptors.len() < 2 {
        return None;
    }

    let mut by_identity: BTreeMap<String, Vec<&PackageDescriptor>> = BTreeMap::new();
    for descriptor in descriptors {
        let identity = descriptor.identity().unwrap_or_else(|| "<unnamed>".to_string());
        by_identity.entry(identity).or_default().push(descriptor);
    }

    if let Some((project, group)) = by_identity.iter().find(|(_, group)| group.len() > 1) {
        return Some(DescriptorError::Conflicting {
            project: project.clone(),
            entries: group.iter().map(|d| d.label()).collect(),
        });
    }

    // Distinct identities in one directory: still not a single unambiguous project
    Some(DescriptorError::Conflicting {
        project: by_identity.keys().cloned().collect::<Vec<_>>().join(" / "),
        entries: descriptors.iter().map(|d| d.label()).collect(),
    })
}

impl<'a> DescriptorValidator<'a> {
    /// Create a new descriptor validator
    pub fn new(descriptors: &'a [PackageDescriptor]) -> Self {
        Self { descriptors }
    }

    /// Perform descriptor validation
    pub fn validate(&self) -> ValidationResult {
        let mut checks = Vec::new();
        let mut critical_errors = Vec::new();
        let mut warnings = Vec::new();

        self.validate_uniqueness(&mut checks, &mut critical_errors);
        for descriptor in self.descriptors {
            Self::validate_fields(descriptor, &mut checks, &mut critical_errors, &mut warnings);
            Self::validate_version(descriptor, &mut checks, &mut critical_errors);
        }

        ValidationResult {
            success: critical_errors.is_empty(),
            checks,
            critical_errors,
            warnings,
        }
    }

    /// Exactly one descriptor must exist
    fn validate_uniqueness(&self, checks: &mut Vec<ValidationCheck>, critical_errors: &mut Vec<String>) {
        if self.descriptors.is_empty() {
            let message = "No package descriptor found".to_string();
            checks.push(ValidationCheck::new("Single Descriptor", false, message.clone(), true));
            critical_errors.push(message);
            return;
        }

        match find_conflict(self.descriptors) {
            Some(conflict) => {
                let message = conflict.to_string();
                checks.push(ValidationCheck::new("Single Descriptor", false, message.clone(), true));
                critical_errors.push(message);
            }
            None => checks.push(ValidationCheck::new(
                "Single Descriptor",
                true,
                format!("Metadata declared only in {}", self.descriptors[0].path.display()),
                true,
            )),
        }
    }

    fn validate_fields(
        descriptor: &PackageDescriptor,
        checks: &mut Vec<ValidationCheck>,
        critical_errors: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) {
        let missing = missing_fields(descriptor);
        let strict = descriptor.kind == Some(DescriptorKind::Pyproject);
        let name = format!("Required Fields ({})", descriptor.path.display());

        if missing.is_empty() {
            checks.push(ValidationCheck::new(&name, true, "All required fields present".to_string(), strict));
            return;
        }

        let message = format!("{} is missing: {}", descriptor.path.display(), missing.join(", "));
        // name and version are always required; the rest only for pyproject
        let fatal = strict || missing.iter().any(|f| *f == "name" || *f == "version");
        checks.push(ValidationCheck::new(&name, false, message.clone(), fatal));
        if fatal {
            critical_errors.push(message);
        } else {
            warnings.push(message);
        }
    }

    fn validate_version(
        descriptor: &PackageDescriptor,
        checks: &mut Vec<ValidationCheck>,
        critical_errors: &mut Vec<String>,
    ) {
        let Some(raw) = descriptor.version.as_deref() else {
            return;
        };
        let name = format!("Version Format ({})", descriptor.path.display());
        if version::parse_lenient(raw).is_some() {
            checks.push(ValidationCheck::new(&name, true, format!("Version {raw} is well-formed"), true));
        } else {
            let message = format!("{}: version '{}' is not a valid Python version", descriptor.path.display(), raw);
            checks.push(ValidationCheck::new(&name, false, message.clone(), true));
            critical_errors.push(message);
        }
    }
}

fn missing_fields(descriptor: &PackageDescriptor) -> Vec<&'static str> {
    let build_system = descriptor.build_system.as_ref();
    REQUIRED_PYPROJECT_FIELDS
        .iter()
        .copied()
        .filter(|field| {
            let present = match *field {
                "name" => descriptor.name.is_some(),
                "version" => descriptor.version.is_some(),
                "description" => descriptor.description.is_some(),
                "readme" => descriptor.readme.is_some(),
                "requires-python" => descriptor.requires_python.is_some(),
                "license" => descriptor.license.is_some(),
                "authors" => !descriptor.authors.is_empty(),
                "maintainers" => !descriptor.maintainers.is_empty(),
                "keywords" => !descriptor.keywords.is_empty(),
                "classifiers" => !descriptor.classifiers.is_empty(),
                "urls.Source" => descriptor.source_url.is_some(),
                // setup.py / setup.cfg carry no build-system block of their own
                "build-system.requires" => {
                    descriptor.kind != Some(DescriptorKind::Pyproject)
                        || build_system.is_some_and(|b| !b.requires.is_empty())
                }
                "build-system.build-backend" => {
                    descriptor.kind != Some(DescriptorKind::Pyproject)
                        || build_system.is_some_and(|b| b.build_backend.is_some())
                }
                _ => true,
            };
            !present
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{BuildSystem, Person};
    use std::path::PathBuf;

    fn complete_pyproject(version: &str) -> PackageDescriptor {
        PackageDescriptor {
            kind: Some(DescriptorKind::Pyproject),
            path: PathBuf::from("pyproject.toml"),
            name: Some("gbinder".to_string()),
            version: Some(version.to_string()),
            description: Some("Cython extension module".to_string()),
            readme: Some("README.md".to_string()),
            requires_python: Some(">=3.6".to_string()),
            license: Some("GPLv3".to_string()),
            authors: vec![Person { name: Some("Erfan Abdi".to_string()), email: None }],
            maintainers: vec![Person { name: Some("Meshack Bahati".to_string()), email: None }],
            keywords: vec!["gbinder".to_string()],
            classifiers: vec!["Programming Language :: Cython".to_string()],
            source_url: Some("https://github.com/Kyle6012/gbinder".to_string()),
            build_system: Some(BuildSystem {
                requires: vec!["setuptools>=61.0".to_string()],
                build_backend: Some("setuptools.build_meta".to_string()),
            }),
        }
    }

    fn setup_py(version: &str) -> PackageDescriptor {
        PackageDescriptor {
            kind: Some(DescriptorKind::SetupPy),
            path: PathBuf::from("setup.py"),
            name: Some("gbinder".to_string()),
            version: Some(version.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_complete_descriptor_passes() {
        let descriptors = vec![complete_pyproject("1.2.7")];
        let result = DescriptorValidator::new(&descriptors).validate();
        assert!(result.success, "{:?}", result.critical_errors);
        assert!(result.checks.iter().all(|c| c.passed));
    }

    #[test]
    fn test_conflicting_descriptors_are_rejected() {
        let descriptors = vec![complete_pyproject("1.2.7"), setup_py("1.2.1")];
        let result = DescriptorValidator::new(&descriptors).validate();
        assert!(!result.success);
        let conflict = &result.critical_errors[0];
        assert!(conflict.contains("gbinder"));
        assert!(conflict.contains("1.2.7"));
        assert!(conflict.contains("1.2.1"));
    }

    #[test]
    fn test_duplicate_descriptors_rejected_even_when_versions_agree() {
        let descriptors = vec![complete_pyproject("1.2.7"), setup_py("1.2.7")];
        assert!(find_conflict(&descriptors).is_some());
    }

    #[test]
    fn test_missing_pyproject_fields_are_critical() {
        let mut descriptor = complete_pyproject("1.2.7");
        descriptor.maintainers.clear();
        descriptor.source_url = None;
        let descriptors = vec![descriptor];
        let result = DescriptorValidator::new(&descriptors).validate();
        assert!(!result.success);
        assert!(result.critical_errors[0].contains("maintainers"));
        assert!(result.critical_errors[0].contains("urls.Source"));
    }

    #[test]
    fn test_setup_py_missing_optional_fields_only_warns() {
        let descriptors = vec![setup_py("1.2.1")];
        let result = DescriptorValidator::new(&descriptors).validate();
        assert!(result.success);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_malformed_version_is_critical() {
        let descriptors = vec![complete_pyproject("latest")];
        let result = DescriptorValidator::new(&descriptors).validate();
        assert!(!result.success);
        assert!(result.summary().contains("failed"));
    }
}
