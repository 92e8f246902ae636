//! `pyproject.toml` parsing (PEP 517 build-system and PEP 621 project tables).

use super::{DescriptorKind, PackageDescriptor, Person};
use crate::error::{DescriptorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// `[build-system]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSystem {
    /// Build-time requirements (PEP 508 strings)
    #[serde(default)]
    pub requires: Vec<String>,
    /// Build backend identifier, e.g. `setuptools.build_meta`
    #[serde(rename = "build-backend", default)]
    pub build_backend: Option<String>,
}

/// Raw pyproject.toml layout
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PyprojectFile {
    /// `[project]` table
    #[serde(default)]
    pub project: Option<ProjectTable>,
    /// `[build-system]` table
    #[serde(rename = "build-system", default)]
    pub build_system: Option<BuildSystem>,
    /// `[tool]` table
    #[serde(default)]
    pub tool: Option<toml::Table>,
}

/// `[project]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectTable {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    readme: Option<TextOrTable>,
    #[serde(rename = "requires-python", default)]
    requires_python: Option<String>,
    #[serde(default)]
    license: Option<TextOrTable>,
    #[serde(default)]
    authors: Vec<Person>,
    #[serde(default)]
    maintainers: Vec<Person>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    classifiers: Vec<String>,
    #[serde(default)]
    urls: BTreeMap<String, String>,
}

/// Fields that accept either a string or `{ file = ..., text = ... }`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TextOrTable {
    Text(String),
    Table {
        #[serde(default)]
        file: Option<String>,
        #[serde(default)]
        text: Option<String>,
    },
}

impl TextOrTable {
    fn into_string(self) -> Option<String> {
        match self {
            TextOrTable::Text(text) => Some(text),
            TextOrTable::Table { file, text } => file.or(text),
        }
    }
}

/// Read and deserialize a pyproject.toml
pub fn load(path: &Path) -> Result<PyprojectFile> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| {
        DescriptorError::ParseFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Parse the `[project]` table; `None` when the file only configures the build
pub fn parse(path: &Path) -> Result<Option<PackageDescriptor>> {
    let file = load(path)?;
    let Some(project) = file.project else {
        log::debug!("{} has no [project] table", path.display());
        return Ok(None);
    };

    Ok(Some(PackageDescriptor {
        kind: Some(DescriptorKind::Pyproject),
        path: path.to_path_buf(),
        name: project.name,
        version: project.version,
        description: project.description,
        readme: project.readme.and_then(TextOrTable::into_string),
        requires_python: project.requires_python,
        license: project.license.and_then(TextOrTable::into_string),
        authors: project.authors,
        maintainers: project.maintainers,
        keywords: project.keywords,
        classifiers: project.classifiers,
        source_url: source_url(&project.urls),
        build_system: file.build_system,
    }))
}

/// Read only the `[build-system]` table, if the file exists
pub fn read_build_system(path: &Path) -> Result<Option<BuildSystem>> {
    if !path.is_file() {
        return Ok(None);
    }
    Ok(load(path)?.build_system)
}

fn source_url(urls: &BTreeMap<String, String>) -> Option<String> {
    urls.iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("source"))
        .map(|(_, url)| url.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GBINDER_PYPROJECT: &str = r#"
[build-system]
requires = ["setuptools>=61.0", "wheel", "Cython>=0.29", "GitPython"]
build-backend = "setuptools.build_meta"

[project]
name = "gbinder"
version = "1.2.7"
description = "Cython extension module for C++ gbinder functions"
readme = "README.md"
requires-python = ">=3.6"
license = { text = "GPLv3" }
authors = [{ name = "Erfan Abdi", email = "erfangplus@gmail.com" }]
maintainers = [{ name = "Meshack Bahati" }]
keywords = ["Cython", "gbinder"]
classifiers = ["Programming Language :: Cython"]

[project.urls]
Source = "https://github.com/Kyle6012/gbinder"
"#;

    #[test]
    fn test_parse_project_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pyproject.toml");
        std::fs::write(&path, GBINDER_PYPROJECT).unwrap();

        let descriptor = parse(&path).unwrap().expect("project table present");
        assert_eq!(descriptor.kind, Some(DescriptorKind::Pyproject));
        assert_eq!(descriptor.name.as_deref(), Some("gbinder"));
        assert_eq!(descriptor.version.as_deref(), Some("1.2.7"));
        assert_eq!(descriptor.license.as_deref(), Some("GPLv3"));
        assert_eq!(descriptor.readme.as_deref(), Some("README.md"));
        assert_eq!(descriptor.authors[0].email.as_deref(), Some("erfangplus@gmail.com"));
        assert_eq!(
            descriptor.source_url.as_deref(),
            Some("https://github.com/Kyle6012/gbinder")
        );
        let build_system = descriptor.build_system.unwrap();
        assert_eq!(build_system.requires.len(), 4);
        assert_eq!(
            build_system.build_backend.as_deref(),
            Some("setuptools.build_meta")
        );
    }

    #[test]
    fn test_build_only_pyproject_is_not_a_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pyproject.toml");
        std::fs::write(
            &path,
            "[build-system]\nrequires = [\"setuptools\"]\nbuild-backend = \"setuptools.build_meta\"\n",
        )
        .unwrap();

        assert!(parse(&path).unwrap().is_none());
        let build_system = read_build_system(&path).unwrap().unwrap();
        assert_eq!(build_system.requires, vec!["setuptools".to_string()]);
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pyproject.toml");
        std::fs::write(&path, "[project\nname = ").unwrap();
        assert!(parse(&path).is_err());
    }
}
