//! Shared fixtures: a gbinder-like project and in-memory pipeline seams.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use pyext_release::build::ArtifactBuilder;
use pyext_release::environment::{SystemPackage, Toolchain, VendorRecipe};
use pyext_release::error::{PublishError, Result};
use pyext_release::pipeline::PipelineConfig;
use pyext_release::publish::{Credential, Uploader};
use pyext_release::{Artifact, ProjectDescriptor};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const GBINDER_PYPROJECT: &str = r#"[build-system]
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

pub const LEGACY_SETUP_PY: &str = r#"from setuptools import setup, Extension
from Cython.Build import cythonize

setup(
    name="gbinder",
    version="1.2.1",
    ext_modules=cythonize([Extension("gbinder", ["gbinder.pyx"], libraries=["gbinder"])]),
)
"#;

/// Project directory holding only pyproject.toml
pub fn gbinder_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("pyproject.toml"), GBINDER_PYPROJECT).expect("write pyproject");
    dir
}

/// Project directory declaring its metadata in both pyproject.toml and setup.py
pub fn conflicting_project() -> tempfile::TempDir {
    let dir = gbinder_project();
    std::fs::write(dir.path().join("setup.py"), LEGACY_SETUP_PY).expect("write setup.py");
    dir
}

/// Pipeline settings with two small system packages
pub fn pipeline_config(project_dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::new(project_dir);
    config.system_packages = vec![
        SystemPackage::binary("build-essential", "cc"),
        SystemPackage::pkg_config("libgbinder-dev", "libgbinder"),
    ];
    config
}

pub type Events = Arc<Mutex<Vec<String>>>;

pub fn events() -> Events {
    Arc::new(Mutex::new(Vec::new()))
}

fn record(events: &Events, event: impl Into<String>) {
    events.lock().expect("events lock").push(event.into());
}

/// Toolchain where everything is installed unless listed as missing
#[derive(Debug, Clone)]
pub struct FakeToolchain {
    pub events: Events,
    pub missing: BTreeSet<String>,
}

impl FakeToolchain {
    pub fn new(events: Events) -> Self {
        Self {
            events,
            missing: BTreeSet::new(),
        }
    }

    pub fn without(mut self, name: &str) -> Self {
        self.missing.insert(name.to_string());
        self
    }
}

impl Toolchain for FakeToolchain {
    fn has_binary(&self, name: &str) -> bool {
        record(&self.events, format!("probe:{name}"));
        !self.missing.contains(name)
    }

    async fn has_pkg_config(&self, module: &str, _env: &BTreeMap<String, String>) -> Result<bool> {
        record(&self.events, format!("probe:{module}"));
        Ok(!self.missing.contains(module))
    }

    async fn python_package_version(&self, package: &str) -> Result<Option<String>> {
        record(&self.events, format!("probe:{package}"));
        if self.missing.contains(package) {
            Ok(None)
        } else {
            Ok(Some("99.0".to_string()))
        }
    }

    async fn vendor(&self, package: &str, _recipe: &VendorRecipe) -> Result<PathBuf> {
        record(&self.events, format!("vendor:{package}"));
        Ok(PathBuf::from("/nonexistent/pkgconfig"))
    }

    fn python(&self) -> &str {
        "python3"
    }
}

/// Builder that writes a real sdist and wheel for a fixed version
#[derive(Debug, Clone)]
pub struct FakeBuilder {
    pub events: Events,
    pub version: String,
    pub wheels: usize,
}

impl FakeBuilder {
    pub fn new(events: Events, version: &str) -> Self {
        Self {
            events,
            version: version.to_string(),
            wheels: 1,
        }
    }
}

impl ArtifactBuilder for FakeBuilder {
    async fn build(
        &self,
        _project_dir: &Path,
        output_dir: &Path,
        _env: &BTreeMap<String, String>,
    ) -> Result<()> {
        let leftovers = std::fs::read_dir(output_dir)?.count();
        record(&self.events, format!("build:leftovers={leftovers}"));

        write_sdist(output_dir, "gbinder", &self.version)?;
        let tags = ["cp311-cp311-linux_x86_64", "cp312-cp312-linux_x86_64"];
        for tag in tags.iter().take(self.wheels) {
            write_wheel(output_dir, "gbinder", &self.version, tag)?;
        }
        Ok(())
    }
}

fn pkg_info(name: &str, version: &str) -> String {
    format!("Metadata-Version: 2.1\nName: {name}\nVersion: {version}\n\nLong description\n")
}

/// Write `{name}-{version}.tar.gz` with a top-level PKG-INFO
pub fn write_sdist(output_dir: &Path, name: &str, version: &str) -> Result<PathBuf> {
    let path = output_dir.join(format!("{name}-{version}.tar.gz"));
    let file = std::fs::File::create(&path)?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    let content = pkg_info(name, version);
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(
        &mut header,
        format!("{name}-{version}/PKG-INFO"),
        content.as_bytes(),
    )?;
    builder.into_inner()?.finish()?;
    Ok(path)
}

/// Write `{name}-{version}-{tag}.whl` with dist-info METADATA
pub fn write_wheel(output_dir: &Path, name: &str, version: &str, tag: &str) -> Result<PathBuf> {
    let path = output_dir.join(format!("{name}-{version}-{tag}.whl"));
    let file = std::fs::File::create(&path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    zip.start_file(format!("{name}-{version}.dist-info/METADATA"), options)
        .map_err(std::io::Error::other)?;
    zip.write_all(pkg_info(name, version).as_bytes())?;
    zip.finish().map_err(std::io::Error::other)?;
    Ok(path)
}

/// Uploader that records filenames, optionally rejecting the credential
#[derive(Debug, Clone)]
pub struct FakeUploader {
    pub events: Events,
    pub uploaded: Arc<Mutex<Vec<String>>>,
    pub reject_auth: bool,
}

impl FakeUploader {
    pub fn new(events: Events) -> Self {
        Self {
            events,
            uploaded: Arc::new(Mutex::new(Vec::new())),
            reject_auth: false,
        }
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.uploaded.lock().expect("uploaded lock").clone()
    }
}

impl Uploader for FakeUploader {
    async fn upload(
        &self,
        artifact: &Artifact,
        project: &ProjectDescriptor,
        credential: &Credential,
    ) -> Result<()> {
        record(&self.events, format!("upload:{}", artifact.file_name));
        assert_eq!(credential.username(), "__token__");
        assert_eq!(project.version, artifact.version);
        if self.reject_auth {
            return Err(PublishError::AuthenticationFailed {
                repository: "https://upload.example.invalid/legacy/".to_string(),
                status: 403,
            }
            .into());
        }
        self.uploaded
            .lock()
            .expect("uploaded lock")
            .push(artifact.file_name.clone());
        Ok(())
    }
}
