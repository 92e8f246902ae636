//! Probing the host for system packages and build dependencies.

use super::VendorRecipe;
use crate::error::{ProvisionError, Result};
use crate::process;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;

const PYTHON_VERSION_PROBE: &str = "import sys\n\
try:\n    from importlib.metadata import version, PackageNotFoundError\n\
except ImportError:\n    sys.exit(3)\n\
try:\n    print(version(sys.argv[1]))\n\
except PackageNotFoundError:\n    sys.exit(2)\n";

/// Exit code of the version lookup when the distribution is not installed
const EXIT_NOT_INSTALLED: i32 = 2;

/// Exit code of the version lookup when `importlib.metadata` is missing
const EXIT_NO_IMPORTLIB: i32 = 3;

/// Host capabilities the provisioning step depends on
pub trait Toolchain: Send + Sync {
    /// Whether an executable is on `PATH`
    fn has_binary(&self, name: &str) -> bool;

    /// Whether pkg-config knows a module, with extra environment (e.g. `PKG_CONFIG_PATH`)
    fn has_pkg_config(
        &self,
        module: &str,
        env: &BTreeMap<String, String>,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Installed version of a Python distribution, `None` when absent
    fn python_package_version(
        &self,
        package: &str,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Build and install a native library from source; returns its pkg-config directory
    fn vendor(
        &self,
        package: &str,
        recipe: &VendorRecipe,
    ) -> impl Future<Output = Result<PathBuf>> + Send;

    /// Python interpreter used for the build
    fn python(&self) -> &str;
}

/// Toolchain backed by the real host
#[derive(Debug, Clone)]
pub struct SystemToolchain {
    python: String,
    vendor_root: PathBuf,
}

impl SystemToolchain {
    /// Create a toolchain using the given Python interpreter
    pub fn new(python: impl Into<String>) -> Self {
        let vendor_root = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("pyext_release")
            .join("vendor");
        Self {
            python: python.into(),
            vendor_root,
        }
    }

    /// Override where vendored libraries are built and installed
    pub fn with_vendor_root(mut self, vendor_root: PathBuf) -> Self {
        self.vendor_root = vendor_root;
        self
    }
}

impl Toolchain for SystemToolchain {
    fn has_binary(&self, name: &str) -> bool {
        which::which(name).is_ok()
    }

    async fn has_pkg_config(&self, module: &str, env: &BTreeMap<String, String>) -> Result<bool> {
        if !self.has_binary("pkg-config") {
            return Ok(false);
        }
        let output = process::run("pkg-config", &["--exists", module], None, env).await?;
        Ok(output.success)
    }

    async fn python_package_version(&self, package: &str) -> Result<Option<String>> {
        let output = process::run(
            &self.python,
            &["-c", PYTHON_VERSION_PROBE, package],
            None,
            &BTreeMap::new(),
        )
        .await
        .map_err(|e| ProvisionError::InterpreterUnavailable {
            python: self.python.clone(),
            reason: e.to_string(),
        })?;

        installed_version(&self.python, &output)
    }

    async fn vendor(&self, package: &str, recipe: &VendorRecipe) -> Result<PathBuf> {
        super::vendor::build_from_source(&self.vendor_root, package, recipe).await
    }

    fn python(&self) -> &str {
        &self.python
    }
}

/// Interpret the exit of the `importlib.metadata` version lookup
fn installed_version(python: &str, output: &process::CommandOutput) -> Result<Option<String>> {
    if output.success {
        let version = output.stdout.trim().to_string();
        return Ok((!version.is_empty()).then_some(version));
    }
    let reason = match output.code {
        Some(EXIT_NOT_INSTALLED) => return Ok(None),
        Some(EXIT_NO_IMPORTLIB) => "importlib.metadata is unavailable (Python 3.8 or newer required)"
            .to_string(),
        Some(code) if output.stderr.trim().is_empty() => format!("version lookup exited with {code}"),
        None if output.stderr.trim().is_empty() => "version lookup was terminated".to_string(),
        _ => output.stderr_tail(),
    };
    Err(ProvisionError::InterpreterUnavailable {
        python: python.to_string(),
        reason,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReleaseError;

    fn exited(code: i32, stdout: &str, stderr: &str) -> process::CommandOutput {
        process::CommandOutput {
            success: code == 0,
            code: Some(code),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_installed_version_reads_stdout() {
        let version = installed_version("python3", &exited(0, "3.0.11\n", "")).unwrap();
        assert_eq!(version.as_deref(), Some("3.0.11"));
    }

    #[test]
    fn test_missing_distribution_is_not_installed() {
        assert_eq!(installed_version("python3", &exited(2, "", "")).unwrap(), None);
    }

    #[test]
    fn test_missing_importlib_is_an_unusable_interpreter() {
        let err = installed_version("python3.7", &exited(3, "", "")).unwrap_err();
        assert!(matches!(
            err,
            ReleaseError::Provision(ProvisionError::InterpreterUnavailable { ref python, ref reason })
                if python == "python3.7" && reason.contains("importlib.metadata")
        ));
    }

    #[test]
    fn test_unexpected_exit_is_an_error() {
        assert!(installed_version("python3", &exited(1, "", "Traceback ...\nSyntaxError")).is_err());
        assert!(installed_version("python3", &exited(1, "", "")).is_err());
    }
}
