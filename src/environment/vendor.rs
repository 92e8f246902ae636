//! Building native libraries from source when the host lacks them.
//!
//! The library is cloned at a pinned tag, configured with meson into a private
//! prefix, and installed with ninja. The resulting pkg-config directory is then
//! added to `PKG_CONFIG_PATH` for the extension build.

use super::VendorRecipe;
use crate::error::{ProvisionError, ReleaseError, Result};
use crate::process;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Clone, configure, build and install `package`; returns its pkg-config directory
pub(super) async fn build_from_source(
    vendor_root: &Path,
    package: &str,
    recipe: &VendorRecipe,
) -> Result<PathBuf> {
    let root = vendor_root.join(format!("{}-{}", package, recipe.tag));
    let install_dir = root.join("install");

    if let Some(pc_dir) = find_pkg_config_dir(&install_dir, package) {
        log::info!("Reusing vendored {} at {}", package, install_dir.display());
        return Ok(pc_dir);
    }

    let failed = |reason: String| -> ReleaseError {
        ProvisionError::VendorFailed {
            package: package.to_string(),
            reason,
        }
        .into()
    };

    if root.exists() {
        std::fs::remove_dir_all(&root)
            .map_err(|e| failed(format!("cannot clear {}: {}", root.display(), e)))?;
    }
    std::fs::create_dir_all(&root)?;

    let src_dir = root.join("src");
    let build_dir = root.join("build");
    let src = src_dir.to_string_lossy().to_string();
    let build = build_dir.to_string_lossy().to_string();
    let prefix = install_dir.to_string_lossy().to_string();
    let env = BTreeMap::new();

    log::info!("Cloning {}@{} into {}", recipe.repository, recipe.tag, src);
    let steps: [(&str, Vec<&str>); 4] = [
        (
            "git",
            vec![
                "clone",
                "--depth",
                "1",
                "--branch",
                recipe.tag.as_str(),
                recipe.repository.as_str(),
                src.as_str(),
            ],
        ),
        (
            "meson",
            vec![
                "setup",
                "--prefix",
                prefix.as_str(),
                "--libdir",
                "lib",
                build.as_str(),
                src.as_str(),
            ],
        ),
        ("ninja", vec!["-C", build.as_str()]),
        ("ninja", vec!["-C", build.as_str(), "install"]),
    ];

    for (program, args) in &steps {
        let output = process::run(program, args, Some(&root), &env).await?;
        if !output.success {
            return Err(failed(format!(
                "'{}' failed:\n{}",
                process::display_command(program, args),
                output.stderr_tail()
            )));
        }
    }

    find_pkg_config_dir(&install_dir, package).ok_or_else(|| {
        failed(format!(
            "installed into {} but no {}.pc was produced",
            install_dir.display(),
            package
        ))
    })
}

/// Directory under `install_dir` containing `<package>.pc`
fn find_pkg_config_dir(install_dir: &Path, package: &str) -> Option<PathBuf> {
    if !install_dir.is_dir() {
        return None;
    }
    let pattern = install_dir.join("**").join("pkgconfig").join(format!("{package}.pc"));
    glob::glob(&pattern.to_string_lossy())
        .ok()?
        .filter_map(|entry| entry.ok())
        .find_map(|pc| pc.parent().map(Path::to_path_buf))
}
