//! Provision command implementation.
//!
//! Checks every system package and build dependency without building.

use super::EXIT_SUCCESS;
use crate::cli::{Args, Command, RuntimeConfig};
use crate::environment::{EnvironmentDescriptor, ProvisionedEnvironment, SystemToolchain, provision};
use crate::error::Result;
use crate::metadata;

/// Execute provision command
pub(super) async fn execute_provision(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let Command::Provision { project } = &args.command else {
        unreachable!("execute_provision called with non-Provision command");
    };

    let project_dir = project.project_dir()?;
    let release_config = project.release_config(None)?;
    let pipeline_config = release_config.pipeline_config(&project_dir);

    let descriptor = metadata::resolve(&project_dir)?;
    config.println(&format!("📦 {} {}", descriptor.name, descriptor.version));

    let environment = EnvironmentDescriptor::new(pipeline_config.system_packages, &descriptor)?;
    config.output().progress("Checking build environment...");
    let toolchain = SystemToolchain::new(pipeline_config.python);
    let provisioned = provision(&environment, &toolchain).await?;

    print_environment(config, &provisioned);
    config.success_println("Build environment ready");
    Ok(EXIT_SUCCESS)
}

/// List what provisioning found
pub(super) fn print_environment(config: &RuntimeConfig, provisioned: &ProvisionedEnvironment) {
    for entry in &provisioned.entries {
        config.indent(&format!("✓ {} ({})", entry.name, entry.detail));
    }
    for dir in &provisioned.vendored {
        config.verbose_println(&format!("Vendored pkg-config path: {}", dir.display()));
    }
}
