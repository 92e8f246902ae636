//! Build command implementation.
//!
//! Provisions, purges, builds and verifies artifacts without publishing.

use super::EXIT_SUCCESS;
use super::provision::print_environment;
use crate::build::{ArtifactSet, PythonBuild, build_artifacts};
use crate::cli::{Args, Command, RuntimeConfig};
use crate::environment::{EnvironmentDescriptor, SystemToolchain, provision};
use crate::error::Result;
use crate::metadata;

/// Execute build command
pub(super) async fn execute_build(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let Command::Build { project } = &args.command else {
        unreachable!("execute_build called with non-Build command");
    };

    let project_dir = project.project_dir()?;
    let pipeline_config = project.release_config(None)?.pipeline_config(&project_dir);

    let descriptor = metadata::resolve(&project_dir)?;
    config.println(&format!("📦 {} {}", descriptor.name, descriptor.version));

    let environment =
        EnvironmentDescriptor::new(pipeline_config.system_packages.clone(), &descriptor)?;
    config.output().progress("Checking build environment...");
    let toolchain = SystemToolchain::new(pipeline_config.python.clone());
    let provisioned = provision(&environment, &toolchain).await?;
    print_environment(config, &provisioned);

    config.output().progress(&format!(
        "Building into {}...",
        pipeline_config.output_dir.display()
    ));
    let builder = PythonBuild::new(pipeline_config.python.clone());
    let artifacts = build_artifacts(
        &builder,
        &project_dir,
        &pipeline_config.output_dir,
        &pipeline_config.purge,
        &provisioned.env,
        &descriptor.name,
        &descriptor.version,
    )
    .await?;

    print_artifacts(config, &artifacts);
    config.success_println(&format!("Built {} artifact(s)", artifacts.len()));
    Ok(EXIT_SUCCESS)
}

/// List the artifacts of a verified set
pub(super) fn print_artifacts(config: &RuntimeConfig, artifacts: &ArtifactSet) {
    for artifact in &artifacts.artifacts {
        config.indent(&format!("{} ({})", artifact.file_name, artifact.kind.filetype()));
    }
}
