//! Run command implementation.
//!
//! Drives the full pipeline for one reference with the real toolchain,
//! `python -m build`, and the package index uploader.

use super::EXIT_SUCCESS;
use super::build::print_artifacts;
use crate::build::PythonBuild;
use crate::cli::{Args, Command, RuntimeConfig};
use crate::environment::SystemToolchain;
use crate::error::Result;
use crate::pipeline::{Pipeline, PipelineOutcome};
use crate::publish::{Credential, IndexUploader};
use crate::trigger::{ReleaseTrigger, TriggerDecision};

/// Execute run command
pub(super) async fn execute_run(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let Command::Run {
        reference,
        project,
        repository_url,
        token,
    } = &args.command
    else {
        unreachable!("execute_run called with non-Run command");
    };

    let trigger = ReleaseTrigger::parse(reference.as_str());
    // Nothing is read or written for references that are not release tags
    if let TriggerDecision::Ignored { reference, reason } = trigger.evaluate() {
        config.println(&format!("ℹ️  {} is not a release tag ({}); nothing to do", reference, reason));
        return Ok(EXIT_SUCCESS);
    }

    let project_dir = project.project_dir()?;
    let pipeline_config = project
        .release_config(repository_url.clone())?
        .pipeline_config(&project_dir);
    let credential = token.clone().and_then(Credential::new);

    config.verbose_println(&format!("Project: {}", project_dir.display()));
    config.verbose_println(&format!("Repository: {}", pipeline_config.repository_url));

    let uploader = IndexUploader::new(&pipeline_config.repository_url)?;
    let toolchain = SystemToolchain::new(pipeline_config.python.clone());
    let builder = PythonBuild::new(pipeline_config.python.clone());
    let pipeline = Pipeline::new(pipeline_config, toolchain, builder, uploader);

    config.println(&format!("🚀 Releasing from {}", trigger.reference()));
    match pipeline.run(&trigger, credential.as_ref()).await? {
        PipelineOutcome::NotTriggered { reason } => {
            config.println(&format!("ℹ️  Not a release: {}", reason));
        }
        PipelineOutcome::BuiltOnly { artifacts, reason } => {
            print_artifacts(config, &artifacts);
            config.warning_println(&format!("Artifacts built but not published: {}", reason));
        }
        PipelineOutcome::Published { artifacts, report } => {
            print_artifacts(config, &artifacts);
            config.success_println(&format!(
                "Published {} artifact(s) to {}",
                report.uploaded.len(),
                report.repository_url
            ));
        }
    }
    Ok(EXIT_SUCCESS)
}
