//! Release orchestration.
//!
//! A run moves through `Idle → TriggerMatched → EnvironmentReady →
//! ArtifactsBuilt → Published`, or into `Failed` from any non-terminal state.
//! Each transition is checked and written to the run record before the next
//! stage starts; a stage never runs unless the previous one succeeded.
//!
//! The output directory is discarded once a run ends in `Published`, or in
//! `Failed` after the build stage started. Only `BuiltOnly` keeps it.

mod state;

pub use state::{PipelineState, Stage};

use crate::build::{self, ArtifactBuilder, ArtifactSet, DEFAULT_PURGE_TARGETS};
use crate::environment::{self, EnvironmentDescriptor, SystemPackage, Toolchain};
use crate::error::{ReleaseError, Result};
use crate::metadata::{self, ProjectDescriptor};
use crate::publish::{
    Credential, DEFAULT_REPOSITORY_URL, PublishDecision, PublishGuard, PublishReport, Publisher,
    Uploader,
};
use crate::state::{RunState, StateManager, create_state_manager};
use crate::trigger::{ReleaseTag, ReleaseTrigger, TriggerDecision};
use serde::Serialize;
use std::path::PathBuf;

/// How a run ended when it did not fail
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum PipelineOutcome {
    /// The reference is not a release tag; nothing ran
    NotTriggered {
        /// Why the reference did not match
        reason: String,
    },
    /// Artifacts were built and kept in the output directory but not uploaded
    BuiltOnly {
        /// Verified Artifact Set
        artifacts: ArtifactSet,
        /// Why publishing was skipped
        reason: String,
    },
    /// Every artifact was uploaded; the output directory is gone
    Published {
        /// Uploaded Artifact Set
        artifacts: ArtifactSet,
        /// Upload report
        report: PublishReport,
    },
}

impl PipelineOutcome {
    /// Final state of the run
    pub fn state(&self) -> PipelineState {
        match self {
            PipelineOutcome::NotTriggered { .. } => PipelineState::Idle,
            PipelineOutcome::BuiltOnly { .. } => PipelineState::ArtifactsBuilt,
            PipelineOutcome::Published { .. } => PipelineState::Published,
        }
    }
}

/// Settings for one pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Project root containing the descriptor
    pub project_dir: PathBuf,
    /// Where artifacts are written; purged before every build
    pub output_dir: PathBuf,
    /// Package index upload endpoint
    pub repository_url: String,
    /// Stale outputs removed before building, relative to the project
    pub purge: Vec<String>,
    /// System packages checked during provisioning
    pub system_packages: Vec<SystemPackage>,
    /// Python interpreter for probing and building
    pub python: String,
}

impl PipelineConfig {
    /// Defaults for a project directory
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        Self {
            output_dir: project_dir.join("dist"),
            project_dir,
            repository_url: DEFAULT_REPOSITORY_URL.to_string(),
            purge: DEFAULT_PURGE_TARGETS.iter().map(|s| s.to_string()).collect(),
            system_packages: environment::default_system_packages(),
            python: "python3".to_string(),
        }
    }
}

/// Release orchestrator over pluggable toolchain, builder and uploader
#[derive(Debug)]
pub struct Pipeline<T: Toolchain, B: ArtifactBuilder, U: Uploader> {
    config: PipelineConfig,
    toolchain: T,
    builder: B,
    publisher: Publisher<U>,
    state_manager: StateManager,
}

impl<T: Toolchain, B: ArtifactBuilder, U: Uploader> Pipeline<T, B, U> {
    /// Assemble a pipeline
    pub fn new(config: PipelineConfig, toolchain: T, builder: B, uploader: U) -> Self {
        let publisher = Publisher::new(uploader, config.repository_url.clone());
        let state_manager = create_state_manager(&config.project_dir);
        Self {
            config,
            toolchain,
            builder,
            publisher,
            state_manager,
        }
    }

    /// Pipeline settings
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the release for one reference
    ///
    /// The credential is only handed to the uploader; it is never stored in
    /// the run record or logged. A reference that is not a release tag ends
    /// the run immediately without touching the project directory.
    pub async fn run(
        &self,
        trigger: &ReleaseTrigger,
        credential: Option<&Credential>,
    ) -> Result<PipelineOutcome> {
        let tag = match trigger.evaluate() {
            TriggerDecision::Matched(tag) => tag,
            TriggerDecision::Ignored { reference, reason } => {
                log::info!("Reference '{}' does not trigger a release: {}", reference, reason);
                return Ok(PipelineOutcome::NotTriggered { reason });
            }
        };
        log::info!("Release triggered by {}", tag);

        let mut record = RunState::new(trigger.reference());
        record.release_version = Some(tag.version.clone());
        record.advance(
            PipelineState::TriggerMatched,
            Some(serde_json::json!({ "tag": tag.name })),
        )?;
        self.state_manager.save_state(&mut record)?;

        match self.execute(trigger, &tag, credential, &mut record).await {
            Ok(outcome) => {
                if matches!(outcome, PipelineOutcome::Published { .. }) {
                    self.discard_artifacts();
                }
                Ok(outcome)
            }
            Err(error) => {
                let stage = record.current_state.active_stage();
                log::error!("Release failed during {} stage: {}", stage, error);
                record.fail(&error);
                if let Err(save_error) = self.state_manager.save_state(&mut record) {
                    log::warn!("Could not record failure: {}", save_error);
                }
                if matches!(stage, Stage::Build | Stage::Publish) {
                    self.discard_artifacts();
                }
                Err(ReleaseError::StageFailed {
                    stage,
                    source: Box::new(error),
                })
            }
        }
    }

    async fn execute(
        &self,
        trigger: &ReleaseTrigger,
        tag: &ReleaseTag,
        credential: Option<&Credential>,
        record: &mut RunState,
    ) -> Result<PipelineOutcome> {
        // Provision
        let project = metadata::resolve(&self.config.project_dir)?;
        metadata::check_tag_version(&project, tag)?;
        log::info!("Releasing {} {}", project.name, project.version);

        let descriptor = EnvironmentDescriptor::new(self.config.system_packages.clone(), &project)?;
        let provisioned = environment::provision(&descriptor, &self.toolchain).await?;
        record.advance(
            PipelineState::EnvironmentReady,
            Some(serde_json::json!({
                "project": project.name,
                "entries": provisioned.entries.len(),
                "vendored": provisioned.vendored,
            })),
        )?;
        self.state_manager.save_state(record)?;

        // Build
        let artifacts = self.build(&project, &provisioned.env).await?;
        record.advance(
            PipelineState::ArtifactsBuilt,
            Some(serde_json::json!({ "artifacts": file_names(&artifacts) })),
        )?;
        self.state_manager.save_state(record)?;

        // Publish
        let credential = match PublishGuard::new(trigger, &artifacts, credential).evaluate()? {
            PublishDecision::Proceed(credential) => credential,
            PublishDecision::Skip(reason) => {
                log::warn!("Skipping publish: {}", reason);
                return Ok(PipelineOutcome::BuiltOnly {
                    artifacts,
                    reason: reason.to_string(),
                });
            }
        };
        let report = self.publisher.publish(&artifacts, &project, credential).await?;
        record.advance(
            PipelineState::Published,
            Some(serde_json::json!({
                "uploaded": report.uploaded,
                "repository": report.repository_url,
            })),
        )?;
        self.state_manager.save_state(record)?;

        Ok(PipelineOutcome::Published { artifacts, report })
    }

    fn discard_artifacts(&self) {
        let output_dir = &self.config.output_dir;
        if !output_dir.exists() {
            return;
        }
        if let Err(e) = build::ensure_separate(&self.config.project_dir, output_dir) {
            log::warn!("Keeping {}: {}", output_dir.display(), e);
            return;
        }
        match std::fs::remove_dir_all(output_dir) {
            Ok(()) => log::debug!("Discarded {}", output_dir.display()),
            Err(e) => log::warn!("Could not discard {}: {}", output_dir.display(), e),
        }
    }

    async fn build(
        &self,
        project: &ProjectDescriptor,
        env: &std::collections::BTreeMap<String, String>,
    ) -> Result<ArtifactSet> {
        build::build_artifacts(
            &self.builder,
            &self.config.project_dir,
            &self.config.output_dir,
            &self.config.purge,
            env,
            &project.name,
            &project.version,
        )
        .await
    }
}

fn file_names(artifacts: &ArtifactSet) -> Vec<&str> {
    artifacts
        .artifacts
        .iter()
        .map(|a| a.file_name.as_str())
        .collect()
}
