//! Conditional publishing of a built Artifact Set.
//!
//! Publishing runs only when artifacts were built, the trigger still names a
//! release tag, and a credential was supplied. Every artifact is uploaded in
//! order; the first failure ends the publish with no retry.

mod credential;
mod index;

pub use credential::{Credential, TOKEN_USERNAME};
pub use index::{DEFAULT_REPOSITORY_URL, IndexUploader};

use crate::build::{Artifact, ArtifactSet};
use crate::error::{PublishError, Result};
use crate::metadata::ProjectDescriptor;
use crate::trigger::ReleaseTrigger;
use serde::Serialize;
use std::fmt;
use std::future::Future;

/// Sends one artifact to the package index
pub trait Uploader: Send + Sync {
    /// Upload a single artifact
    fn upload(
        &self,
        artifact: &Artifact,
        project: &ProjectDescriptor,
        credential: &Credential,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Why publishing was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// No credential was supplied
    MissingCredential,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingCredential => write!(f, "no publish credential (PYPI_API_TOKEN) available"),
        }
    }
}

/// Result of evaluating the publish preconditions
#[derive(Debug)]
pub enum PublishDecision<'a> {
    /// All preconditions hold
    Proceed(&'a Credential),
    /// Publishing is skipped without error
    Skip(SkipReason),
}

/// Publish preconditions, evaluated immediately before uploading
#[derive(Debug)]
pub struct PublishGuard<'a> {
    trigger: &'a ReleaseTrigger,
    artifacts: &'a ArtifactSet,
    credential: Option<&'a Credential>,
}

impl<'a> PublishGuard<'a> {
    /// Create a guard for one publish attempt
    pub fn new(
        trigger: &'a ReleaseTrigger,
        artifacts: &'a ArtifactSet,
        credential: Option<&'a Credential>,
    ) -> Self {
        Self {
            trigger,
            artifacts,
            credential,
        }
    }

    /// Re-check the trigger and artifacts, then look for a credential
    ///
    /// A non-release trigger or an empty Artifact Set here means the pipeline
    /// was driven out of order and is an error; a missing credential is a skip.
    pub fn evaluate(&self) -> Result<PublishDecision<'a>> {
        if !self.trigger.matches() {
            return Err(PublishError::PreconditionFailed {
                reason: format!(
                    "reference '{}' is not a release tag",
                    self.trigger.reference()
                ),
            }
            .into());
        }
        if self.artifacts.is_empty() {
            return Err(PublishError::PreconditionFailed {
                reason: "no artifacts were built".to_string(),
            }
            .into());
        }
        Ok(match self.credential {
            Some(credential) => PublishDecision::Proceed(credential),
            None => PublishDecision::Skip(SkipReason::MissingCredential),
        })
    }
}

/// Outcome of a completed publish
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    /// Uploaded filenames in upload order
    pub uploaded: Vec<String>,
    /// Repository the files were sent to
    pub repository_url: String,
}

/// Uploads an Artifact Set with an explicitly supplied credential
#[derive(Debug)]
pub struct Publisher<U: Uploader> {
    uploader: U,
    repository_url: String,
}

impl<U: Uploader> Publisher<U> {
    /// Create a publisher
    pub fn new(uploader: U, repository_url: impl Into<String>) -> Self {
        Self {
            uploader,
            repository_url: repository_url.into(),
        }
    }

    /// Repository URL
    pub fn repository_url(&self) -> &str {
        &self.repository_url
    }

    /// Upload every artifact; stops at the first failure
    pub async fn publish(
        &self,
        artifacts: &ArtifactSet,
        project: &ProjectDescriptor,
        credential: &Credential,
    ) -> Result<PublishReport> {
        let mut uploaded = Vec::with_capacity(artifacts.len());
        for artifact in &artifacts.artifacts {
            self.uploader.upload(artifact, project, credential).await?;
            log::info!("Uploaded {}", artifact.file_name);
            uploaded.push(artifact.file_name.clone());
        }
        Ok(PublishReport {
            uploaded,
            repository_url: self.repository_url.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::ArtifactKind;
    use std::path::PathBuf;

    fn artifact_set() -> ArtifactSet {
        ArtifactSet {
            output_dir: PathBuf::from("dist"),
            artifacts: vec![Artifact {
                path: PathBuf::from("dist/gbinder-1.2.7.tar.gz"),
                file_name: "gbinder-1.2.7.tar.gz".to_string(),
                kind: ArtifactKind::Sdist,
                project: "gbinder".to_string(),
                version: "1.2.7".to_string(),
            }],
        }
    }

    #[test]
    fn test_guard_proceeds_with_credential() {
        let trigger = ReleaseTrigger::parse("refs/tags/v1.2.7");
        let artifacts = artifact_set();
        let credential = Credential::new("token").unwrap();
        let decision = PublishGuard::new(&trigger, &artifacts, Some(&credential))
            .evaluate()
            .unwrap();
        assert!(matches!(decision, PublishDecision::Proceed(_)));
    }

    #[test]
    fn test_guard_skips_without_credential() {
        let trigger = ReleaseTrigger::parse("v1.2.7");
        let artifacts = artifact_set();
        let decision = PublishGuard::new(&trigger, &artifacts, None).evaluate().unwrap();
        assert!(matches!(
            decision,
            PublishDecision::Skip(SkipReason::MissingCredential)
        ));
    }

    #[test]
    fn test_guard_rechecks_trigger() {
        let trigger = ReleaseTrigger::parse("refs/heads/main");
        let artifacts = artifact_set();
        let credential = Credential::new("token").unwrap();
        assert!(PublishGuard::new(&trigger, &artifacts, Some(&credential))
            .evaluate()
            .is_err());
    }

    #[test]
    fn test_guard_requires_artifacts() {
        let trigger = ReleaseTrigger::parse("v1.2.7");
        let artifacts = ArtifactSet::default();
        let credential = Credential::new("token").unwrap();
        assert!(PublishGuard::new(&trigger, &artifacts, Some(&credential))
            .evaluate()
            .is_err());
    }
}
