//! Comprehensive error types for pyext_release operations.
//!
//! This module defines all error types with actionable error messages and recovery suggestions.

use crate::pipeline::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pyext_release operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all pyext_release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Package descriptor errors
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    /// Environment provisioning errors
    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    /// Artifact build errors
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Publishing errors
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// State management errors
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// A pipeline stage failed
    #[error("{stage} stage failed: {source}")]
    StageFailed {
        /// Stage the failure is attributed to
        stage: Stage,
        /// Underlying error
        #[source]
        source: Box<ReleaseError>,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Package descriptor errors
#[derive(Error, Debug)]
pub enum DescriptorError {
    /// No descriptor found in the project directory
    #[error("No package descriptor (pyproject.toml, setup.py, setup.cfg) found in {path}")]
    NotFound {
        /// Project directory that was searched
        path: PathBuf,
    },

    /// Descriptor could not be parsed
    #[error("Failed to parse {path}: {reason}")]
    ParseFailed {
        /// Descriptor path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// More than one descriptor declares the same project
    #[error("Conflicting descriptors for project '{project}': {}", .entries.join(", "))]
    Conflicting {
        /// Normalized project name
        project: String,
        /// `path (version)` of every conflicting descriptor
        entries: Vec<String>,
    },

    /// Descriptor failed validation
    #[error("Invalid package descriptor: {}", .errors.join("; "))]
    Invalid {
        /// Critical validation failures
        errors: Vec<String>,
    },

    /// Release tag and descriptor disagree on the version
    #[error("Tag '{tag}' does not match descriptor version '{descriptor_version}'")]
    TagMismatch {
        /// Release tag name
        tag: String,
        /// Version declared by the descriptor
        descriptor_version: String,
    },
}

/// Environment provisioning errors
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Required system packages or build dependencies are unavailable
    #[error("Missing requirements: system packages {system:?}, build dependencies {python:?}")]
    Missing {
        /// Missing system packages
        system: Vec<String>,
        /// Missing or unsatisfied build-time dependencies
        python: Vec<String>,
    },

    /// Python interpreter not usable
    #[error("Python interpreter '{python}' is not available: {reason}")]
    InterpreterUnavailable {
        /// Interpreter name or path
        python: String,
        /// Reason for the error
        reason: String,
    },

    /// Invalid requirement string
    #[error("Invalid requirement '{requirement}': {reason}")]
    InvalidRequirement {
        /// Raw requirement
        requirement: String,
        /// Reason for the error
        reason: String,
    },

    /// Vendored native library build failed
    #[error("Failed to vendor '{package}': {reason}")]
    VendorFailed {
        /// Package being vendored
        package: String,
        /// Reason for the error
        reason: String,
    },
}

/// Artifact build errors
#[derive(Error, Debug)]
pub enum BuildError {
    /// Failed to purge stale outputs
    #[error("Failed to purge {path}: {reason}")]
    PurgeFailed {
        /// Path that could not be removed
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Build tool exited unsuccessfully
    #[error("Build command '{command}' failed: {reason}")]
    CommandFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },

    /// Build produced no or the wrong artifacts
    #[error("Artifact verification failed: {reason}")]
    VerificationFailed {
        /// Reason for the error
        reason: String,
    },

    /// Artifact filename or contents could not be read
    #[error("Invalid artifact {path}: {reason}")]
    InvalidArtifact {
        /// Artifact path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

/// Publishing errors
#[derive(Error, Debug)]
pub enum PublishError {
    /// File already exists on the index
    #[error("'{file}' already exists on the package index")]
    AlreadyPublished {
        /// Artifact filename
        file: String,
    },

    /// Index rejected the credential
    #[error("Authentication failed for {repository}: HTTP {status}")]
    AuthenticationFailed {
        /// Repository URL
        repository: String,
        /// HTTP status code
        status: u16,
    },

    /// Index rejected the upload
    #[error("Upload of '{file}' rejected: HTTP {status}: {reason}")]
    UploadRejected {
        /// Artifact filename
        file: String,
        /// HTTP status code
        status: u16,
        /// Response body or reason
        reason: String,
    },

    /// Network error during upload
    #[error("Network error uploading '{file}': {reason}")]
    Network {
        /// Artifact filename
        file: String,
        /// Reason for the error
        reason: String,
    },

    /// Publish preconditions violated
    #[error("Publish precondition failed: {reason}")]
    PreconditionFailed {
        /// Reason for the error
        reason: String,
    },

    /// Invalid repository URL
    #[error("Invalid repository URL '{url}': {reason}")]
    InvalidRepository {
        /// URL as given
        url: String,
        /// Reason for the error
        reason: String,
    },
}

/// State management errors
#[derive(Error, Debug)]
pub enum StateError {
    /// State file corrupted
    #[error("State file corrupted: {reason}")]
    Corrupted {
        /// Reason for the error
        reason: String,
    },

    /// State file not found
    #[error("State file not found. No release has run in this project.")]
    NotFound,

    /// State version mismatch
    #[error("State file version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Found version
        found: String,
    },

    /// Illegal pipeline transition
    #[error("Illegal pipeline transition from {from} to {to}")]
    IllegalTransition {
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },

    /// Failed to save state
    #[error("Failed to save state: {reason}")]
    SaveFailed {
        /// Reason for the error
        reason: String,
    },

    /// Failed to load state
    #[error("Failed to load state: {reason}")]
    LoadFailed {
        /// Reason for the error
        reason: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl ReleaseError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::StageFailed { source, .. } => source.recovery_suggestions(),
            ReleaseError::Descriptor(DescriptorError::Conflicting { entries, .. }) => vec![
                format!("Keep exactly one of: {}", entries.join(", ")),
                "Move all metadata into pyproject.toml and reduce setup.py to build logic"
                    .to_string(),
            ],
            ReleaseError::Descriptor(DescriptorError::TagMismatch { .. }) => vec![
                "Bump the descriptor version to match the tag, or re-tag the release".to_string(),
            ],
            ReleaseError::Provision(ProvisionError::Missing { system, python }) => {
                let mut suggestions = Vec::new();
                if !system.is_empty() {
                    suggestions.push(format!(
                        "Install system packages: {}",
                        system.join(" ")
                    ));
                }
                if !python.is_empty() {
                    suggestions.push(format!(
                        "Install build dependencies: python -m pip install {}",
                        python.join(" ")
                    ));
                }
                suggestions
            }
            ReleaseError::Publish(PublishError::AuthenticationFailed { .. }) => vec![
                "Verify PYPI_API_TOKEN is set and scoped to this project".to_string(),
                "Regenerate the API token on the package index if it was revoked".to_string(),
            ],
            ReleaseError::Publish(PublishError::AlreadyPublished { .. }) => vec![
                "Versions on the package index are immutable; tag a new version".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Stage a pipeline failure is attributed to
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ReleaseError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Innermost error, unwrapping stage attribution
    pub fn root(&self) -> &ReleaseError {
        match self {
            ReleaseError::StageFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        if let ReleaseError::StageFailed { source, .. } = self {
            return source.is_recoverable();
        }
        !matches!(
            self,
            ReleaseError::Descriptor(DescriptorError::Conflicting { .. })
                | ReleaseError::Descriptor(DescriptorError::TagMismatch { .. })
                | ReleaseError::Publish(PublishError::AlreadyPublished { .. })
                | ReleaseError::State(StateError::IllegalTransition { .. })
        )
    }
}
