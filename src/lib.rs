//! # pyext_release
//!
//! Tag-driven release pipeline for Python native-extension packages.
//!
//! A pushed version tag is turned into published artifacts through an explicit
//! state machine:
//!
//! ```text
//! Idle → TriggerMatched → EnvironmentReady → ArtifactsBuilt → Published | Failed
//! ```
//!
//! ## Features
//!
//! - **Strict Triggers**: Only `v<major>.<minor>.<patch>` tags start a release
//! - **Descriptor Validation**: Conflicting package descriptors are rejected, never guessed
//! - **Environment Provisioning**: System packages and build dependencies are checked up front,
//!   with optional vendoring of native libraries that pkg-config cannot find
//! - **Clean Builds**: Stale outputs are purged before every build
//! - **Verified Artifacts**: Exactly one sdist and at least one wheel, all carrying the tag version
//! - **Token Publishing**: Uploads every artifact with an explicitly passed credential
//!
//! ## Usage
//!
//! ```bash
//! pyext_release run --ref refs/tags/v1.2.7   # Full pipeline (token from PYPI_API_TOKEN)
//! pyext_release check-ref release-1         # Trigger evaluation only
//! pyext_release validate --json             # Descriptor validation
//! pyext_release build                       # Purge, build and verify without publishing
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Core modules
pub mod build;
pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod publish;
pub mod state;
pub mod trigger;

mod process;

// Re-export main types for public API
pub use build::{Artifact, ArtifactBuilder, ArtifactKind, ArtifactSet, PythonBuild};
pub use cli::Args;
pub use config::ReleaseConfig;
pub use environment::{EnvironmentDescriptor, SystemToolchain, Toolchain};
pub use error::{CliError, ReleaseError, Result};
pub use metadata::{PackageDescriptor, ProjectDescriptor};
pub use pipeline::{Pipeline, PipelineOutcome, PipelineState};
pub use publish::{Credential, IndexUploader, Publisher, Uploader};
pub use state::{RunState, StateManager};
pub use trigger::{ReleaseTag, ReleaseTrigger, TriggerDecision};
