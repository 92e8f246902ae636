//! Command line argument parsing and validation.
//!
//! Flags that CI usually supplies through the environment (`GITHUB_REF`,
//! `PYPI_API_TOKEN`) fall back to those variables.

use crate::config::ReleaseConfig;
use crate::error::{CliError, Result};
use clap::{Parser, Subcommand};
use path_absolutize::Absolutize;
use std::path::PathBuf;

/// Release orchestrator for Python native-extension packages
#[derive(Parser, Debug)]
#[command(
    name = "pyext_release",
    version,
    about = "Build and publish Python native-extension releases from version tags",
    long_about = "Turns a pushed version tag into published source and binary distributions.

A run resolves the package descriptor, checks that every system package and
build dependency is present, purges stale outputs, builds an sdist and wheel(s),
verifies them and uploads them to the package index.

Usage:
  GITHUB_REF=refs/tags/v1.2.7 PYPI_API_TOKEN=... pyext_release run
  pyext_release check-ref refs/tags/v1.2.7
  pyext_release validate --project ./gbinder-python"
)]
pub struct Args {
    /// Command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Show additional detail
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Project location and build settings shared by several commands
#[derive(clap::Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project directory containing the package descriptor
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub project: PathBuf,

    /// Artifact directory (purged before every build)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Python interpreter used to probe and build
    #[arg(long, value_name = "PYTHON", env = "PYEXT_RELEASE_PYTHON")]
    pub python: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full release pipeline for a reference
    Run {
        /// Git reference that triggered the run (e.g. refs/tags/v1.2.7)
        #[arg(long = "ref", value_name = "REF", env = "GITHUB_REF")]
        reference: String,

        #[command(flatten)]
        project: ProjectArgs,

        /// Package index upload endpoint
        #[arg(long, value_name = "URL", env = "PYEXT_RELEASE_REPOSITORY_URL")]
        repository_url: Option<String>,

        /// Package index API token; prefer the environment variable
        #[arg(long, value_name = "TOKEN", env = "PYPI_API_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Check whether a reference is a release tag
    CheckRef {
        /// Git reference or tag name
        #[arg(value_name = "REF")]
        reference: String,
    },

    /// Validate the package descriptor
    Validate {
        /// Project directory containing the package descriptor
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        project: PathBuf,

        /// Show every check, not only failures
        #[arg(short, long)]
        detailed: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check system packages and build dependencies
    Provision {
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Purge, build and verify artifacts without publishing
    Build {
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Show the record of the last run
    Status {
        /// Project directory containing the run record
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        project: PathBuf,

        /// Show checkpoints and errors
        #[arg(short, long)]
        detailed: bool,

        /// Output the record as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        match &self.command {
            Command::Run { reference, .. } | Command::CheckRef { reference } => {
                if reference.trim().is_empty() {
                    return Err("Reference must not be empty".to_string());
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl Command {
    /// Command name for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Run { .. } => "run",
            Command::CheckRef { .. } => "check-ref",
            Command::Validate { .. } => "validate",
            Command::Provision { .. } => "provision",
            Command::Build { .. } => "build",
            Command::Status { .. } => "status",
        }
    }
}

impl ProjectArgs {
    /// Absolute project directory
    pub fn project_dir(&self) -> Result<PathBuf> {
        absolute_dir(&self.project)
    }

    /// Project configuration with these flags applied on top
    pub fn release_config(&self, repository_url: Option<String>) -> Result<ReleaseConfig> {
        let project_dir = self.project_dir()?;
        let overrides = ReleaseConfig {
            output_dir: self.output_dir.clone(),
            repository_url,
            python: self.python.clone(),
            ..Default::default()
        };
        Ok(ReleaseConfig::load(&project_dir)?.merge(overrides))
    }
}

/// Absolutize a directory argument and check that it exists
pub fn absolute_dir(path: &std::path::Path) -> Result<PathBuf> {
    let absolute = path
        .absolutize()
        .map_err(|e| CliError::InvalidArguments {
            reason: format!("Invalid path {}: {}", path.display(), e),
        })?
        .into_owned();
    if !absolute.is_dir() {
        return Err(CliError::InvalidArguments {
            reason: format!("{} is not a directory", absolute.display()),
        }
        .into());
    }
    Ok(absolute)
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            output: super::OutputManager::new(verbose, quiet),
        }
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print message
    pub fn println(&self, message: &str) {
        self.output.println(message);
    }

    /// Print verbose message
    pub fn verbose_println(&self, message: &str) {
        self.output.verbose(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        self.output.success(message);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        self.output.indent(message);
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.output.is_quiet()
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self::new(args.verbose, args.quiet)
    }
}
