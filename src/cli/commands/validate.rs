//! Validate command implementation.
//!
//! Checks that the project declares its metadata exactly once and completely.

use super::{EXIT_FAILURE, EXIT_SUCCESS};
use crate::cli::args::absolute_dir;
use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;
use crate::metadata::{DescriptorValidator, discover};

/// Execute validate command
pub(super) fn execute_validate(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let Command::Validate {
        project,
        detailed,
        json,
    } = &args.command
    else {
        unreachable!("execute_validate called with non-Validate command");
    };

    let project_dir = absolute_dir(project)?;
    config.verbose_println(&format!("Validating {}...", project_dir.display()));

    let descriptors = discover(&project_dir)?;
    let validation = DescriptorValidator::new(&descriptors).validate();

    if *json {
        config.output().json(&validation)?;
    } else {
        config.println(&format!("📋 {}", validation.summary()));

        for check in &validation.checks {
            if *detailed || !check.passed {
                config.println(&format!("  {}", check.format_result()));
            }
        }

        if !validation.warnings.is_empty() {
            config.println("\n⚠️ Warnings:");
            for warning in &validation.warnings {
                config.warning_println(&format!("  • {}", warning));
            }
        }

        if !validation.critical_errors.is_empty() {
            config.println("\n❌ Critical Errors:");
            for error in &validation.critical_errors {
                config.error_println(&format!("  • {}", error));
            }
        }
    }

    Ok(if validation.success {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}
