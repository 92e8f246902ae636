//! Command execution.
//!
//! Each command prints its own progress and returns an exit code; errors are
//! reported here together with recovery suggestions.

mod build;
mod check_ref;
mod provision;
mod run;
mod status;
mod validate;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;

use build::execute_build;
use check_ref::execute_check_ref;
use provision::execute_provision;
use run::execute_run;
use status::execute_status;
use validate::execute_validate;

/// Exit code for success, including runs that were not triggered
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for any failure
pub const EXIT_FAILURE: i32 = 1;
/// Exit code of `check-ref` when the reference is not a release tag
pub const EXIT_NOT_RELEASE: i32 = 2;

/// Execute the command based on parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        let output = super::OutputManager::new(false, false);
        output.error(&format!("Invalid arguments: {}", validation_error));
        return Ok(EXIT_FAILURE);
    }

    let config = RuntimeConfig::from(&args);

    let result = match &args.command {
        Command::Run { .. } => execute_run(&args, &config).await,
        Command::CheckRef { .. } => execute_check_ref(&args, &config),
        Command::Validate { .. } => execute_validate(&args, &config),
        Command::Provision { .. } => execute_provision(&args, &config).await,
        Command::Build { .. } => execute_build(&args, &config).await,
        Command::Status { .. } => execute_status(&args, &config),
    };

    match result {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            config.error_println(&format!(
                "Command '{}' failed: {}",
                args.command.name(),
                e
            ));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() && !config.is_quiet() {
                config.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    config.println(&format!("  • {}", suggestion));
                }
            }

            Ok(EXIT_FAILURE)
        }
    }
}
