//! Status command implementation.
//!
//! Displays the record of the last pipeline run.

use super::EXIT_SUCCESS;
use crate::cli::args::absolute_dir;
use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;
use crate::state::{create_state_manager, has_run_record};

/// Execute status command
pub(super) fn execute_status(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let Command::Status {
        project,
        detailed,
        json,
    } = &args.command
    else {
        unreachable!("execute_status called with non-Status command");
    };

    let project_dir = absolute_dir(project)?;
    if !has_run_record(&project_dir) {
        if *json {
            config.output().json(&serde_json::json!({ "status": "no_run_recorded" }))?;
        } else {
            config.println("No release run recorded");
        }
        return Ok(EXIT_SUCCESS);
    }

    let run_state = create_state_manager(&project_dir).load_state()?;

    if *json {
        config.output().json(&run_state)?;
        return Ok(EXIT_SUCCESS);
    }

    config.println(&format!("📊 {}", run_state.summary()));
    if let Some(error) = run_state.errors.last() {
        config.error_println(&format!("Failed during {} stage: {}", error.stage, error.message));
    }

    if *detailed {
        config.println(&format!("Run ID: {}", run_state.run_id));
        config.println(&format!("Reference: {}", run_state.reference));
        config.println(&format!("Started: {}", run_state.started_at));
        config.println(&format!("Updated: {}", run_state.updated_at));

        if !run_state.checkpoints.is_empty() {
            config.println("\nCheckpoints:");
            for checkpoint in &run_state.checkpoints {
                config.println(&format!("  ✓ {} ({})", checkpoint.state, checkpoint.timestamp));
            }
        }

        if !run_state.errors.is_empty() {
            config.println("\nErrors:");
            for error in &run_state.errors {
                let recoverable = if error.recoverable {
                    "recoverable"
                } else {
                    "critical"
                };
                config.println(&format!("  ❌ [{}] {} ({})", error.stage, error.message, recoverable));
            }
        }
    }

    Ok(EXIT_SUCCESS)
}
