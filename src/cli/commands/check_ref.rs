//! Check-ref command implementation.

use super::{EXIT_NOT_RELEASE, EXIT_SUCCESS};
use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;
use crate::trigger::{ReleaseTrigger, TriggerDecision};

/// Execute check-ref command
pub(super) fn execute_check_ref(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let Command::CheckRef { reference } = &args.command else {
        unreachable!("execute_check_ref called with non-CheckRef command");
    };

    match ReleaseTrigger::parse(reference.as_str()).evaluate() {
        TriggerDecision::Matched(tag) => {
            config.success_println(&format!("{} is a release tag for version {}", tag.name, tag.version));
            Ok(EXIT_SUCCESS)
        }
        TriggerDecision::Ignored { reference, reason } => {
            config.println(&format!("{} is not a release tag: {}", reference, reason));
            Ok(EXIT_NOT_RELEASE)
        }
    }
}
