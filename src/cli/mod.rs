//! Command line interface for pyext_release.
//!
//! Parses arguments, wires the real toolchain, builder and uploader into the
//! pipeline, and turns outcomes into exit codes.

mod args;
pub mod commands;
mod output;

pub use args::{Args, Command, ProjectArgs, RuntimeConfig};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
