//! Run record management.
//!
//! Each pipeline run writes a record of the states it reached and any failure,
//! so the last run can be inspected after the fact.

mod manager;
mod run_state;

pub use manager::StateManager;
pub use run_state::{RunCheckpoint, RunError, RunState, STATE_FORMAT_VERSION};

use std::path::{Path, PathBuf};

/// State file name, relative to the project directory
pub const STATE_FILE_NAME: &str = ".pyext_release_state.json";

/// Path of the state file for a project
pub fn state_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(STATE_FILE_NAME)
}

/// Create a state manager for the given project directory
pub fn create_state_manager(project_dir: &Path) -> StateManager {
    StateManager::new(state_file_path(project_dir))
}

/// Quick check if a run record exists in the given project directory
pub fn has_run_record(project_dir: &Path) -> bool {
    state_file_path(project_dir).exists()
}
