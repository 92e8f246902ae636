//! Run record persistence.
//!
//! The record is written atomically (temp file, fsync, rename) so a crashed run
//! never leaves a half-written file behind.

use crate::error::{Result, StateError};
use crate::state::RunState;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// State manager for the persistent run record
#[derive(Debug, Clone)]
pub struct StateManager {
    /// Path to state file
    state_file_path: PathBuf,
}

impl StateManager {
    /// Create a new state manager
    pub fn new<P: AsRef<Path>>(state_file_path: P) -> Self {
        Self {
            state_file_path: state_file_path.as_ref().to_path_buf(),
        }
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.state_file_path
    }

    /// Save the run record, bumping its save version
    pub fn save_state(&self, state: &mut RunState) -> Result<()> {
        state.validate()?;
        state.save_version += 1;

        let serialized =
            serde_json::to_string_pretty(state).map_err(|e| StateError::SaveFailed {
                reason: format!("Failed to serialize state: {}", e),
            })?;

        let temp_file_path = self.state_file_path.with_extension("tmp");
        {
            let mut file =
                fs::File::create(&temp_file_path).map_err(|e| StateError::SaveFailed {
                    reason: format!("Failed to create temp file: {}", e),
                })?;
            file.write_all(serialized.as_bytes())
                .map_err(|e| StateError::SaveFailed {
                    reason: format!("Failed to write state: {}", e),
                })?;
            file.sync_all().map_err(|e| StateError::SaveFailed {
                reason: format!("Failed to sync file: {}", e),
            })?;
        }

        fs::rename(&temp_file_path, &self.state_file_path).map_err(|e| StateError::SaveFailed {
            reason: format!("Failed to rename temp file: {}", e),
        })?;
        Ok(())
    }

    /// Load the run record
    pub fn load_state(&self) -> Result<RunState> {
        if !self.state_exists() {
            return Err(StateError::NotFound.into());
        }
        let contents =
            fs::read_to_string(&self.state_file_path).map_err(|e| StateError::LoadFailed {
                reason: format!(
                    "Failed to read file {}: {}",
                    self.state_file_path.display(),
                    e
                ),
            })?;
        let state: RunState =
            serde_json::from_str(&contents).map_err(|e| StateError::Corrupted {
                reason: format!("Failed to deserialize state: {}", e),
            })?;
        state.validate()?;
        Ok(state)
    }

    /// Check if state file exists
    pub fn state_exists(&self) -> bool {
        self.state_file_path.exists()
    }

    /// Delete the state file
    pub fn cleanup_state(&self) -> Result<()> {
        if self.state_exists() {
            fs::remove_file(&self.state_file_path).map_err(|e| StateError::SaveFailed {
                reason: format!("Failed to remove state file: {}", e),
            })?;
        }
        Ok(())
    }
}
