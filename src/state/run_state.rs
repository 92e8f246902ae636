//! Run record tracking and serialization.

use crate::error::{Result, StateError};
use crate::pipeline::{PipelineState, Stage};
use serde::{Deserialize, Serialize};

/// Current version of the state format
pub const STATE_FORMAT_VERSION: u32 = 1;

/// Record of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Version of the state format
    pub format_version: u32,
    /// Save operation version (incremented on every save)
    pub save_version: u64,
    /// Unique ID for this run
    pub run_id: String,
    /// Reference that triggered the run
    pub reference: String,
    /// Version being released, once the trigger matched
    pub release_version: Option<semver::Version>,
    /// Timestamp when the run started
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// Timestamp when the run was last updated
    pub updated_at: chrono::DateTime<chrono::Utc>,
    /// Current state of the run
    pub current_state: PipelineState,
    /// States reached, in order
    pub checkpoints: Vec<RunCheckpoint>,
    /// Failure, if the run failed
    pub errors: Vec<RunError>,
}

/// A state reached during the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCheckpoint {
    /// State reached
    pub state: PipelineState,
    /// Timestamp when the state was reached
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Any data associated with this checkpoint
    pub data: Option<serde_json::Value>,
}

/// Error recorded against a stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunError {
    /// Error message
    pub message: String,
    /// Stage where the error occurred
    pub stage: Stage,
    /// Timestamp when the error occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Whether re-running may succeed without changing the project
    pub recoverable: bool,
}

impl RunState {
    /// Start a record for a run
    pub fn new(reference: &str) -> Self {
        let now = chrono::Utc::now();
        Self {
            format_version: STATE_FORMAT_VERSION,
            save_version: 0,
            run_id: uuid::Uuid::new_v4().to_string(),
            reference: reference.to_string(),
            release_version: None,
            started_at: now,
            updated_at: now,
            current_state: PipelineState::Idle,
            checkpoints: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Record a checked transition
    pub fn advance(&mut self, next: PipelineState, data: Option<serde_json::Value>) -> Result<()> {
        self.current_state = self.current_state.transition(next)?;
        let now = chrono::Utc::now();
        self.checkpoints.push(RunCheckpoint {
            state: next,
            timestamp: now,
            data,
        });
        self.updated_at = now;
        Ok(())
    }

    /// Record a failure and move to `Failed`
    pub fn fail(&mut self, error: &crate::error::ReleaseError) {
        let stage = self.current_state.active_stage();
        let now = chrono::Utc::now();
        self.errors.push(RunError {
            message: error.to_string(),
            stage,
            timestamp: now,
            recoverable: error.is_recoverable(),
        });
        if self.current_state.can_transition_to(PipelineState::Failed) {
            self.current_state = PipelineState::Failed;
            self.checkpoints.push(RunCheckpoint {
                state: PipelineState::Failed,
                timestamp: now,
                data: Some(serde_json::json!({ "stage": stage })),
            });
        }
        self.updated_at = now;
    }

    /// Whether a state was reached
    pub fn has_reached(&self, state: PipelineState) -> bool {
        self.checkpoints.iter().any(|cp| cp.state == state)
    }

    /// Get elapsed time
    pub fn elapsed_time(&self) -> chrono::Duration {
        self.updated_at - self.started_at
    }

    /// Validate state consistency
    pub fn validate(&self) -> Result<()> {
        if self.format_version != STATE_FORMAT_VERSION {
            return Err(StateError::VersionMismatch {
                expected: STATE_FORMAT_VERSION.to_string(),
                found: self.format_version.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Create a summary of the run
    pub fn summary(&self) -> String {
        let version = self
            .release_version
            .as_ref()
            .map(|v| format!("v{v}"))
            .unwrap_or_else(|| self.reference.clone());
        format!(
            "Release {} ({}) - {} elapsed",
            version,
            self.current_state,
            format_duration(self.elapsed_time())
        )
    }
}

fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
