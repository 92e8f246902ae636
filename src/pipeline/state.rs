//! Pipeline states and the transitions allowed between them.

use crate::error::{Result, StateError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of one run in the release state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PipelineState {
    /// Nothing evaluated yet
    Idle,
    /// The reference is a release tag
    TriggerMatched,
    /// Descriptor resolved and every requirement present
    EnvironmentReady,
    /// Artifact Set built and verified
    ArtifactsBuilt,
    /// Every artifact uploaded
    Published,
    /// A stage failed
    Failed,
}

/// Stage a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Trigger evaluation
    Trigger,
    /// Descriptor resolution and environment provisioning
    Provision,
    /// Purge, build and verification
    Build,
    /// Upload
    Publish,
}

impl PipelineState {
    /// Terminal states end a run
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Published | PipelineState::Failed)
    }

    /// Whether the state machine permits moving from `self` to `next`
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Idle, TriggerMatched)
            | (TriggerMatched, EnvironmentReady)
            | (EnvironmentReady, ArtifactsBuilt)
            | (ArtifactsBuilt, Published) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Checked transition
    pub fn transition(self, next: PipelineState) -> Result<PipelineState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StateError::IllegalTransition {
                from: self.to_string(),
                to: next.to_string(),
            }
            .into())
        }
    }

    /// Stage that runs while in this state
    pub fn active_stage(self) -> Stage {
        match self {
            PipelineState::Idle => Stage::Trigger,
            PipelineState::TriggerMatched => Stage::Provision,
            PipelineState::EnvironmentReady => Stage::Build,
            PipelineState::ArtifactsBuilt | PipelineState::Published | PipelineState::Failed => {
                Stage::Publish
            }
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "Idle"),
            PipelineState::TriggerMatched => write!(f, "Trigger Matched"),
            PipelineState::EnvironmentReady => write!(f, "Environment Ready"),
            PipelineState::ArtifactsBuilt => write!(f, "Artifacts Built"),
            PipelineState::Published => write!(f, "Published"),
            PipelineState::Failed => write!(f, "Failed"),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Trigger => write!(f, "trigger"),
            Stage::Provision => write!(f, "provision"),
            Stage::Build => write!(f, "build"),
            Stage::Publish => write!(f, "publish"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PipelineState::*;

    #[test]
    fn test_forward_path() {
        let mut state = Idle;
        for next in [TriggerMatched, EnvironmentReady, ArtifactsBuilt, Published] {
            state = state.transition(next).unwrap();
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn test_no_skipping_stages() {
        assert!(!Idle.can_transition_to(ArtifactsBuilt));
        assert!(!TriggerMatched.can_transition_to(ArtifactsBuilt));
        assert!(!EnvironmentReady.can_transition_to(Published));
    }

    #[test]
    fn test_no_transition_back_or_out_of_terminal() {
        assert!(!ArtifactsBuilt.can_transition_to(Idle));
        assert!(!Published.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Idle));
        assert!(Failed.transition(TriggerMatched).is_err());
    }

    #[test]
    fn test_any_active_state_can_fail() {
        for state in [Idle, TriggerMatched, EnvironmentReady, ArtifactsBuilt] {
            assert!(state.can_transition_to(Failed));
        }
    }
}
