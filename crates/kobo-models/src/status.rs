//! Process coordinator status snapshots.
//!
//! The coordinator publishes a read-consistent snapshot of its state so
//! that status queries never contend with an in-flight start/stop
//! transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::RunId;

/// Lifecycle state of the managed external process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    /// No external process, nothing pending
    #[default]
    Idle,
    /// Process spawned, waiting for the readiness signal
    Starting,
    /// Process is up and producing frames
    Running,
    /// Graceful termination in progress
    Stopping,
    /// Process exited unexpectedly or never became ready
    Failed,
}

impl CoordinatorState {
    /// Whether a live external process may exist in this state.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Running | Self::Stopping)
    }
}

/// Point-in-time view of the coordinator, safe to read concurrently.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StatusSnapshot {
    /// Current lifecycle state
    pub state: CoordinatorState,
    /// Token identifying the current (or last) run
    pub run_id: Option<RunId>,
    /// When the current run reached `Running`
    pub started_at: Option<DateTime<Utc>>,
    /// Why the last run failed; cleared when a new run reaches `Running`
    pub last_error: Option<String>,
}

impl StatusSnapshot {
    /// Snapshot for a coordinator with no history.
    pub fn idle() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&CoordinatorState::Starting).unwrap(),
            "\"starting\""
        );
        assert_eq!(
            serde_json::to_string(&CoordinatorState::Failed).unwrap(),
            "\"failed\""
        );
    }

    #[test]
    fn active_states() {
        assert!(!CoordinatorState::Idle.is_active());
        assert!(CoordinatorState::Starting.is_active());
        assert!(CoordinatorState::Running.is_active());
        assert!(CoordinatorState::Stopping.is_active());
        assert!(!CoordinatorState::Failed.is_active());
    }
}
