//! Job state machine.
//!
//! ```text
//! Idle ─► Resolving ─► Planning ─► Processing(0) ─► … ─► Processing(n-1) ─► Finalizing ─► Done
//!           │             │              │                                      │
//!           └─────────────┴──────────────┴──────────────► Failed ◄──────────────┘
//! ```

use std::fmt;

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    /// Backend, then model.
    Resolving,
    Planning,
    /// Working on tile `tile` of `total`.
    Processing { tile: usize, total: usize },
    Finalizing,
    Done,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }

    /// Whether `next` may follow `self`.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        use JobState::*;
        match (*self, next) {
            (Idle, Resolving) => true,
            (Resolving, Planning) => true,
            (Planning, Processing { tile: 0, .. }) => true,
            (Processing { tile, total }, Processing { tile: t, total: n }) => {
                n == total && t == tile + 1 && t < n
            }
            (Processing { tile, total }, Finalizing) => tile + 1 == total,
            (Finalizing, Done) => true,
            (Done, _) | (Failed, _) => false,
            (_, Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Idle => write!(f, "idle"),
            JobState::Resolving => write!(f, "resolving"),
            JobState::Planning => write!(f, "planning"),
            JobState::Processing { tile, total } => write!(f, "processing {}/{}", tile + 1, total),
            JobState::Finalizing => write!(f, "finalizing"),
            JobState::Done => write!(f, "done"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_is_valid() {
        let path = [
            JobState::Idle,
            JobState::Resolving,
            JobState::Planning,
            JobState::Processing { tile: 0, total: 2 },
            JobState::Processing { tile: 1, total: 2 },
            JobState::Finalizing,
            JobState::Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_rejects_skipped_tiles_and_early_finalize() {
        let first = JobState::Processing { tile: 0, total: 3 };
        assert!(!first.can_transition_to(JobState::Processing { tile: 2, total: 3 }));
        assert!(!first.can_transition_to(JobState::Finalizing));
        assert!(!JobState::Idle.can_transition_to(JobState::Planning));
    }

    #[test]
    fn test_any_live_state_can_fail() {
        for state in [
            JobState::Idle,
            JobState::Resolving,
            JobState::Planning,
            JobState::Processing { tile: 4, total: 9 },
            JobState::Finalizing,
        ] {
            assert!(state.can_transition_to(JobState::Failed));
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        assert!(JobState::Done.is_terminal());
        assert!(!JobState::Done.can_transition_to(JobState::Failed));
        assert!(!JobState::Failed.can_transition_to(JobState::Resolving));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            JobState::Processing { tile: 0, total: 6 }.to_string(),
            "processing 1/6"
        );
    }
}
