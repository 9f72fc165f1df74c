use std::fmt;

use serde::{Deserialize, Serialize};

/// Autopilot lifecycle state.
///
/// Planning and Executing alternate until a terminal state is reached.
/// Blocked and IterationLimitReached are defined termination outcomes, not
/// errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    #[default]
    Idle,
    Planning,
    Executing,
    Done,
    Blocked,
    Cancelled,
    IterationLimitReached,
}

impl EngineState {
    pub fn allowed_transitions(&self) -> &'static [EngineState] {
        use EngineState::*;
        match self {
            Idle => &[Planning, Done, Cancelled, IterationLimitReached],
            Planning => &[Executing, Done, Blocked, Cancelled, IterationLimitReached],
            Executing => &[Planning, Cancelled],
            Done => &[],
            Blocked => &[],
            Cancelled => &[],
            IterationLimitReached => &[],
        }
    }

    pub fn can_transition_to(&self, target: EngineState) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineState::Done
                | EngineState::Blocked
                | EngineState::Cancelled
                | EngineState::IterationLimitReached
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, EngineState::Planning | EngineState::Executing)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "Idle",
            Self::Planning => "Planning",
            Self::Executing => "Executing",
            Self::Done => "Done",
            Self::Blocked => "Blocked",
            Self::Cancelled => "Cancelled",
            Self::IterationLimitReached => "IterationLimitReached",
        };
        write!(f, "{}", s)
    }
}
