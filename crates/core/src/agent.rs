//! Turn state machine and session state types.

use serde::{Deserialize, Serialize};

/// Where the agent loop is within a turn.
///
/// `AwaitingModelStep → (ToolsRequested | Done)`; `ToolsRequested` always
/// returns to `AwaitingModelStep` once its tools have run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    AwaitingModelStep,
    ToolsRequested,
    Done,
}

impl TurnState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: TurnState) -> bool {
        matches!(
            (self, next),
            (TurnState::AwaitingModelStep, TurnState::ToolsRequested)
                | (TurnState::AwaitingModelStep, TurnState::Done)
                | (TurnState::ToolsRequested, TurnState::AwaitingModelStep)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == TurnState::Done
    }
}

/// Runtime counters of a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Whether a turn is in flight
    pub processing: bool,

    /// Turns that reached `Done`
    pub turns_completed: u64,

    /// Turns aborted by a turn error
    pub turns_failed: u64,

    /// Tool calls executed over the session
    pub tool_calls_made: u64,
}
