//! Run lifecycle events
//!
//! Broadcast by the orchestrator so the IPC server can report what the
//! pipeline has been doing.

use serde::{Deserialize, Serialize};

use crate::hotkey::HotkeyClass;
use crate::pipeline::RunOutcome;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// A trigger was taken from the dispatcher and a run began
    RunStarted { class: HotkeyClass },

    /// A run reached a terminal stage
    RunFinished {
        class: HotkeyClass,
        outcome: RunOutcome,
        /// Wall time of the run in milliseconds
        duration_ms: u64,
    },
}

impl std::fmt::Display for RunEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunEvent::RunStarted { class } => write!(f, "RUN_STARTED ({})", class),
            RunEvent::RunFinished {
                class,
                outcome,
                duration_ms,
            } => {
                let kind = match outcome {
                    RunOutcome::Delivered => "delivered",
                    RunOutcome::EmptyClipboard => "empty clipboard",
                    RunOutcome::Aborted { .. } => "aborted",
                };
                write!(f, "RUN_FINISHED ({}, {}, {}ms)", class, kind, duration_ms)
            }
        }
    }
}
