//! Run state machine
//!
//! Tracks which stage a translation run is in, computes the legal next
//! stage for the run's hotkey class, and records how the run ended.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::hotkey::HotkeyClass;

/// Stages of one translation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Start,
    SelectSource,
    CopySource,
    ReadClipboard,
    Translate,
    ComposeOutput,
    WriteClipboard,
    Deliver,
    Done,
    Aborted,
}

impl RunStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStage::Done | RunStage::Aborted)
    }
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStage::Start => write!(f, "Start"),
            RunStage::SelectSource => write!(f, "SelectSource"),
            RunStage::CopySource => write!(f, "CopySource"),
            RunStage::ReadClipboard => write!(f, "ReadClipboard"),
            RunStage::Translate => write!(f, "Translate"),
            RunStage::ComposeOutput => write!(f, "ComposeOutput"),
            RunStage::WriteClipboard => write!(f, "WriteClipboard"),
            RunStage::Deliver => write!(f, "Deliver"),
            RunStage::Done => write!(f, "Done"),
            RunStage::Aborted => write!(f, "Aborted"),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Translation was written and pasted or shown
    Delivered,
    /// Nothing was on the clipboard after copying
    EmptyClipboard,
    /// A stage failed; the run stopped there
    Aborted { stage: RunStage, reason: String },
}

impl RunOutcome {
    pub fn is_aborted(&self) -> bool {
        matches!(self, RunOutcome::Aborted { .. })
    }
}

/// State of a single run
#[derive(Debug)]
pub struct RunStateMachine {
    class: HotkeyClass,
    stage: RunStage,
    started_at: Instant,
}

impl RunStateMachine {
    pub fn new(class: HotkeyClass) -> Self {
        Self {
            class,
            stage: RunStage::Start,
            started_at: Instant::now(),
        }
    }

    pub fn class(&self) -> HotkeyClass {
        self.class
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    /// The stage that follows the current one on the success path
    fn compute_next_stage(&self) -> RunStage {
        match self.stage {
            RunStage::Start if self.class.selects_all() => RunStage::SelectSource,
            RunStage::Start => RunStage::CopySource,
            RunStage::SelectSource => RunStage::CopySource,
            RunStage::CopySource => RunStage::ReadClipboard,
            RunStage::ReadClipboard => RunStage::Translate,
            RunStage::Translate => RunStage::ComposeOutput,
            RunStage::ComposeOutput => RunStage::WriteClipboard,
            RunStage::WriteClipboard => RunStage::Deliver,
            RunStage::Deliver => RunStage::Done,
            RunStage::Done => RunStage::Done,
            RunStage::Aborted => RunStage::Aborted,
        }
    }

    /// Move to the next stage and return it
    pub fn advance(&mut self) -> RunStage {
        let next = self.compute_next_stage();
        self.transition_to(next);
        next
    }

    /// End the run after an empty clipboard read
    pub fn finish_empty(&mut self) -> RunOutcome {
        self.transition_to(RunStage::Done);
        RunOutcome::EmptyClipboard
    }

    /// Abort at the current stage
    pub fn abort(&mut self, reason: impl Into<String>) -> RunOutcome {
        let stage = self.stage;
        let reason = reason.into();
        warn!(class = %self.class, %stage, %reason, "run aborted");
        self.transition_to(RunStage::Aborted);
        RunOutcome::Aborted { stage, reason }
    }

    fn transition_to(&mut self, next: RunStage) {
        if self.stage == next || self.stage.is_terminal() {
            return;
        }

        info!(
            class = %self.class,
            from = %self.stage,
            to = %next,
            elapsed_ms = self.elapsed_ms(),
            "run stage transition"
        );
        self.stage = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_end(class: HotkeyClass) -> Vec<RunStage> {
        let mut machine = RunStateMachine::new(class);
        let mut stages = vec![machine.stage()];
        while !machine.stage().is_terminal() {
            stages.push(machine.advance());
        }
        stages
    }

    #[test]
    fn test_initial_stage() {
        let machine = RunStateMachine::new(HotkeyClass::SingleLanguage);
        assert_eq!(machine.stage(), RunStage::Start);
    }

    #[test]
    fn test_single_language_skips_select() {
        assert_eq!(
            run_to_end(HotkeyClass::SingleLanguage),
            vec![
                RunStage::Start,
                RunStage::CopySource,
                RunStage::ReadClipboard,
                RunStage::Translate,
                RunStage::ComposeOutput,
                RunStage::WriteClipboard,
                RunStage::Deliver,
                RunStage::Done,
            ]
        );
    }

    #[test]
    fn test_multi_language_selects_first() {
        let stages = run_to_end(HotkeyClass::MultiLanguage);
        assert_eq!(stages[1], RunStage::SelectSource);
        assert_eq!(stages[2], RunStage::CopySource);
        assert_eq!(stages.last(), Some(&RunStage::Done));
    }

    #[test]
    fn test_abort_records_failing_stage() {
        let mut machine = RunStateMachine::new(HotkeyClass::MultiLanguage);
        machine.advance();
        let outcome = machine.abort("select failed");

        assert_eq!(machine.stage(), RunStage::Aborted);
        assert_eq!(
            outcome,
            RunOutcome::Aborted {
                stage: RunStage::SelectSource,
                reason: "select failed".to_string()
            }
        );
    }

    #[test]
    fn test_terminal_stages_are_sticky() {
        let mut machine = RunStateMachine::new(HotkeyClass::ConfiguredLanguage);
        machine.abort("boom");
        assert_eq!(machine.advance(), RunStage::Aborted);
        assert_eq!(machine.stage(), RunStage::Aborted);

        let mut machine = RunStateMachine::new(HotkeyClass::ConfiguredLanguage);
        machine.advance();
        machine.advance();
        assert_eq!(machine.finish_empty(), RunOutcome::EmptyClipboard);
        assert_eq!(machine.stage(), RunStage::Done);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = RunOutcome::Aborted {
            stage: RunStage::WriteClipboard,
            reason: "denied".to_string(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"kind\":\"aborted\""));
        assert!(json.contains("write_clipboard"));
    }
}
