mod compose;
mod orchestrator;
mod stage;

pub use orchestrator::Orchestrator;
pub use stage::RunOutcome;
