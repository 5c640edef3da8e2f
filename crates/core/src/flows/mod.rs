pub mod engine;
pub mod states;
pub mod table;

pub use engine::{LoanWorkflow, MAX_BUREAU_SCORE};
pub use states::{
    Actor, FinalizationOutcome, TargetStage, TransitionKind, TransitionOutcome, TransitionRequest,
};
pub use table::{Permitted, TransitionRule, TransitionTable, WorkflowPolicy};
