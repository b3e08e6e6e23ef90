//! # Workflow Orchestration
//!
//! Sequences the survey stages.
//!
//! ## Pipeline Flow
//!
//! ```text
//! Brief → Planner → Generator → QA ⟶ decide ⟶ Revision → QA → ...
//!                                      └─ stop → human review (revise_with_notes)
//! ```

pub mod coordinator;
pub mod events;
pub mod pipeline;

pub use coordinator::{
    revise_with_notes, run_workflow, Coordinator, CoordinatorConfig, StageCounts, WorkflowRun,
};
pub use events::{WorkflowEvent, WorkflowEventKind};
pub use pipeline::{decide, next_stage, Decision, PipelineStage};
