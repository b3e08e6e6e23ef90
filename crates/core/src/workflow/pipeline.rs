//! # Pipeline Stages
//!
//! Stages of the survey workflow and the transition function that picks the
//! next one from the current state.

use crate::state::workflow_state::{ReviewedState, WorkflowState};
use serde::{Deserialize, Serialize};

/// Stage of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Brief to blueprint
    Planner,
    /// Blueprint to survey draft
    Generator,
    /// Draft review
    Qa,
    /// QA fixes folded into the brief, then regenerate
    Revision,
    /// Reviewer notes applied to an existing draft
    HumanRevision,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Generator => "generator",
            Self::Qa => "qa",
            Self::Revision => "revision",
            Self::HumanRevision => "human_revision",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the loop decision after QA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Stop,
    Revise,
}

/// Stop on a pass or once the revision budget is spent
pub fn decide(state: &ReviewedState) -> Decision {
    let input = state.input();
    if state.qa.passed || input.iter_count >= input.max_iters {
        Decision::Stop
    } else {
        Decision::Revise
    }
}

/// Next stage for the auto workflow, `None` when finished
pub fn next_stage(state: &WorkflowState) -> Option<PipelineStage> {
    match state {
        WorkflowState::Initialized(_) => Some(PipelineStage::Planner),
        WorkflowState::Planned(_) => Some(PipelineStage::Generator),
        WorkflowState::Drafted(_) => Some(PipelineStage::Qa),
        WorkflowState::Reviewed(reviewed) => match decide(reviewed) {
            Decision::Stop => None,
            Decision::Revise => Some(PipelineStage::Revision),
        },
    }
}
