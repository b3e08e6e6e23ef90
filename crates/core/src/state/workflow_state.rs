//! # Workflow State
//!
//! The record threaded through the stages, typed by phase. Each phase embeds
//! the previous one, so a stage can only read what earlier stages wrote:
//!
//! ```text
//! Initialized(WorkflowInput)
//!   -> Planned  { input, blueprint }
//!   -> Drafted  { input, blueprint, survey }
//!   -> Reviewed { input, blueprint, survey, qa }
//! ```
//!
//! Serialized as a flat JSON object tagged by `phase`, so saved states can be
//! reloaded for a later human revision.

use crate::skills::planner_skill::Blueprint;
use crate::skills::qa_skill::QaReport;
use crate::state::instrument::SurveyInstrument;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_QUESTIONS: u32 = 20;
pub const DEFAULT_MIN_QUESTIONS: u32 = 15;
pub const DEFAULT_MAX_ITERS: u32 = 1;

/// Caller inputs plus the counters owned by the revision paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowInput {
    /// Grows by one fix block per auto-revision
    pub project_brief: String,
    pub audience: String,
    pub max_questions: u32,
    pub min_questions: u32,
    pub max_iters: u32,
    #[serde(default)]
    pub iter_count: u32,
    #[serde(default)]
    pub human_notes: Option<String>,
    #[serde(default)]
    pub human_revision_count: u32,
}

impl WorkflowInput {
    /// Trimmed brief and audience with default limits
    pub fn new(project_brief: impl AsRef<str>, audience: impl AsRef<str>) -> Self {
        Self {
            project_brief: project_brief.as_ref().trim().to_string(),
            audience: audience.as_ref().trim().to_string(),
            max_questions: DEFAULT_MAX_QUESTIONS,
            min_questions: DEFAULT_MIN_QUESTIONS,
            max_iters: DEFAULT_MAX_ITERS,
            iter_count: 0,
            human_notes: None,
            human_revision_count: 0,
        }
    }

    /// Set the question target; the minimum is `max(max - 5, floor(0.8 * max))`
    pub fn with_target(mut self, max_questions: u32) -> Self {
        self.max_questions = max_questions;
        let four_fifths = u64::from(max_questions) * 4 / 5;
        self.min_questions = max_questions
            .saturating_sub(5)
            .max(four_fifths as u32);
        self
    }

    pub fn with_min_questions(mut self, min_questions: u32) -> Self {
        self.min_questions = min_questions;
        self
    }

    pub fn with_max_iters(mut self, max_iters: u32) -> Self {
        self.max_iters = max_iters;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedState {
    #[serde(flatten)]
    pub input: WorkflowInput,
    pub blueprint: Blueprint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftedState {
    #[serde(flatten)]
    pub planned: PlannedState,
    pub survey: SurveyInstrument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewedState {
    #[serde(flatten)]
    pub drafted: DraftedState,
    pub qa: QaReport,
}

impl DraftedState {
    pub fn input(&self) -> &WorkflowInput {
        &self.planned.input
    }
}

impl ReviewedState {
    pub fn input(&self) -> &WorkflowInput {
        &self.drafted.planned.input
    }
}

/// Workflow state by phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum WorkflowState {
    Initialized(WorkflowInput),
    Planned(PlannedState),
    Drafted(DraftedState),
    Reviewed(ReviewedState),
}

impl WorkflowState {
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Initialized(_) => "initialized",
            Self::Planned(_) => "planned",
            Self::Drafted(_) => "drafted",
            Self::Reviewed(_) => "reviewed",
        }
    }

    pub fn input(&self) -> &WorkflowInput {
        match self {
            Self::Initialized(input) => input,
            Self::Planned(s) => &s.input,
            Self::Drafted(s) => s.input(),
            Self::Reviewed(s) => s.input(),
        }
    }

    pub fn blueprint(&self) -> Option<&Blueprint> {
        match self {
            Self::Initialized(_) => None,
            Self::Planned(s) => Some(&s.blueprint),
            Self::Drafted(s) => Some(&s.planned.blueprint),
            Self::Reviewed(s) => Some(&s.drafted.planned.blueprint),
        }
    }

    pub fn survey(&self) -> Option<&SurveyInstrument> {
        match self {
            Self::Drafted(s) => Some(&s.survey),
            Self::Reviewed(s) => Some(&s.drafted.survey),
            _ => None,
        }
    }

    pub fn qa(&self) -> Option<&QaReport> {
        match self {
            Self::Reviewed(s) => Some(&s.qa),
            _ => None,
        }
    }

    /// The drafted part of the state, if a survey exists
    pub fn drafted(&self) -> Option<&DraftedState> {
        match self {
            Self::Drafted(s) => Some(s),
            Self::Reviewed(s) => Some(&s.drafted),
            _ => None,
        }
    }

    pub fn iter_count(&self) -> u32 {
        self.input().iter_count
    }

    pub fn human_revision_count(&self) -> u32 {
        self.input().human_revision_count
    }
}

impl From<WorkflowInput> for WorkflowState {
    fn from(input: WorkflowInput) -> Self {
        Self::Initialized(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::schema::validate_output;
    use crate::skills::testing::{blueprint_json, qa_json, survey_json};

    fn reviewed() -> ReviewedState {
        ReviewedState {
            drafted: DraftedState {
                planned: PlannedState {
                    input: WorkflowInput::new("brief", "audience"),
                    blueprint: validate_output(blueprint_json(20)).unwrap(),
                },
                survey: validate_output(survey_json(1)).unwrap(),
            },
            qa: validate_output(qa_json(true, &[])).unwrap(),
        }
    }

    #[test]
    fn test_new_trims_and_defaults() {
        let input = WorkflowInput::new("  Study transit use \n", "\tCommuters ");
        assert_eq!(input.project_brief, "Study transit use");
        assert_eq!(input.audience, "Commuters");
        assert_eq!(input.max_questions, 20);
        assert_eq!(input.min_questions, 15);
        assert_eq!(input.max_iters, 1);
        assert_eq!(input.iter_count, 0);
    }

    #[test]
    fn test_with_target_derives_minimum() {
        assert_eq!(WorkflowInput::new("b", "a").with_target(20).min_questions, 16);
        assert_eq!(WorkflowInput::new("b", "a").with_target(40).min_questions, 35);
        assert_eq!(WorkflowInput::new("b", "a").with_target(10).min_questions, 8);
        assert_eq!(WorkflowInput::new("b", "a").with_target(3).min_questions, 2);
        assert_eq!(
            WorkflowInput::new("b", "a").with_target(u32::MAX).min_questions,
            u32::MAX - 5
        );
    }

    #[test]
    fn test_accessors_follow_phase() {
        let initialized = WorkflowState::from(WorkflowInput::new("b", "a"));
        assert!(initialized.blueprint().is_none());
        assert!(initialized.survey().is_none());
        assert_eq!(initialized.phase(), "initialized");

        let state = WorkflowState::Reviewed(reviewed());
        assert!(state.blueprint().is_some());
        assert!(state.survey().is_some());
        assert!(state.qa().is_some_and(|qa| qa.passed));
        assert_eq!(state.phase(), "reviewed");
    }

    #[test]
    fn test_serializes_flat_with_phase_tag() {
        let state = WorkflowState::Reviewed(reviewed());
        let value = serde_json::to_value(&state).unwrap();

        assert_eq!(value["phase"], "reviewed");
        assert_eq!(value["project_brief"], "brief");
        assert_eq!(value["iter_count"], 0);
        assert!(value["blueprint"].is_object());
        assert!(value["survey"]["sections"].is_array());
        assert_eq!(value["qa"]["passed"], true);

        let back: WorkflowState = serde_json::from_value(value).unwrap();
        assert_eq!(back, state);
    }
}
