//! # Planner Skill
//!
//! Turns the project brief into a [`Blueprint`]: goals, topics and suggested
//! sections, decided before any question text is written.

use crate::error::WorkflowResult;
use crate::skills::llm_helpers::StageContext;
use crate::skills::prompts::{PLANNER_SYSTEM, PLANNER_USER};
use crate::skills::schema::{null_as_empty, Validate};
use crate::state::workflow_state::{PlannedState, WorkflowInput};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const MIN_BLUEPRINT_QUESTIONS: i64 = 5;
pub const MAX_BLUEPRINT_QUESTIONS: i64 = 80;

/// Survey plan produced once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Blueprint {
    #[serde(deserialize_with = "null_as_empty")]
    pub goals: Vec<String>,
    pub target_audience: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub topics_to_measure: Vec<String>,
    /// Suggested section titles
    #[serde(deserialize_with = "null_as_empty")]
    pub sections: Vec<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub question_types: Vec<String>,
    /// Bounded to `[5, 80]`
    pub max_questions: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Validate for Blueprint {
    const SCHEMA: &'static str = "Blueprint";

    fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if !(MIN_BLUEPRINT_QUESTIONS..=MAX_BLUEPRINT_QUESTIONS).contains(&self.max_questions) {
            violations.push(format!(
                "max_questions must be between {MIN_BLUEPRINT_QUESTIONS} and {MAX_BLUEPRINT_QUESTIONS}, got {}",
                self.max_questions
            ));
        }
        violations
    }
}

/// Planner stage
pub struct PlannerSkill;

impl PlannerSkill {
    /// Plan the survey and advance to the planned phase
    pub async fn run(input: WorkflowInput, ctx: StageContext<'_>) -> WorkflowResult<PlannedState> {
        let max_questions = input.max_questions.to_string();
        let min_questions = input.min_questions.to_string();
        let prompt = PLANNER_USER.render(&[
            ("project_brief", input.project_brief.as_str()),
            ("audience", input.audience.as_str()),
            ("max_questions", max_questions.as_str()),
            ("min_questions", min_questions.as_str()),
        ])?;

        let blueprint: Blueprint = ctx.run(PLANNER_SYSTEM, prompt).await?;

        tracing::info!(
            goals = blueprint.goals.len(),
            topics = blueprint.topics_to_measure.len(),
            sections = blueprint.sections.len(),
            "Blueprint ready"
        );

        Ok(PlannedState { input, blueprint })
    }
}
