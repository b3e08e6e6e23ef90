//! # Generator Skill
//!
//! Writes the survey instrument from the blueprint. Used three ways: the
//! first draft, each auto-revision (with QA fixes folded into the brief) and
//! human revisions (with reviewer notes and the previous draft).

use crate::error::{WorkflowError, WorkflowResult};
use crate::skills::llm_helpers::{prompt_json, StageContext};
use crate::skills::prompts::{GENERATOR_SYSTEM, GENERATOR_USER, HUMAN_REVISE_USER};
use crate::state::instrument::SurveyInstrument;
use crate::state::workflow_state::{DraftedState, PlannedState};

/// Generator stage
pub struct GeneratorSkill;

impl GeneratorSkill {
    /// Draft the survey from the blueprint and the current brief
    pub async fn run(planned: PlannedState, ctx: StageContext<'_>) -> WorkflowResult<DraftedState> {
        let input = &planned.input;
        let blueprint_json = prompt_json(&planned.blueprint)?;
        let max_questions = input.max_questions.to_string();
        let min_questions = input.min_questions.to_string();

        let prompt = GENERATOR_USER.render(&[
            ("blueprint_json", blueprint_json.as_str()),
            ("project_brief", input.project_brief.as_str()),
            ("max_questions", max_questions.as_str()),
            ("min_questions", min_questions.as_str()),
        ])?;

        let survey: SurveyInstrument = ctx.run(GENERATOR_SYSTEM, prompt).await?;
        log_survey(&survey, input.max_questions);

        Ok(DraftedState { planned, survey })
    }

    /// Rewrite an existing draft to address `human_notes`
    pub async fn revise(
        drafted: DraftedState,
        ctx: StageContext<'_>,
    ) -> WorkflowResult<DraftedState> {
        let input = drafted.input();
        let notes = input
            .human_notes
            .as_deref()
            .ok_or_else(|| WorkflowError::template(HUMAN_REVISE_USER.name, "human_notes"))?;
        let blueprint_json = prompt_json(&drafted.planned.blueprint)?;
        let survey_json = prompt_json(&drafted.survey)?;
        let max_questions = input.max_questions.to_string();
        let min_questions = input.min_questions.to_string();

        let prompt = HUMAN_REVISE_USER.render(&[
            ("blueprint_json", blueprint_json.as_str()),
            ("survey_json", survey_json.as_str()),
            ("human_notes", notes),
            ("max_questions", max_questions.as_str()),
            ("min_questions", min_questions.as_str()),
        ])?;

        let survey: SurveyInstrument = ctx.run(GENERATOR_SYSTEM, prompt).await?;
        log_survey(&survey, input.max_questions);

        Ok(DraftedState {
            planned: drafted.planned,
            survey,
        })
    }
}

fn log_survey(survey: &SurveyInstrument, max_questions: u32) {
    let questions = survey.questions().count();
    if !survey.has_sequential_ids() {
        tracing::warn!("Question ids are not sequential (Q1, Q2, ...)");
    }
    if questions > max_questions as usize {
        tracing::warn!(questions, max_questions, "Survey exceeds the question limit");
    }
    tracing::info!(sections = survey.sections.len(), questions, "Survey drafted");
}
