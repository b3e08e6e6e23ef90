//! # Revision Skill
//!
//! One auto-revision pass: fold QA's suggested fixes into the brief, bump
//! `iter_count`, regenerate. QA is not called here; the coordinator reviews
//! the new draft next.

use crate::error::WorkflowResult;
use crate::skills::generator_skill::GeneratorSkill;
use crate::skills::llm_helpers::StageContext;
use crate::skills::qa_skill::QaReport;
use crate::state::workflow_state::{DraftedState, PlannedState, ReviewedState};

/// Used when QA failed the draft without naming any fix
pub const FALLBACK_FIX: &str =
    "- (No specific fixes provided; improve clarity/neutrality and meet constraints.)";

/// Bullet list of every suggested fix, never empty
pub fn fix_list(qa: &QaReport) -> String {
    if qa.suggested_fixes.is_empty() {
        return FALLBACK_FIX.to_string();
    }
    qa.suggested_fixes
        .iter()
        .map(|fix| format!("- {fix}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Revision stage
pub struct RevisionSkill;

impl RevisionSkill {
    pub async fn run(
        reviewed: ReviewedState,
        ctx: StageContext<'_>,
    ) -> WorkflowResult<DraftedState> {
        let fixes = fix_list(&reviewed.qa);
        let PlannedState {
            mut input,
            blueprint,
        } = reviewed.drafted.planned;

        input.iter_count += 1;
        input.project_brief = format!("{}\n\nQA-required fixes:\n{}", input.project_brief, fixes);

        tracing::info!(
            iter_count = input.iter_count,
            max_iters = input.max_iters,
            fixes = reviewed.qa.suggested_fixes.len(),
            "Revising survey from QA fixes"
        );

        GeneratorSkill::run(PlannedState { input, blueprint }, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelConfig;
    use crate::skills::schema::validate_output;
    use crate::skills::testing::{blueprint_json, qa_json, survey_json, ScriptedExtractor};
    use crate::state::workflow_state::WorkflowInput;

    fn reviewed(fixes: &[&str]) -> ReviewedState {
        ReviewedState {
            drafted: DraftedState {
                planned: PlannedState {
                    input: WorkflowInput::new("Original brief", "Everyone").with_max_iters(3),
                    blueprint: validate_output(blueprint_json(20)).unwrap(),
                },
                survey: validate_output(survey_json(0)).unwrap(),
            },
            qa: validate_output(qa_json(false, fixes)).unwrap(),
        }
    }

    #[test]
    fn test_fix_list_formats_bullets() {
        let qa = QaReport {
            passed: false,
            issues: vec![],
            suggested_fixes: vec!["Reword Q3".to_string(), "Add demographics".to_string()],
        };
        assert_eq!(fix_list(&qa), "- Reword Q3\n- Add demographics");
    }

    #[test]
    fn test_fix_list_falls_back_when_empty() {
        let qa = QaReport {
            passed: false,
            issues: vec!["Too long".to_string()],
            suggested_fixes: vec![],
        };
        assert_eq!(fix_list(&qa), FALLBACK_FIX);
    }

    #[tokio::test]
    async fn test_revision_appends_fixes_and_bumps_iter_count() {
        let extractor = ScriptedExtractor::new(vec![Ok(survey_json(1))]);
        let config = ModelConfig::default();

        let drafted = RevisionSkill::run(
            reviewed(&["Reword Q1"]),
            StageContext::new(&extractor, &config),
        )
        .await
        .unwrap();

        assert_eq!(drafted.input().iter_count, 1);
        assert_eq!(
            drafted.input().project_brief,
            "Original brief\n\nQA-required fixes:\n- Reword Q1"
        );
        assert_eq!(drafted.survey.questions().count(), 2);
        assert!(extractor.requests()[0]
            .user_prompt
            .contains("QA-required fixes:\n- Reword Q1"));
    }

    #[tokio::test]
    async fn test_revision_with_no_fixes_uses_fallback() {
        let extractor = ScriptedExtractor::new(vec![Ok(survey_json(0))]);
        let config = ModelConfig::default();

        let drafted = RevisionSkill::run(reviewed(&[]), StageContext::new(&extractor, &config))
            .await
            .unwrap();

        assert!(drafted.input().project_brief.ends_with(FALLBACK_FIX));
        assert!(!drafted.input().project_brief.ends_with("fixes:\n"));
    }
}
