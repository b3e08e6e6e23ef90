//! # QA Skill
//!
//! Reviews the drafted survey against the brief and blueprint. The report is
//! advisory: this stage never branches, the loop decision reads `passed`.

use crate::error::WorkflowResult;
use crate::skills::llm_helpers::{prompt_json, StageContext};
use crate::skills::prompts::{QA_SYSTEM, QA_USER};
use crate::skills::schema::{null_as_empty, Validate};
use crate::state::workflow_state::{DraftedState, ReviewedState};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Structured review of a survey draft
///
/// `issues` and `suggested_fixes` are independent lists; a fix is not
/// guaranteed to correspond to the issue at the same index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QaReport {
    pub passed: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub issues: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub suggested_fixes: Vec<String>,
}

impl Validate for QaReport {
    const SCHEMA: &'static str = "QAReport";

    fn validate(&self) -> Vec<String> {
        Vec::new()
    }
}

/// QA stage
pub struct QaSkill;

impl QaSkill {
    pub async fn run(
        drafted: DraftedState,
        ctx: StageContext<'_>,
    ) -> WorkflowResult<ReviewedState> {
        let input = drafted.input();
        let blueprint_json = prompt_json(&drafted.planned.blueprint)?;
        let survey_json = prompt_json(&drafted.survey)?;
        let max_questions = input.max_questions.to_string();

        let prompt = QA_USER.render(&[
            ("project_brief", input.project_brief.as_str()),
            ("blueprint_json", blueprint_json.as_str()),
            ("survey_json", survey_json.as_str()),
            ("max_questions", max_questions.as_str()),
        ])?;

        let qa: QaReport = ctx.run(QA_SYSTEM, prompt).await?;

        tracing::info!(
            passed = qa.passed,
            issues = qa.issues.len(),
            fixes = qa.suggested_fixes.len(),
            iter_count = input.iter_count,
            "QA report ready"
        );

        Ok(ReviewedState { drafted, qa })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelConfig;
    use crate::skills::schema::validate_output;
    use crate::skills::testing::{blueprint_json, qa_json, survey_json, ScriptedExtractor};
    use crate::state::workflow_state::{PlannedState, WorkflowInput};
    use serde_json::json;

    #[test]
    fn test_missing_and_null_lists_default_empty() {
        let report: QaReport = validate_output(json!({"passed": true})).unwrap();
        assert!(report.issues.is_empty());
        assert!(report.suggested_fixes.is_empty());

        let report: QaReport =
            validate_output(json!({"passed": false, "issues": null, "suggested_fixes": null}))
                .unwrap();
        assert!(!report.passed);
        assert!(report.suggested_fixes.is_empty());
    }

    #[test]
    fn test_passed_is_required() {
        assert!(validate_output::<QaReport>(json!({"issues": []})).is_err());
        assert!(validate_output::<QaReport>(json!({"passed": "yes"})).is_err());
    }

    #[tokio::test]
    async fn test_qa_embeds_blueprint_and_survey() {
        let extractor = ScriptedExtractor::new(vec![Ok(qa_json(false, &["Reword Q1"]))]);
        let config = ModelConfig::default();
        let drafted = DraftedState {
            planned: PlannedState {
                input: WorkflowInput::new("Library study", "Students"),
                blueprint: validate_output(blueprint_json(20)).unwrap(),
            },
            survey: validate_output(survey_json(0)).unwrap(),
        };

        let reviewed = QaSkill::run(drafted.clone(), StageContext::new(&extractor, &config))
            .await
            .unwrap();

        assert_eq!(reviewed.drafted, drafted);
        assert_eq!(reviewed.qa.suggested_fixes, vec!["Reword Q1".to_string()]);
        let prompt = &extractor.requests()[0].user_prompt;
        assert!(prompt.contains("Library study"));
        assert!(prompt.contains("How satisfied are you?"));
        assert!(prompt.contains("Measure satisfaction"));
    }
}
