//! # Survey Instrument
//!
//! The structured questionnaire produced by the Generator and reviewed by QA.

use crate::skills::schema::{null_as_empty, Validate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Closed set of supported question types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultiChoice,
    #[serde(rename = "likert_5")]
    Likert5,
    #[serde(rename = "likert_7")]
    Likert7,
    FreeText,
    Numeric,
    Date,
    #[serde(rename = "nps_0_10")]
    Nps0To10,
}

impl QuestionType {
    /// Choice and likert types carry explicit answer options
    pub fn requires_options(self) -> bool {
        matches!(
            self,
            Self::SingleChoice | Self::MultiChoice | Self::Likert5 | Self::Likert7
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleChoice => "single_choice",
            Self::MultiChoice => "multi_choice",
            Self::Likert5 => "likert_5",
            Self::Likert7 => "likert_7",
            Self::FreeText => "free_text",
            Self::Numeric => "numeric",
            Self::Date => "date",
            Self::Nps0To10 => "nps_0_10",
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison used by a skip rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipOperator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Gte,
    Lte,
}

/// Conditional-branch descriptor for respondent navigation
///
/// Validated on input and carried through unchanged. Nothing in this crate
/// evaluates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SkipRule {
    pub if_question_id: String,
    pub operator: SkipOperator,
    pub value: serde_json::Value,
    pub goto_question_id: String,
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Question {
    /// Unique id, conventionally sequential (`Q1`, `Q2`, ...)
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// Answer options; present only for choice and likert types
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Blueprint topic this question measures
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub analysis_tag: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub skip_rules: Option<Vec<SkipRule>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub questions: Vec<Question>,
}

/// Ordered sections of questions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SurveyInstrument {
    #[serde(deserialize_with = "null_as_empty")]
    pub sections: Vec<Section>,
}

impl SurveyInstrument {
    /// All questions in presentation order
    pub fn questions(&self) -> impl Iterator<Item = (&Section, &Question)> {
        self.sections
            .iter()
            .flat_map(|section| section.questions.iter().map(move |q| (section, q)))
    }

    /// Whether ids run `Q1`, `Q2`, ... without gaps
    pub fn has_sequential_ids(&self) -> bool {
        self.questions()
            .enumerate()
            .all(|(i, (_, q))| q.id == format!("Q{}", i + 1))
    }
}

impl Validate for SurveyInstrument {
    const SCHEMA: &'static str = "SurveyInstrument";

    fn normalize(&mut self) {
        for question in self.sections.iter_mut().flat_map(|s| s.questions.iter_mut()) {
            let empty = question.options.as_ref().is_some_and(|o| o.is_empty());
            if empty && !question.question_type.requires_options() {
                question.options = None;
            }
        }
    }

    fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let mut seen = HashSet::new();

        for (section, question) in self.questions() {
            if question.id.trim().is_empty() {
                violations.push(format!(
                    "question in section `{}` has an empty id",
                    section.title
                ));
            } else if !seen.insert(question.id.as_str()) {
                violations.push(format!("duplicate question id `{}`", question.id));
            }

            let has_options = question.options.as_ref().is_some_and(|o| !o.is_empty());
            if question.question_type.requires_options() && !has_options {
                violations.push(format!(
                    "{}: type `{}` requires non-empty options",
                    question.id, question.question_type
                ));
            } else if !question.question_type.requires_options() && question.options.is_some() {
                violations.push(format!(
                    "{}: type `{}` must not have options",
                    question.id, question.question_type
                ));
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkflowError;
    use crate::skills::schema::validate_output;
    use serde_json::json;

    fn survey_with(question: serde_json::Value) -> serde_json::Value {
        json!({"sections": [{"title": "About you", "questions": [question]}]})
    }

    #[test]
    fn test_single_choice_without_options_rejected() {
        let value = survey_with(json!({
            "id": "Q1", "text": "Age group?", "type": "single_choice", "options": null
        }));
        let err = validate_output::<SurveyInstrument>(value).unwrap_err();
        assert!(matches!(err, WorkflowError::SchemaValidation { schema: "SurveyInstrument", .. }));
    }

    #[test]
    fn test_likert_requires_options() {
        let value = survey_with(json!({"id": "Q1", "text": "Rate it", "type": "likert_5"}));
        assert!(validate_output::<SurveyInstrument>(value).is_err());
    }

    #[test]
    fn test_free_text_with_options_rejected_but_empty_list_normalized() {
        let bad = survey_with(json!({
            "id": "Q1", "text": "Comments?", "type": "free_text", "options": ["a"]
        }));
        assert!(validate_output::<SurveyInstrument>(bad).is_err());

        let empty = survey_with(json!({
            "id": "Q1", "text": "Comments?", "type": "free_text", "options": []
        }));
        let survey = validate_output::<SurveyInstrument>(empty).unwrap();
        assert_eq!(survey.sections[0].questions[0].options, None);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let value = survey_with(json!({
            "id": "Q1", "text": "Pick", "type": "multiple_choice", "options": ["a"]
        }));
        assert!(validate_output::<SurveyInstrument>(value).is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let value = json!({"sections": [{"title": "S", "questions": [
            {"id": "Q1", "text": "a", "type": "numeric"},
            {"id": "Q1", "text": "b", "type": "date"}
        ]}]});
        let err = validate_output::<SurveyInstrument>(value).unwrap_err();
        assert!(err.to_string().contains("duplicate question id `Q1`"));
    }

    #[test]
    fn test_defaults_and_skip_rules() {
        let value = survey_with(json!({
            "id": "Q1", "text": "Recommend us?", "type": "nps_0_10",
            "skip_rules": [{
                "if_question_id": "Q1", "operator": "lte", "value": 6, "goto_question_id": "Q3"
            }]
        }));
        let survey = validate_output::<SurveyInstrument>(value).unwrap();
        let question = &survey.sections[0].questions[0];
        assert!(question.required);
        let rules = question.skip_rules.as_ref().unwrap();
        assert_eq!(rules[0].operator, SkipOperator::Lte);
        assert_eq!(rules[0].value, json!(6));
    }

    #[test]
    fn test_bad_skip_operator_rejected() {
        let value = survey_with(json!({
            "id": "Q1", "text": "x", "type": "numeric",
            "skip_rules": [{
                "if_question_id": "Q1", "operator": "between", "value": 1, "goto_question_id": "Q2"
            }]
        }));
        assert!(validate_output::<SurveyInstrument>(value).is_err());
    }

    #[test]
    fn test_sequential_ids() {
        let value = json!({"sections": [
            {"title": "A", "questions": [{"id": "Q1", "text": "a", "type": "numeric"}]},
            {"title": "B", "questions": [{"id": "Q2", "text": "b", "type": "date"}]}
        ]});
        let survey = validate_output::<SurveyInstrument>(value).unwrap();
        assert!(survey.has_sequential_ids());

        let gap = json!({"sections": [{"title": "A", "questions": [
            {"id": "Q1", "text": "a", "type": "numeric"},
            {"id": "Q3", "text": "b", "type": "date"}
        ]}]});
        let survey = validate_output::<SurveyInstrument>(gap).unwrap();
        assert!(!survey.has_sequential_ids());
    }

    #[test]
    fn test_type_serializes_snake_case() {
        assert_eq!(serde_json::to_value(QuestionType::Likert7).unwrap(), json!("likert_7"));
        assert_eq!(serde_json::to_value(QuestionType::Nps0To10).unwrap(), json!("nps_0_10"));
        assert_eq!(QuestionType::MultiChoice.to_string(), "multi_choice");
    }
}
