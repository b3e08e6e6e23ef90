//! # Codebook
//!
//! One row per question, for analysts and spreadsheet export.

use crate::state::instrument::SurveyInstrument;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Flattened question record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodebookRow {
    pub question_id: String,
    pub section: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: String,
    /// Options joined with ` | `, empty when the question has none
    pub options: String,
    pub topic: Option<String>,
    pub analysis_tag: Option<String>,
    pub required: bool,
}

pub const OPTION_SEPARATOR: &str = " | ";

/// Flatten the instrument in presentation order
pub fn flatten(survey: &SurveyInstrument) -> Vec<CodebookRow> {
    survey
        .questions()
        .map(|(section, question)| CodebookRow {
            question_id: question.id.clone(),
            section: section.title.clone(),
            text: question.text.clone(),
            question_type: question.question_type.to_string(),
            options: question
                .options
                .as_deref()
                .unwrap_or_default()
                .join(OPTION_SEPARATOR),
            topic: question.topic.clone(),
            analysis_tag: question.analysis_tag.clone(),
            required: question.required,
        })
        .collect()
}

pub fn count_questions(survey: &SurveyInstrument) -> usize {
    survey.sections.iter().map(|s| s.questions.len()).sum()
}

/// Write the codebook as CSV: a header row plus one row per question
pub fn write_codebook_csv<W: Write>(survey: &SurveyInstrument, writer: W) -> csv::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let rows = flatten(survey);

    if rows.is_empty() {
        csv_writer.write_record([
            "question_id",
            "section",
            "text",
            "type",
            "options",
            "topic",
            "analysis_tag",
            "required",
        ])?;
    }
    for row in rows {
        csv_writer.serialize(row)?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::schema::validate_output;
    use crate::skills::testing::survey_json;
    use serde_json::json;

    fn survey() -> SurveyInstrument {
        validate_output(json!({"sections": [
            {"title": "About you", "questions": [
                {"id": "Q1", "text": "Age group?", "type": "single_choice",
                 "options": ["18-34", "35-54", "55+"], "topic": "demographics", "analysis_tag": "age"},
                {"id": "Q2", "text": "Postcode", "type": "free_text", "required": false}
            ]},
            {"title": "Experience", "questions": [
                {"id": "Q3", "text": "How likely to recommend?", "type": "nps_0_10"}
            ]}
        ]}))
        .unwrap()
    }

    #[test]
    fn test_flatten_preserves_ids_types_and_options() {
        let survey = survey();
        let rows = flatten(&survey);

        assert_eq!(rows.len(), count_questions(&survey));
        for ((_, question), row) in survey.questions().zip(&rows) {
            assert_eq!(row.question_id, question.id);
            assert_eq!(row.question_type, question.question_type.as_str());
            let expected = question.options.clone().unwrap_or_default();
            let split: Vec<String> = if row.options.is_empty() {
                Vec::new()
            } else {
                row.options.split(OPTION_SEPARATOR).map(str::to_string).collect()
            };
            assert_eq!(split, expected);
        }

        assert_eq!(rows[0].options, "18-34 | 35-54 | 55+");
        assert_eq!(rows[1].section, "About you");
        assert!(!rows[1].required);
        assert_eq!(rows[2].section, "Experience");
        assert!(rows[2].required);
    }

    #[test]
    fn test_count_matches_flatten_for_fixture_sizes() {
        for extra in [0, 1, 7] {
            let survey: SurveyInstrument = validate_output(survey_json(extra)).unwrap();
            assert_eq!(flatten(&survey).len(), count_questions(&survey));
            assert_eq!(count_questions(&survey), extra + 1);
        }
    }

    #[test]
    fn test_csv_has_header_and_one_row_per_question() {
        let survey = survey();
        let mut buf = Vec::new();
        write_codebook_csv(&survey, &mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), count_questions(&survey) + 1);
        assert_eq!(
            lines[0],
            "question_id,section,text,type,options,topic,analysis_tag,required"
        );
        assert!(lines[1].starts_with("Q1,About you,Age group?,single_choice,18-34 | 35-54 | 55+"));
    }

    #[test]
    fn test_csv_for_empty_survey_is_header_only() {
        let survey = SurveyInstrument { sections: vec![] };
        let mut buf = Vec::new();
        write_codebook_csv(&survey, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
    }
}
