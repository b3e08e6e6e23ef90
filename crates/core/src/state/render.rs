//! Markdown view of a workflow state for review and export.

use crate::skills::planner_skill::Blueprint;
use crate::skills::qa_skill::QaReport;
use crate::state::codebook::count_questions;
use crate::state::instrument::SurveyInstrument;
use crate::state::workflow_state::WorkflowState;
use std::fmt::Write;

pub fn render_markdown(state: &WorkflowState) -> String {
    let mut out = String::new();
    let input = state.input();

    let _ = writeln!(out, "# Survey draft\n");
    let _ = writeln!(out, "- **Audience:** {}", input.audience);
    let _ = writeln!(
        out,
        "- **Question target:** {}-{}",
        input.min_questions, input.max_questions
    );
    let _ = writeln!(
        out,
        "- **Auto revisions:** {} of {}",
        input.iter_count, input.max_iters
    );
    let _ = writeln!(out, "- **Human revisions:** {}", input.human_revision_count);
    out.push('\n');

    if let Some(blueprint) = state.blueprint() {
        render_blueprint(&mut out, blueprint);
    }
    if let Some(survey) = state.survey() {
        render_survey(&mut out, survey, input.max_questions);
    }
    if let Some(qa) = state.qa() {
        render_qa(&mut out, qa);
    }

    out
}

fn bullet_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "**{heading}**\n");
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
    out.push('\n');
}

fn render_blueprint(out: &mut String, blueprint: &Blueprint) {
    let _ = writeln!(out, "## Blueprint\n");
    let _ = writeln!(out, "Target audience: {}\n", blueprint.target_audience);
    bullet_list(out, "Goals", &blueprint.goals);
    bullet_list(out, "Topics to measure", &blueprint.topics_to_measure);
    bullet_list(out, "Suggested sections", &blueprint.sections);
    bullet_list(out, "Question types", &blueprint.question_types);
    if let Some(notes) = &blueprint.notes {
        let _ = writeln!(out, "> {notes}\n");
    }
}

fn render_survey(out: &mut String, survey: &SurveyInstrument, max_questions: u32) {
    let total = count_questions(survey);
    let _ = writeln!(out, "## Survey ({total} / {max_questions} questions)\n");
    if total > max_questions as usize {
        let _ = writeln!(out, "> ⚠️ Exceeds the question limit.\n");
    }

    for section in &survey.sections {
        let _ = writeln!(out, "### {}\n", section.title);
        if let Some(description) = &section.description {
            let _ = writeln!(out, "_{description}_\n");
        }
        for question in &section.questions {
            let required = if question.required { "" } else { " (optional)" };
            let _ = writeln!(
                out,
                "**{}.** {}{} `{}`",
                question.id, question.text, required, question.question_type
            );
            if let Some(options) = &question.options {
                for option in options {
                    let _ = writeln!(out, "  - {option}");
                }
            }
            let tags: Vec<String> = [
                question.topic.as_ref().map(|t| format!("topic: {t}")),
                question.analysis_tag.as_ref().map(|t| format!("tag: {t}")),
            ]
            .into_iter()
            .flatten()
            .collect();
            if !tags.is_empty() {
                let _ = writeln!(out, "  <sub>{}</sub>", tags.join(", "));
            }
            out.push('\n');
        }
    }
}

fn render_qa(out: &mut String, qa: &QaReport) {
    let _ = writeln!(out, "## QA report\n");
    if qa.passed {
        let _ = writeln!(out, "✅ Passed QA.\n");
    } else {
        let _ = writeln!(
            out,
            "> ⚠️ Did not pass QA. Review the issues below before approving.\n"
        );
    }
    bullet_list(out, "Issues", &qa.issues);
    bullet_list(out, "Suggested fixes", &qa.suggested_fixes);
}
