//! Test doubles and fixtures shared by the stage and coordinator tests.

use crate::error::{WorkflowError, WorkflowResult};
use crate::skills::llm_client::{ExtractionRequest, StructuredExtractor};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays a fixed script of responses and records every request
pub struct ScriptedExtractor {
    responses: Mutex<VecDeque<WorkflowResult<Value>>>,
    requests: Mutex<Vec<ExtractionRequest>>,
}

impl ScriptedExtractor {
    pub fn new(responses: Vec<WorkflowResult<Value>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ExtractionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl StructuredExtractor for ScriptedExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> WorkflowResult<Value> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(WorkflowError::Request {
                    status: None,
                    message: "script exhausted".to_string(),
                })
            })
    }
}

pub fn blueprint_json(max_questions: i64) -> Value {
    json!({
        "goals": ["Measure satisfaction"],
        "target_audience": "Residents",
        "topics_to_measure": ["satisfaction", "trust"],
        "sections": ["About you", "Services"],
        "question_types": ["single_choice", "likert_5", "free_text"],
        "max_questions": max_questions,
        "notes": null
    })
}

/// Survey with one choice question and `extra` free-text questions
pub fn survey_json(extra: usize) -> Value {
    let mut questions = vec![json!({
        "id": "Q1",
        "text": "How satisfied are you?",
        "type": "likert_5",
        "options": ["Very dissatisfied", "Dissatisfied", "Neutral", "Satisfied", "Very satisfied"],
        "required": true,
        "topic": "satisfaction",
        "analysis_tag": "sat_overall",
        "notes": null,
        "skip_rules": null
    })];
    for i in 0..extra {
        questions.push(json!({
            "id": format!("Q{}", i + 2),
            "text": format!("Anything else ({})?", i + 1),
            "type": "free_text",
            "options": null,
            "required": false,
            "topic": "trust",
            "analysis_tag": null,
            "notes": null,
            "skip_rules": null
        }));
    }
    json!({"sections": [{"title": "Services", "description": null, "questions": questions}]})
}

pub fn qa_json(passed: bool, fixes: &[&str]) -> Value {
    let issues: Vec<&str> = if passed { Vec::new() } else { vec!["Wording is leading"] };
    json!({
        "passed": passed,
        "issues": issues,
        "suggested_fixes": fixes,
    })
}
