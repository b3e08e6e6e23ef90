//! Request checks shared by the CLI and the HTTP API.

use surveyor_core::skills::planner_skill::{MAX_BLUEPRINT_QUESTIONS, MIN_BLUEPRINT_QUESTIONS};
use surveyor_core::state::{WorkflowInput, DEFAULT_MAX_QUESTIONS};

/// Env var for the default question target
pub const DEFAULT_MAX_QUESTIONS_VAR: &str = "DEFAULT_MAX_QUESTIONS";

/// Question target from `DEFAULT_MAX_QUESTIONS`, or the built-in default
pub fn default_max_questions() -> u32 {
    std::env::var(DEFAULT_MAX_QUESTIONS_VAR)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .filter(|&n| is_question_target(n))
        .unwrap_or(DEFAULT_MAX_QUESTIONS)
}

/// Targets a planner blueprint can accept
fn is_question_target(n: u32) -> bool {
    (MIN_BLUEPRINT_QUESTIONS..=MAX_BLUEPRINT_QUESTIONS).contains(&i64::from(n))
}

/// Largest auto-revision budget a request may ask for
pub const MAX_ITERS_LIMIT: u32 = 5;

/// Parameters of a new workflow run
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub brief: String,
    pub audience: String,
    pub max_questions: Option<u32>,
    pub min_questions: Option<u32>,
    pub max_iters: Option<u32>,
}

impl RunRequest {
    /// Check the request and build the workflow input
    pub fn into_input(self, default_max_questions: u32) -> Result<WorkflowInput, String> {
        if self.brief.trim().is_empty() {
            return Err("project brief must not be empty".to_string());
        }
        if self.audience.trim().is_empty() {
            return Err("audience must not be empty".to_string());
        }

        let max_questions = self.max_questions.unwrap_or(default_max_questions);
        if !is_question_target(max_questions) {
            return Err(format!(
                "max_questions must be between {MIN_BLUEPRINT_QUESTIONS} and {MAX_BLUEPRINT_QUESTIONS}, got {max_questions}"
            ));
        }

        let mut input = WorkflowInput::new(&self.brief, &self.audience).with_target(max_questions);
        if let Some(min) = self.min_questions {
            if min > max_questions {
                return Err(format!(
                    "min_questions ({min}) must not exceed max_questions ({max_questions})"
                ));
            }
            input = input.with_min_questions(min);
        }
        if let Some(max_iters) = self.max_iters {
            if max_iters > MAX_ITERS_LIMIT {
                return Err(format!("max_iters must be at most {MAX_ITERS_LIMIT}, got {max_iters}"));
            }
            input = input.with_max_iters(max_iters);
        }

        Ok(input)
    }
}

/// Reviewer notes, trimmed; blank notes are rejected
pub fn require_notes(notes: &str) -> Result<&str, String> {
    let notes = notes.trim();
    if notes.is_empty() {
        Err("revision notes must not be empty".to_string())
    } else {
        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surveyor_core::state::DEFAULT_MAX_ITERS;

    fn request() -> RunRequest {
        RunRequest {
            brief: "  Measure commuter satisfaction ".to_string(),
            audience: "Bus riders".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_follow_target() {
        let input = request().into_input(30).unwrap();
        assert_eq!(input.project_brief, "Measure commuter satisfaction");
        assert_eq!(input.max_questions, 30);
        assert_eq!(input.min_questions, 25);
        assert_eq!(input.max_iters, DEFAULT_MAX_ITERS);
    }

    #[test]
    fn test_explicit_limits() {
        let input = RunRequest {
            max_questions: Some(10),
            min_questions: Some(4),
            max_iters: Some(3),
            ..request()
        }
        .into_input(20)
        .unwrap();
        assert_eq!((input.max_questions, input.min_questions, input.max_iters), (10, 4, 3));
    }

    #[test]
    fn test_rejects_bad_requests() {
        assert!(RunRequest {
            brief: " ".into(),
            ..request()
        }
        .into_input(20)
        .is_err());
        assert!(RunRequest {
            audience: String::new(),
            ..request()
        }
        .into_input(20)
        .is_err());
        assert!(RunRequest {
            max_questions: Some(0),
            ..request()
        }
        .into_input(20)
        .is_err());
        assert!(RunRequest {
            max_questions: Some(10),
            min_questions: Some(11),
            ..request()
        }
        .into_input(20)
        .is_err());
    }

    #[test]
    fn test_question_target_bounds() {
        let target = |n: u32| {
            RunRequest {
                max_questions: Some(n),
                ..request()
            }
            .into_input(20)
        };

        assert_eq!(target(5).unwrap().max_questions, 5);
        assert_eq!(target(80).unwrap().max_questions, 80);
        assert!(target(4).is_err());
        assert!(target(81).is_err());
        assert!(target(2_000_000_000).is_err());
        assert!(target(u32::MAX).is_err());
        assert!(request().into_input(500).is_err());
    }

    #[test]
    fn test_max_iters_is_capped() {
        let iters = |n: u32| {
            RunRequest {
                max_iters: Some(n),
                ..request()
            }
            .into_input(20)
        };

        assert_eq!(iters(0).unwrap().max_iters, 0);
        assert_eq!(iters(MAX_ITERS_LIMIT).unwrap().max_iters, MAX_ITERS_LIMIT);
        assert!(iters(MAX_ITERS_LIMIT + 1).is_err());
        assert!(iters(u32::MAX).is_err());
    }

    #[test]
    fn test_require_notes() {
        assert_eq!(require_notes("  shorten Q3 \n").unwrap(), "shorten Q3");
        assert!(require_notes(" \t\n").is_err());
    }
}
