//! # Workflow Errors
//!
//! Error taxonomy shared by the extraction client, the stages and the
//! coordinator. Every variant aborts the current top-level call; nothing here
//! is retried internally.

/// Errors raised while running or revising a survey workflow
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Missing credential or unusable endpoint settings
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Model output could not be parsed as a JSON object by any tier
    #[error("model did not return a parseable JSON object: {message}\n\nRaw content:\n{raw}")]
    Extraction { message: String, raw: String },

    /// Parsed output violates the stage schema
    #[error("{schema} failed schema validation: {}", .violations.join("; "))]
    SchemaValidation {
        schema: &'static str,
        violations: Vec<String>,
    },

    /// A prompt template referenced a value the state does not hold
    #[error("template `{template}` is missing required field `{field}`")]
    Template {
        template: &'static str,
        field: String,
    },

    /// Transport failure or provider error status
    #[error("LLM request failed{}: {message}", fmt_status(.status))]
    Request {
        status: Option<u16>,
        message: String,
    },

    /// Snapshot store failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl WorkflowError {
    /// Shorthand for a single-violation schema error
    pub fn schema(schema: &'static str, violation: impl Into<String>) -> Self {
        Self::SchemaValidation {
            schema,
            violations: vec![violation.into()],
        }
    }

    /// Shorthand for a template error
    pub fn template(template: &'static str, field: impl Into<String>) -> Self {
        Self::Template {
            template,
            field: field.into(),
        }
    }

    /// Short machine-readable kind, used in events and API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::Extraction { .. } => "extraction_failure",
            Self::SchemaValidation { .. } => "schema_validation_error",
            Self::Template { .. } => "template_error",
            Self::Request { .. } => "request_error",
            Self::Storage(_) => "storage_error",
        }
    }
}

impl From<rusqlite::Error> for WorkflowError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" ({code})"),
        None => String::new(),
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_lists_violations() {
        let err = WorkflowError::SchemaValidation {
            schema: "Blueprint",
            violations: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "Blueprint failed schema validation: a; b");
        assert_eq!(err.kind(), "schema_validation_error");
    }

    #[test]
    fn test_extraction_error_carries_raw_text() {
        let err = WorkflowError::Extraction {
            message: "no JSON object found".to_string(),
            raw: "sorry, I cannot help".to_string(),
        };
        assert!(err.to_string().contains("sorry, I cannot help"));
    }

    #[test]
    fn test_request_error_formats_status() {
        let err = WorkflowError::Request {
            status: Some(500),
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "LLM request failed (500): boom");
    }
}
