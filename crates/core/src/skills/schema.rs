//! # Schema Validation
//!
//! Boundary checks for model-generated JSON. Every stage output passes through
//! [`validate_output`]: typed deserialization first, then the explicit
//! constraints serde cannot express (numeric bounds, conditional fields,
//! uniqueness).

use crate::error::{WorkflowError, WorkflowResult};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// Constraint checks applied after deserialization
pub trait Validate {
    /// Schema name reported in validation errors
    const SCHEMA: &'static str;

    /// Canonicalize equivalent encodings before checking
    fn normalize(&mut self) {}

    /// Every violated constraint, empty when valid
    fn validate(&self) -> Vec<String>;
}

/// Deserialize and validate a stage output
pub fn validate_output<T>(value: serde_json::Value) -> WorkflowResult<T>
where
    T: DeserializeOwned + Validate,
{
    let mut parsed: T = serde_json::from_value(value).map_err(|e| WorkflowError::SchemaValidation {
        schema: T::SCHEMA,
        violations: vec![e.to_string()],
    })?;

    parsed.normalize();

    let violations = parsed.validate();
    if !violations.is_empty() {
        return Err(WorkflowError::SchemaValidation {
            schema: T::SCHEMA,
            violations,
        });
    }

    Ok(parsed)
}

/// JSON schema for a stage output, sent alongside the system prompt
pub fn schema_json<T: JsonSchema>() -> serde_json::Value {
    schemars::schema_for!(T).to_value()
}

/// Accept `null` for a list field and treat it as empty
pub fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Sample {
        #[serde(deserialize_with = "null_as_empty")]
        tags: Vec<String>,
        size: u32,
    }

    impl Validate for Sample {
        const SCHEMA: &'static str = "Sample";

        fn validate(&self) -> Vec<String> {
            let mut violations = Vec::new();
            if self.size > 10 {
                violations.push(format!("size must be at most 10, got {}", self.size));
            }
            if self.tags.len() > 2 {
                violations.push("at most 2 tags".to_string());
            }
            violations
        }
    }

    #[test]
    fn test_null_list_becomes_empty() {
        let sample: Sample = validate_output(json!({"tags": null, "size": 1})).unwrap();
        assert!(sample.tags.is_empty());
    }

    #[test]
    fn test_missing_required_key_is_rejected() {
        let err = validate_output::<Sample>(json!({"size": 1})).unwrap_err();
        match err {
            WorkflowError::SchemaValidation { schema, violations } => {
                assert_eq!(schema, "Sample");
                assert!(violations[0].contains("tags"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_all_violations_reported() {
        let err = validate_output::<Sample>(json!({"tags": ["a", "b", "c"], "size": 11}))
            .unwrap_err();
        match err {
            WorkflowError::SchemaValidation { violations, .. } => assert_eq!(violations.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_schema_json_lists_properties() {
        let schema = schema_json::<Sample>();
        assert!(schema["properties"]["tags"].is_object());
        assert!(schema["properties"]["size"].is_object());
    }
}
