//! # LLM Helpers
//!
//! Shared plumbing for the stage skills: build the extraction request from a
//! [`ModelConfig`], call the extractor, validate into the stage type.

use crate::error::{WorkflowError, WorkflowResult};
use crate::models::ModelConfig;
use crate::skills::llm_client::{ExtractionRequest, StructuredExtractor};
use crate::skills::schema::{schema_json, validate_output, Validate};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// What every stage needs to talk to the model
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub extractor: &'a dyn StructuredExtractor,
    pub config: &'a ModelConfig,
}

impl<'a> StageContext<'a> {
    pub fn new(extractor: &'a dyn StructuredExtractor, config: &'a ModelConfig) -> Self {
        Self { extractor, config }
    }

    /// Extract and validate one stage output
    pub async fn run<T>(&self, system_prompt: &str, user_prompt: String) -> WorkflowResult<T>
    where
        T: DeserializeOwned + Validate + JsonSchema,
    {
        let request = ExtractionRequest {
            system_prompt: system_prompt.to_string(),
            user_prompt,
            response_schema: Some(schema_json::<T>()),
            temperature: self.config.temperature,
            model: self.config.model.clone(),
        };

        let value = self.extractor.extract(&request).await?;
        validate_output(value)
    }
}

/// Pretty JSON of a stage artifact for embedding in a prompt
pub fn prompt_json<T>(value: &T) -> WorkflowResult<String>
where
    T: Serialize + Validate,
{
    serde_json::to_string_pretty(value).map_err(|e| WorkflowError::schema(T::SCHEMA, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkflowError;
    use crate::skills::qa_skill::QaReport;
    use crate::skills::testing::{qa_json, ScriptedExtractor};

    #[test]
    fn test_run_sends_schema_and_model_settings() {
        let extractor = ScriptedExtractor::new(vec![Ok(qa_json(true, &[]))]);
        let config = ModelConfig::new("gpt-4o").with_temperature(0.0);
        let ctx = StageContext::new(&extractor, &config);

        let report: QaReport =
            tokio_test::block_on(ctx.run("system", "user".to_string())).unwrap();
        assert!(report.passed);

        let request = &extractor.requests()[0];
        assert_eq!(request.model.as_deref(), Some("gpt-4o"));
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.user_prompt, "user");
        let schema = request.response_schema.as_ref().unwrap().to_string();
        assert!(schema.contains("suggested_fixes"));
    }

    #[test]
    fn test_run_rejects_wrong_shape() {
        let extractor = ScriptedExtractor::new(vec![Ok(serde_json::json!({"passed": "yes"}))]);
        let config = ModelConfig::default();
        let ctx = StageContext::new(&extractor, &config);

        let err = tokio_test::block_on(ctx.run::<QaReport>("system", "user".to_string()))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::SchemaValidation { schema: "QAReport", .. }));
    }
}
