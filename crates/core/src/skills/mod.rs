//! # Surveyor Skills
//!
//! The LLM-backed stages of the survey workflow and the plumbing they share.
//!
//! ## Architecture
//!
//! ```text
//! Stage skill (typed input state -> typed output state)
//!   └── StageContext (prompt + schema + model settings)
//!         └── StructuredExtractor (chat completion -> JSON object)
//! ```
//!
//! ## Stages
//!
//! - `PlannerSkill` - Turn a project brief into a `Blueprint`
//! - `GeneratorSkill` - Draft the `SurveyInstrument` from a blueprint, or
//!   rework it from reviewer notes
//! - `QaSkill` - Review a draft and produce a `QaReport`
//! - `RevisionSkill` - Feed failed QA fixes back into the generator

pub mod extract;
pub mod llm_client;
pub mod llm_helpers;
pub mod prompts;
pub mod schema;

pub mod generator_skill;
pub mod planner_skill;
pub mod qa_skill;
pub mod revision_skill;

#[cfg(test)]
pub mod testing;

// Re-exports for convenience
pub use generator_skill::GeneratorSkill;
pub use llm_client::{ExtractionRequest, OpenAiClient, StructuredExtractor};
pub use llm_helpers::StageContext;
pub use planner_skill::{Blueprint, PlannerSkill};
pub use qa_skill::{QaReport, QaSkill};
pub use revision_skill::RevisionSkill;
pub use schema::{validate_output, Validate};
