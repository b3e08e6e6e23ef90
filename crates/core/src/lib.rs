//! # Surveyor Core
//!
//! Survey design workflow: an LLM planner drafts a blueprint from a project
//! brief, a generator writes the questionnaire, and a QA reviewer gates a
//! bounded revision loop. Finished drafts can be reworked from reviewer notes.
//!
//! ## Architecture
//!
//! - `skills/` - Stage skills, prompts, JSON extraction and schema checks
//! - `models` - LLM endpoint settings (secrets file, environment)
//! - `state/` - Workflow state, survey instrument, codebook, snapshot history
//! - `workflow/` - Stage sequencing and the revision loop
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use surveyor_core::skills::OpenAiClient;
//! use surveyor_core::state::WorkflowInput;
//! use surveyor_core::workflow::run_workflow;
//!
//! let client = Arc::new(OpenAiClient::from_env()?);
//! let input = WorkflowInput::new("Measure library satisfaction", "Library members");
//! let state = run_workflow(client, input).await?;
//! ```

pub mod error;
pub mod models;
pub mod skills;
pub mod state;
pub mod workflow;

pub use error::{WorkflowError, WorkflowResult};
