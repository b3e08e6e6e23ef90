pub mod codebook;
pub mod db;
pub mod instrument;
pub mod io;
pub mod render;
pub mod snapshots;
pub mod workflow_state;

pub use db::SurveyDb;

pub use codebook::{count_questions, flatten, write_codebook_csv, CodebookRow};
pub use instrument::{Question, QuestionType, Section, SkipOperator, SkipRule, SurveyInstrument};
pub use render::render_markdown;
pub use snapshots::{Snapshot, SnapshotStore, APPROVED_LABEL};
pub use workflow_state::{
    DraftedState, PlannedState, ReviewedState, WorkflowInput, WorkflowState,
    DEFAULT_MAX_ITERS, DEFAULT_MAX_QUESTIONS, DEFAULT_MIN_QUESTIONS,
};
