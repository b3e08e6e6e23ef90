//! # Workflow Coordinator
//!
//! Drives the stages over [`WorkflowState`] until the loop decision stops:
//!
//! ```text
//! Initialized -> Planner -> Planned -> Generator -> Drafted -> QA -> Reviewed
//!   Reviewed: decide
//!     Stop   -> done
//!     Revise -> Revision -> Drafted -> QA -> ...
//! ```
//!
//! Human revision is a separate entry point that re-enters an existing
//! state: regenerate from reviewer notes, then QA once.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{WorkflowError, WorkflowResult};
use crate::models::ModelConfig;
use crate::skills::llm_client::StructuredExtractor;
use crate::skills::llm_helpers::StageContext;
use crate::skills::prompts::HUMAN_REVISE_USER;
use crate::skills::{GeneratorSkill, PlannerSkill, QaSkill, RevisionSkill};
use crate::state::workflow_state::{
    DraftedState, PlannedState, ReviewedState, WorkflowInput, WorkflowState,
};

use super::events::{WorkflowEvent, WorkflowEventKind};
use super::pipeline::{decide, next_stage, PipelineStage};

/// Configuration for the coordinator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Model settings shared by every stage
    #[serde(default)]
    pub model: ModelConfig,
    /// Per-stage temperature overrides
    #[serde(default)]
    pub stage_temperatures: HashMap<PipelineStage, f32>,
}

impl CoordinatorConfig {
    /// Model config for a stage, with any temperature override applied
    pub fn model_for(&self, stage: PipelineStage) -> ModelConfig {
        match self.stage_temperatures.get(&stage) {
            Some(&temperature) => self.model.clone().with_temperature(temperature),
            None => self.model.clone(),
        }
    }
}

/// Stage invocations during one call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    pub planner: u32,
    pub generator: u32,
    pub qa: u32,
    pub revision: u32,
    pub human_revision: u32,
}

impl StageCounts {
    fn record(&mut self, stage: PipelineStage) {
        let slot = match stage {
            PipelineStage::Planner => &mut self.planner,
            PipelineStage::Generator => &mut self.generator,
            PipelineStage::Qa => &mut self.qa,
            PipelineStage::Revision => &mut self.revision,
            PipelineStage::HumanRevision => &mut self.human_revision,
        };
        *slot += 1;
    }
}

/// Result of a workflow or human revision call
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    pub state: WorkflowState,
    pub counts: StageCounts,
    pub events: Vec<WorkflowEvent>,
}

/// Summary fields attached to stage-completed events
trait StageOutput {
    fn summary(&self) -> serde_json::Value;
}

impl StageOutput for PlannedState {
    fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "topics": self.blueprint.topics_to_measure.len(),
            "sections": self.blueprint.sections.len(),
        })
    }
}

impl StageOutput for DraftedState {
    fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "questions": self.survey.questions().count(),
            "iter_count": self.input().iter_count,
            "human_revision_count": self.input().human_revision_count,
        })
    }
}

impl StageOutput for ReviewedState {
    fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "passed": self.qa.passed,
            "issues": self.qa.issues.len(),
            "suggested_fixes": self.qa.suggested_fixes.len(),
        })
    }
}

/// The workflow coordinator
pub struct Coordinator {
    config: CoordinatorConfig,
    extractor: Arc<dyn StructuredExtractor>,
    counts: StageCounts,
    events: Vec<WorkflowEvent>,
    /// Sequence number of the next emitted event
    event_seq: u64,
    event_tx: Option<mpsc::Sender<WorkflowEvent>>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig, extractor: Arc<dyn StructuredExtractor>) -> Self {
        Self {
            config,
            extractor,
            counts: StageCounts::default(),
            events: Vec::new(),
            event_seq: 0,
            event_tx: None,
        }
    }

    /// Set event channel for streaming events
    pub fn with_event_channel(mut self, tx: mpsc::Sender<WorkflowEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Drop whatever an earlier call left behind, including a failed one
    fn begin(&mut self) {
        self.counts = StageCounts::default();
        self.events.clear();
    }

    async fn emit(&mut self, event: WorkflowEvent) {
        let event = event.sequenced(self.event_seq);
        self.event_seq += 1;
        self.events.push(event.clone());
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }

    fn finish(&mut self, state: WorkflowState) -> WorkflowRun {
        WorkflowRun {
            state,
            counts: std::mem::take(&mut self.counts),
            events: std::mem::take(&mut self.events),
        }
    }

    /// Run one stage future with start/completion/failure bookkeeping
    async fn observe<T, F>(&mut self, stage: PipelineStage, work: F) -> WorkflowResult<T>
    where
        T: StageOutput,
        F: Future<Output = WorkflowResult<T>>,
    {
        self.counts.record(stage);
        self.emit(WorkflowEvent::stage(WorkflowEventKind::StageStarted, stage))
            .await;

        match work.await {
            Ok(output) => {
                self.emit(
                    WorkflowEvent::stage(WorkflowEventKind::StageCompleted, stage)
                        .with_data(output.summary()),
                )
                .await;
                Ok(output)
            }
            Err(err) => {
                tracing::error!(stage = %stage, kind = err.kind(), error = %err, "Stage failed");
                self.emit(
                    WorkflowEvent::stage(WorkflowEventKind::StageFailed, stage).with_data(
                        serde_json::json!({ "kind": err.kind(), "message": err.to_string() }),
                    ),
                )
                .await;
                Err(err)
            }
        }
    }

    /// Advance the state by one stage
    async fn step(
        &mut self,
        stage: PipelineStage,
        state: WorkflowState,
    ) -> WorkflowResult<WorkflowState> {
        let extractor = Arc::clone(&self.extractor);
        let model = self.config.model_for(stage);
        let ctx = StageContext::new(extractor.as_ref(), &model);

        match state {
            WorkflowState::Initialized(input) => self
                .observe(stage, PlannerSkill::run(input, ctx))
                .await
                .map(WorkflowState::Planned),
            WorkflowState::Planned(planned) => self
                .observe(stage, GeneratorSkill::run(planned, ctx))
                .await
                .map(WorkflowState::Drafted),
            WorkflowState::Drafted(drafted) => self
                .observe(stage, QaSkill::run(drafted, ctx))
                .await
                .map(WorkflowState::Reviewed),
            WorkflowState::Reviewed(reviewed) => self
                .observe(stage, RevisionSkill::run(reviewed, ctx))
                .await
                .map(WorkflowState::Drafted),
        }
    }

    /// Run Planner, Generator and QA, then the bounded auto-revision loop
    #[tracing::instrument(
        skip(self, input),
        fields(
            max_questions = input.max_questions,
            min_questions = input.min_questions,
            max_iters = input.max_iters
        )
    )]
    pub async fn run_workflow(&mut self, input: WorkflowInput) -> WorkflowResult<WorkflowRun> {
        self.begin();
        self.emit(WorkflowEvent::new(WorkflowEventKind::WorkflowStarted))
            .await;

        let mut state = WorkflowState::Initialized(input);

        loop {
            if let WorkflowState::Reviewed(reviewed) = &state {
                let decision = decide(reviewed);
                let input = reviewed.input();
                tracing::info!(
                    ?decision,
                    passed = reviewed.qa.passed,
                    iter_count = input.iter_count,
                    max_iters = input.max_iters,
                    "Loop decision"
                );
                let event = WorkflowEvent::decision(
                    decision,
                    input.iter_count,
                    input.max_iters,
                    reviewed.qa.passed,
                );
                self.emit(event).await;
            }

            let Some(stage) = next_stage(&state) else {
                break;
            };
            state = self.step(stage, state).await?;
        }

        self.emit(
            WorkflowEvent::new(WorkflowEventKind::WorkflowCompleted).with_data(
                serde_json::json!({ "phase": state.phase(), "iter_count": state.iter_count() }),
            ),
        )
        .await;

        Ok(self.finish(state))
    }

    /// Regenerate an existing draft from reviewer notes, then QA it once
    ///
    /// `state` is left untouched; the returned state is a revised copy with
    /// `human_revision_count` one higher. `iter_count` is not changed.
    #[tracing::instrument(skip(self, state, notes), fields(phase = state.phase()))]
    pub async fn revise_with_notes(
        &mut self,
        state: &WorkflowState,
        notes: &str,
    ) -> WorkflowResult<WorkflowRun> {
        if state.blueprint().is_none() {
            return Err(WorkflowError::template(HUMAN_REVISE_USER.name, "blueprint"));
        }
        let mut drafted = state
            .drafted()
            .cloned()
            .ok_or_else(|| WorkflowError::template(HUMAN_REVISE_USER.name, "survey"))?;

        self.begin();
        drafted.planned.input.human_notes = Some(notes.to_string());
        drafted.planned.input.human_revision_count += 1;

        self.emit(
            WorkflowEvent::new(WorkflowEventKind::RevisionRequested).with_data(serde_json::json!({
                "human_revision_count": drafted.input().human_revision_count,
            })),
        )
        .await;

        let extractor = Arc::clone(&self.extractor);
        let generator_model = self.config.model_for(PipelineStage::HumanRevision);
        let qa_model = self.config.model_for(PipelineStage::Qa);

        let drafted = self
            .observe(
                PipelineStage::HumanRevision,
                GeneratorSkill::revise(
                    drafted,
                    StageContext::new(extractor.as_ref(), &generator_model),
                ),
            )
            .await?;
        let reviewed = self
            .observe(
                PipelineStage::Qa,
                QaSkill::run(drafted, StageContext::new(extractor.as_ref(), &qa_model)),
            )
            .await?;

        let state = WorkflowState::Reviewed(reviewed);
        self.emit(
            WorkflowEvent::new(WorkflowEventKind::WorkflowCompleted).with_data(serde_json::json!({
                "phase": state.phase(),
                "human_revision_count": state.human_revision_count(),
            })),
        )
        .await;

        Ok(self.finish(state))
    }
}

/// Run the full workflow with default configuration
pub async fn run_workflow(
    extractor: Arc<dyn StructuredExtractor>,
    input: WorkflowInput,
) -> WorkflowResult<WorkflowState> {
    let mut coordinator = Coordinator::new(CoordinatorConfig::default(), extractor);
    Ok(coordinator.run_workflow(input).await?.state)
}

/// Human revision with default configuration
pub async fn revise_with_notes(
    extractor: Arc<dyn StructuredExtractor>,
    state: &WorkflowState,
    notes: &str,
) -> WorkflowResult<WorkflowState> {
    let mut coordinator = Coordinator::new(CoordinatorConfig::default(), extractor);
    Ok(coordinator.revise_with_notes(state, notes).await?.state)
}
