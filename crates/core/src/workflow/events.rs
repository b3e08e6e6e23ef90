//! # Workflow Events
//!
//! Progress records emitted by the coordinator, kept on the run and
//! optionally streamed to a driver over a channel.

use super::pipeline::{Decision, PipelineStage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of workflow event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEventKind {
    /// Auto workflow started
    WorkflowStarted,
    /// Human revision started
    RevisionRequested,
    /// Stage started
    StageStarted,
    /// Stage completed successfully
    StageCompleted,
    /// Stage failed; the call aborts
    StageFailed,
    /// Loop decision after QA
    LoopDecision,
    /// Final state reached
    WorkflowCompleted,
}

/// An event in the workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    /// Event ID, unique among the events of one coordinator
    pub id: String,
    /// Position in the coordinator's event stream
    #[serde(default)]
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: WorkflowEventKind,
    /// Stage this event concerns, if any
    #[serde(default)]
    pub stage: Option<PipelineStage>,
    /// Associated data (JSON)
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl WorkflowEvent {
    pub fn new(kind: WorkflowEventKind) -> Self {
        let timestamp = Utc::now();
        Self {
            id: event_id(&timestamp, 0),
            seq: 0,
            timestamp,
            kind,
            stage: None,
            data: None,
        }
    }

    pub fn stage(kind: WorkflowEventKind, stage: PipelineStage) -> Self {
        Self {
            stage: Some(stage),
            ..Self::new(kind)
        }
    }

    pub fn decision(decision: Decision, iter_count: u32, max_iters: u32, passed: bool) -> Self {
        Self::new(WorkflowEventKind::LoopDecision).with_data(serde_json::json!({
            "decision": decision,
            "iter_count": iter_count,
            "max_iters": max_iters,
            "passed": passed,
        }))
    }

    /// Stamp the event with its place in a stream
    pub fn sequenced(mut self, seq: u64) -> Self {
        self.seq = seq;
        self.id = event_id(&self.timestamp, seq);
        self
    }

    /// Add data to the event
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Time-ordered id from the event timestamp and stream position
fn event_id(timestamp: &DateTime<Utc>, seq: u64) -> String {
    let nanos = timestamp.timestamp_nanos_opt().unwrap_or_default();
    format!("{:x}-{:x}", nanos, seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = WorkflowEvent::stage(WorkflowEventKind::StageStarted, PipelineStage::Qa);
        assert_eq!(event.stage, Some(PipelineStage::Qa));
        assert!(event.data.is_none());
    }

    #[test]
    fn test_decision_event_serializes_snake_case() {
        let event = WorkflowEvent::decision(Decision::Revise, 0, 2, false);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], "loop_decision");
        assert_eq!(value["data"]["decision"], "revise");
        assert_eq!(value["data"]["max_iters"], 2);
    }

    #[test]
    fn test_sequenced_ids_differ_for_the_same_instant() {
        let event = WorkflowEvent::new(WorkflowEventKind::WorkflowStarted);
        let a = event.clone().sequenced(1);
        let b = event.sequenced(2);

        assert_eq!(a.timestamp, b.timestamp);
        assert_ne!(a.id, b.id);
        assert_eq!((a.seq, b.seq), (1, 2));
    }
}
