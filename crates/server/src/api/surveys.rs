//! # Survey API
//!
//! Run the workflow, browse saved states, revise from reviewer notes and
//! download codebooks. Every run or revision is saved as a snapshot; a
//! revision or an approval is saved as a child of the snapshot it started
//! from.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use surveyor_core::state::{
    count_questions, write_codebook_csv, Snapshot, SnapshotStore, WorkflowState,
};
use surveyor_core::workflow::Coordinator;
use utoipa::ToSchema;

use super::{ApiError, AppState};
use crate::input::{require_notes, RunRequest};

// === API Types ===

#[derive(Deserialize, ToSchema)]
pub struct CreateSurveyRequest {
    project_brief: String,
    audience: String,
    max_questions: Option<u32>,
    min_questions: Option<u32>,
    max_iters: Option<u32>,
}

#[derive(Deserialize, ToSchema)]
pub struct ReviseSurveyRequest {
    notes: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ApproveSurveyRequest {
    #[serde(default)]
    note: Option<String>,
}

/// Snapshot listing entry
#[derive(Serialize, ToSchema)]
pub struct SurveySummary {
    id: String,
    label: String,
    parent_id: Option<String>,
    /// Reviewer notes for revisions
    description: Option<String>,
    phase: String,
    timestamp: String,
    /// QA verdict, absent before review
    passed: Option<bool>,
    question_count: usize,
    iter_count: u32,
    human_revision_count: u32,
}

#[derive(Serialize, ToSchema)]
pub struct SurveyResponse {
    summary: SurveySummary,
    #[schema(value_type = Object)]
    state: WorkflowState,
}

impl From<&Snapshot> for SurveySummary {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            id: snapshot.id.clone(),
            label: snapshot.label.clone(),
            parent_id: snapshot.parent_id.clone(),
            description: snapshot.description.clone(),
            phase: snapshot.phase.clone(),
            timestamp: snapshot.timestamp.to_rfc3339(),
            passed: snapshot.state.qa().map(|qa| qa.passed),
            question_count: snapshot.state.survey().map(count_questions).unwrap_or(0),
            iter_count: snapshot.state.iter_count(),
            human_revision_count: snapshot.state.human_revision_count(),
        }
    }
}

impl From<Snapshot> for SurveyResponse {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            summary: SurveySummary::from(&snapshot),
            state: snapshot.state,
        }
    }
}

fn find_snapshot(state: &AppState, id: &str) -> Result<Snapshot, ApiError> {
    SnapshotStore::new(&state.db)
        .find(id)?
        .ok_or_else(|| ApiError::not_found(id))
}

// === API Handlers ===

/// Run the workflow on a new brief
#[utoipa::path(
    post,
    path = "/api/v1/surveys",
    tag = "surveys",
    request_body = CreateSurveyRequest,
    responses(
        (status = 201, description = "Workflow finished and saved", body = SurveyResponse),
        (status = 400, description = "Invalid request", body = super::ErrorBody),
        (status = 502, description = "Model output or provider failure", body = super::ErrorBody)
    )
)]
pub async fn create_survey(
    State(state): State<AppState>,
    Json(req): Json<CreateSurveyRequest>,
) -> Result<(StatusCode, Json<SurveyResponse>), ApiError> {
    let input = RunRequest {
        brief: req.project_brief,
        audience: req.audience,
        max_questions: req.max_questions,
        min_questions: req.min_questions,
        max_iters: req.max_iters,
    }
    .into_input(state.default_max_questions)
    .map_err(ApiError::bad_request)?;

    let mut coordinator = Coordinator::new(state.config.clone(), Arc::clone(&state.extractor));
    let run = coordinator.run_workflow(input).await?;

    let snapshot = SnapshotStore::new(&state.db).save(&run.state, "run", None)?;
    tracing::info!(snapshot_id = %snapshot.id, counts = ?run.counts, "Survey run saved");

    Ok((StatusCode::CREATED, Json(snapshot.into())))
}

/// List saved surveys, newest first
#[utoipa::path(
    get,
    path = "/api/v1/surveys",
    tag = "surveys",
    responses(
        (status = 200, description = "Saved snapshots", body = Vec<SurveySummary>)
    )
)]
pub async fn list_surveys(
    State(state): State<AppState>,
) -> Result<Json<Vec<SurveySummary>>, ApiError> {
    let snapshots = SnapshotStore::new(&state.db).list()?;
    Ok(Json(snapshots.iter().map(SurveySummary::from).collect()))
}

/// Get a saved survey state
#[utoipa::path(
    get,
    path = "/api/v1/surveys/{id}",
    tag = "surveys",
    params(("id" = String, Path, description = "Snapshot id")),
    responses(
        (status = 200, description = "Saved state", body = SurveyResponse),
        (status = 404, description = "Unknown snapshot", body = super::ErrorBody)
    )
)]
pub async fn get_survey(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SurveyResponse>, ApiError> {
    Ok(Json(find_snapshot(&state, &id)?.into()))
}

/// Revise a saved survey from reviewer notes
#[utoipa::path(
    post,
    path = "/api/v1/surveys/{id}/revise",
    tag = "surveys",
    params(("id" = String, Path, description = "Snapshot id to revise")),
    request_body = ReviseSurveyRequest,
    responses(
        (status = 201, description = "Revised and reviewed state, saved as a child snapshot", body = SurveyResponse),
        (status = 400, description = "Blank notes", body = super::ErrorBody),
        (status = 404, description = "Unknown snapshot", body = super::ErrorBody)
    )
)]
pub async fn revise_survey(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReviseSurveyRequest>,
) -> Result<(StatusCode, Json<SurveyResponse>), ApiError> {
    let notes = require_notes(&req.notes).map_err(ApiError::bad_request)?;
    let parent = find_snapshot(&state, &id)?;

    let mut coordinator = Coordinator::new(state.config.clone(), Arc::clone(&state.extractor));
    let run = coordinator.revise_with_notes(&parent.state, notes).await?;

    let store = SnapshotStore::new(&state.db);
    let snapshot = store
        .snapshot("revise", run.state)
        .with_parent(Some(parent.id.as_str()))
        .with_description(notes);
    store.insert(&snapshot)?;
    tracing::info!(
        snapshot_id = %snapshot.id,
        parent_id = %parent.id,
        human_revision_count = snapshot.state.human_revision_count(),
        "Survey revision saved"
    );

    Ok((StatusCode::CREATED, Json(snapshot.into())))
}

/// Approve a saved survey
#[utoipa::path(
    post,
    path = "/api/v1/surveys/{id}/approve",
    tag = "surveys",
    params(("id" = String, Path, description = "Snapshot id to approve")),
    request_body = ApproveSurveyRequest,
    responses(
        (status = 201, description = "Approval saved as a child snapshot", body = SurveyResponse),
        (status = 400, description = "Snapshot has no survey", body = super::ErrorBody),
        (status = 404, description = "Unknown snapshot", body = super::ErrorBody)
    )
)]
pub async fn approve_survey(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ApproveSurveyRequest>,
) -> Result<(StatusCode, Json<SurveyResponse>), ApiError> {
    let parent = find_snapshot(&state, &id)?;
    if parent.state.survey().is_none() {
        return Err(ApiError::bad_request(format!("Snapshot `{id}` has no survey yet")));
    }

    let note = req.note.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let snapshot = SnapshotStore::new(&state.db).approve(&parent.id, note)?;

    Ok((StatusCode::CREATED, Json(snapshot.into())))
}

/// Download the codebook of a saved survey as CSV
#[utoipa::path(
    get,
    path = "/api/v1/surveys/{id}/codebook.csv",
    tag = "surveys",
    params(("id" = String, Path, description = "Snapshot id")),
    responses(
        (status = 200, description = "One row per question", content_type = "text/csv", body = String),
        (status = 404, description = "Unknown snapshot", body = super::ErrorBody)
    )
)]
pub async fn get_codebook(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = find_snapshot(&state, &id)?;
    let survey = snapshot
        .state
        .survey()
        .ok_or_else(|| ApiError::bad_request(format!("Snapshot `{id}` has no survey yet")))?;

    let mut buf = Vec::new();
    write_codebook_csv(survey, &mut buf)
        .map_err(|e| ApiError::internal(format!("Failed to write codebook: {e}")))?;

    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], buf))
}
