//! # HTTP API
//!
//! Axum routes over the workflow and the snapshot history.

pub mod surveys;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use surveyor_core::skills::StructuredExtractor;
use surveyor_core::state::SurveyDb;
use surveyor_core::workflow::CoordinatorConfig;
use surveyor_core::WorkflowError;
use utoipa::{OpenApi, ToSchema};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SurveyDb>,
    pub extractor: Arc<dyn StructuredExtractor>,
    pub config: CoordinatorConfig,
    /// Question target when a request does not name one
    pub default_max_questions: u32,
}

// === Errors ===

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorDetail {
    kind: String,
    message: String,
}

/// Error returned by handlers as a JSON body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_request",
            message: message.into(),
        }
    }

    pub fn not_found(id: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind: "not_found",
            message: format!("No survey snapshot with id `{id}`"),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal_error",
            message: message.into(),
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        let status = match &err {
            WorkflowError::Extraction { .. }
            | WorkflowError::SchemaValidation { .. }
            | WorkflowError::Request { .. } => StatusCode::BAD_GATEWAY,
            WorkflowError::Template { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::Configuration(_) | WorkflowError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        tracing::error!(kind = err.kind(), error = %err, "Request failed");

        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.kind.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

// === OpenAPI Definition ===

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Surveyor API",
        version = "1.0.0",
        description = "Plan, draft, review and revise survey questionnaires"
    ),
    paths(
        surveys::create_survey,
        surveys::list_surveys,
        surveys::get_survey,
        surveys::revise_survey,
        surveys::approve_survey,
        surveys::get_codebook
    ),
    components(schemas(
        surveys::CreateSurveyRequest,
        surveys::ReviseSurveyRequest,
        surveys::ApproveSurveyRequest,
        surveys::SurveySummary,
        surveys::SurveyResponse,
        ErrorBody,
        ErrorDetail
    )),
    tags((name = "surveys", description = "Survey workflow runs and revisions"))
)]
pub struct ApiDoc;

async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/surveys",
            get(surveys::list_surveys).post(surveys::create_survey),
        )
        .route("/api/v1/surveys/:id", get(surveys::get_survey))
        .route("/api/v1/surveys/:id/revise", post(surveys::revise_survey))
        .route("/api/v1/surveys/:id/approve", post(surveys::approve_survey))
        .route(
            "/api/v1/surveys/:id/codebook.csv",
            get(surveys::get_codebook),
        )
        .route("/api/v1/openapi.json", get(serve_openapi))
        .with_state(state)
}
