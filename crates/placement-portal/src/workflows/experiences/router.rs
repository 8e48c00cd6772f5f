use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRef, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::error;

use super::domain::{ApprovalStatus, ExperienceId, ExperienceSubmission, ExperienceUpdate};
use super::service::{ExperienceError, ExperienceService};
use super::validation::ValidationErrors;
use crate::auth::{AdminIdentity, Identity, StudentIdentity, TokenVerifier};
use crate::envelope::{failure_response, Envelope};
use crate::pagination::PageQuery;
use crate::store::StoreError;

/// Shared state for the experience routes.
#[derive(Clone)]
pub struct ExperienceRouterState {
    pub service: Arc<ExperienceService>,
    pub tokens: Arc<TokenVerifier>,
}

impl FromRef<ExperienceRouterState> for Arc<ExperienceService> {
    fn from_ref(state: &ExperienceRouterState) -> Self {
        state.service.clone()
    }
}

impl FromRef<ExperienceRouterState> for Arc<TokenVerifier> {
    fn from_ref(state: &ExperienceRouterState) -> Self {
        state.tokens.clone()
    }
}

/// Router exposing the student submission and admin review endpoints.
pub fn experience_router(state: ExperienceRouterState) -> Router {
    Router::new()
        .route("/api/student/experience", post(submit_handler))
        .route("/api/student/experiences", get(own_list_handler))
        .route(
            "/api/student/experience/:id",
            get(detail_handler)
                .put(update_handler)
                .delete(withdraw_handler),
        )
        .route("/api/admin/submissions", get(admin_list_handler))
        .route("/api/admin/submissions/pending", get(pending_handler))
        .route("/api/admin/submissions/summary", get(summary_handler))
        .route("/api/admin/submissions/:id", get(admin_detail_handler))
        .route("/api/admin/submissions/:id/approve", post(approve_handler))
        .route("/api/admin/submissions/:id/reject", post(reject_handler))
        .with_state(state)
}

/// Optional admin note on a review decision.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewNote {
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmissionListQuery {
    pub status: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

fn experience_id(path: Result<Path<i64>, PathRejection>) -> Result<ExperienceId, ExperienceError> {
    match path {
        Ok(Path(id)) if id >= 1 => Ok(ExperienceId(id)),
        _ => Err(ValidationErrors::single("id", "ID must be a positive integer").into()),
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ExperienceError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ValidationErrors::single("body", rejection.body_text()).into())
}

/// A request without a JSON body carries no note; a JSON body must decode as one.
fn review_note(
    note: Result<Json<ReviewNote>, JsonRejection>,
) -> Result<ReviewNote, ExperienceError> {
    match note {
        Ok(Json(note)) => Ok(note),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(ReviewNote::default()),
        Err(rejection) => Err(ValidationErrors::single("body", rejection.body_text()).into()),
    }
}

pub(crate) async fn submit_handler(
    State(service): State<Arc<ExperienceService>>,
    StudentIdentity(identity): StudentIdentity,
    payload: Result<Json<ExperienceSubmission>, JsonRejection>,
) -> Result<Response, ExperienceError> {
    let submission = json_body(payload)?;
    let receipt = service.submit(identity.user_id, submission).await?;
    let body = Envelope::ok(receipt).with_message("Data created successfully");
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub(crate) async fn own_list_handler(
    State(service): State<Arc<ExperienceService>>,
    StudentIdentity(identity): StudentIdentity,
    Query(query): Query<PageQuery>,
) -> Result<Response, ExperienceError> {
    let page = service
        .list_for_owner(identity.user_id, query.resolve())
        .await?;
    Ok(Json(Envelope::page(page)).into_response())
}

pub(crate) async fn detail_handler(
    State(service): State<Arc<ExperienceService>>,
    identity: Identity,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, ExperienceError> {
    let id = experience_id(path)?;
    let detail = service.detail(id, identity).await?;
    Ok(Json(Envelope::ok(detail)).into_response())
}

pub(crate) async fn update_handler(
    State(service): State<Arc<ExperienceService>>,
    StudentIdentity(identity): StudentIdentity,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ExperienceUpdate>, JsonRejection>,
) -> Result<Response, ExperienceError> {
    let id = experience_id(path)?;
    let changes = json_body(payload)?;
    let record = service.update(id, identity.user_id, changes).await?;
    let body = Envelope::ok(record).with_message("Data updated successfully");
    Ok(Json(body).into_response())
}

pub(crate) async fn withdraw_handler(
    State(service): State<Arc<ExperienceService>>,
    StudentIdentity(identity): StudentIdentity,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, ExperienceError> {
    let id = experience_id(path)?;
    service.withdraw(id, identity.user_id).await?;
    Ok(Json(Envelope::message("Data deleted successfully")).into_response())
}

pub(crate) async fn pending_handler(
    State(service): State<Arc<ExperienceService>>,
    AdminIdentity(_): AdminIdentity,
    Query(query): Query<PageQuery>,
) -> Result<Response, ExperienceError> {
    let page = service
        .list_by_status(ApprovalStatus::Pending, query.resolve())
        .await?;
    Ok(Json(Envelope::page(page)).into_response())
}

pub(crate) async fn admin_list_handler(
    State(service): State<Arc<ExperienceService>>,
    AdminIdentity(_): AdminIdentity,
    Query(query): Query<SubmissionListQuery>,
) -> Result<Response, ExperienceError> {
    let status = match query.status.as_deref() {
        None => ApprovalStatus::Pending,
        Some(raw) => ApprovalStatus::parse(raw).ok_or_else(|| {
            ValidationErrors::single("status", "Status must be one of: pending, approved, rejected")
        })?,
    };
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    };
    let page = service.list_by_status(status, page.resolve()).await?;
    Ok(Json(Envelope::page(page)).into_response())
}

pub(crate) async fn summary_handler(
    State(service): State<Arc<ExperienceService>>,
    AdminIdentity(_): AdminIdentity,
) -> Result<Response, ExperienceError> {
    let summary = service.status_summary().await?;
    Ok(Json(Envelope::ok(summary)).into_response())
}

pub(crate) async fn admin_detail_handler(
    State(service): State<Arc<ExperienceService>>,
    AdminIdentity(identity): AdminIdentity,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, ExperienceError> {
    let id = experience_id(path)?;
    let detail = service.detail(id, identity).await?;
    Ok(Json(Envelope::ok(detail)).into_response())
}

pub(crate) async fn approve_handler(
    State(service): State<Arc<ExperienceService>>,
    AdminIdentity(identity): AdminIdentity,
    path: Result<Path<i64>, PathRejection>,
    note: Result<Json<ReviewNote>, JsonRejection>,
) -> Result<Response, ExperienceError> {
    let id = experience_id(path)?;
    let note = review_note(note)?;
    let record = service
        .approve(id, identity.user_id, note.comment.or(note.reason))
        .await?;
    let body = Envelope::ok(record).with_message("Submission approved successfully");
    Ok(Json(body).into_response())
}

pub(crate) async fn reject_handler(
    State(service): State<Arc<ExperienceService>>,
    AdminIdentity(identity): AdminIdentity,
    path: Result<Path<i64>, PathRejection>,
    note: Result<Json<ReviewNote>, JsonRejection>,
) -> Result<Response, ExperienceError> {
    let id = experience_id(path)?;
    let note = review_note(note)?;
    let record = service
        .reject(id, identity.user_id, note.reason.or(note.comment))
        .await?;
    let body = Envelope::ok(record).with_message("Submission rejected successfully");
    Ok(Json(body).into_response())
}

impl IntoResponse for ExperienceError {
    fn into_response(self) -> Response {
        match self {
            ExperienceError::Validation(errors) => {
                let body = Envelope::failure("VALIDATION_ERROR", "Validation failed")
                    .with_field_errors(errors.0);
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ExperienceError::NotFound(_) => {
                failure_response(StatusCode::NOT_FOUND, "NOT_FOUND", "Resource not found")
            }
            ExperienceError::NotOwner(_) => failure_response(
                StatusCode::FORBIDDEN,
                "NOT_OWNER",
                "You can only modify your own submissions",
            ),
            ExperienceError::CannotUpdate { .. } => failure_response(
                StatusCode::FORBIDDEN,
                "CANNOT_UPDATE",
                "Cannot update approved or rejected submissions",
            ),
            ExperienceError::InvalidTransition(err) => {
                failure_response(StatusCode::CONFLICT, "INVALID_TRANSITION", err.to_string())
            }
            ExperienceError::SubmissionFailed(StoreError::MissingReference(detail)) => {
                failure_response(StatusCode::BAD_REQUEST, "SUBMISSION_FAILED", detail)
            }
            ExperienceError::SubmissionFailed(err) => {
                error!(error = %err, "experience submission failed");
                failure_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SUBMISSION_FAILED",
                    "Failed to submit interview experience",
                )
            }
            ExperienceError::Store(err) => {
                error!(error = %err, "experience request failed");
                failure_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error",
                )
            }
        }
    }
}
