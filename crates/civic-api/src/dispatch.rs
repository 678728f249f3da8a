//! Handlers that route work: assignment, acceptance and forwarding.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/reports/{id}/assign/team` | Body: `{"team_id":"..."}`; returns 201 |
//! | `POST` | `/reports/{id}/assign/user` | Body: `{"user_id":"..."}`; returns 201 |
//! | `POST` | `/reports/{id}/forward` | Body: `{"from_department_id":"...","target_department_id":"...","reason":"..."}` |
//! | `POST` | `/assignments/{id}/accept` | Only the assigned user |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use civic_core::{
  ability::{Action, Subject},
  assignment::Assignment,
  forwarding::ForwardRequest,
  report::Report,
  store::ReportStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{caller::Caller, error::ApiError, reports::load};

// ─── Assign ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AssignTeamBody {
  pub team_id: Uuid,
}

/// `POST /reports/{id}/assign/team`
pub async fn assign_team<S: ReportStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<AssignTeamBody>,
) -> Result<impl IntoResponse, ApiError> {
  let report = load(&*store, id).await?;
  caller.ability().ensure(Action::Assign, &Subject::Report(&report))?;
  let assignment = store
    .assign_to_team(id, body.team_id, caller.require()?)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(assignment)))
}

#[derive(Debug, Deserialize)]
pub struct AssignUserBody {
  pub user_id: Uuid,
}

/// `POST /reports/{id}/assign/user`
pub async fn assign_user<S: ReportStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<AssignUserBody>,
) -> Result<impl IntoResponse, ApiError> {
  let report = load(&*store, id).await?;
  caller.ability().ensure(Action::Assign, &Subject::Report(&report))?;
  let assignment = store
    .assign_to_user(id, body.user_id, caller.require()?)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(assignment)))
}

// ─── Accept ───────────────────────────────────────────────────────────────────

/// `POST /assignments/{id}/accept`
pub async fn accept<S: ReportStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Assignment>, ApiError> {
  let assignment = store
    .get_assignment(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("assignment {id} not found")))?;
  caller
    .ability()
    .ensure(Action::AcceptAssignment, &Subject::Assignment(&assignment))?;
  let accepted = store
    .accept_assignment(id, caller.require()?)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(accepted))
}

// ─── Forward ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ForwardBody {
  /// The department the client believes owns the report. Defaults to the
  /// one the caller was authorized against.
  pub from_department_id:   Option<Uuid>,
  pub target_department_id: Uuid,
  pub reason:               String,
}

/// `POST /reports/{id}/forward`
///
/// A stated source that no longer owns the report is rejected with 422 and
/// nothing is written.
pub async fn forward<S: ReportStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<ForwardBody>,
) -> Result<Json<Report>, ApiError> {
  let report = load(&*store, id).await?;
  caller.ability().ensure(Action::Forward, &Subject::Report(&report))?;
  let request = ForwardRequest {
    from_department_id:   body.from_department_id.unwrap_or(report.department_id),
    target_department_id: body.target_department_id,
    reason:               body.reason,
  };
  let report = store
    .forward(id, request, caller.require()?)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(report))
}
