//! Handlers that move a report through its status machine.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/reports/{id}/status` | Body: [`StatusUpdate`] |
//! | `POST` | `/reports/{id}/proof` | Body: [`ProofSubmission`] |
//! | `POST` | `/reports/{id}/approve` | Body: `{"notes":"..."}` (optional) |
//! | `POST` | `/reports/{id}/reject` | Body: `{"reason":"..."}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use civic_core::{
  ability::{Ability, Action, Subject},
  lifecycle::{ProofSubmission, StatusUpdate},
  principal::Principal,
  report::{Report, ReportStatus},
  store::ReportStore,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::{caller::Caller, error::ApiError, reports::load};

/// The specific action a status change amounts to. Any caller holding it,
/// or the general `Update` action, may attempt the change; the transition
/// table then decides whether the move itself is legal.
pub fn implied_action(report: &Report, to: ReportStatus, principal: Option<&Principal>) -> Action {
  use ReportStatus::*;

  let owned = principal.is_some_and(|p| report.is_owned_by(p.user_id));
  match (report.status, to) {
    (Open, Cancelled) if owned => Action::Cancel,
    (InReview, InProgress) => Action::StartWork,
    (InProgress, Done) => Action::CompleteWork,
    (_, Rejected) => Action::Reject,
    (from, _) if from.is_closed() => Action::Reopen,
    _ => Action::Update,
  }
}

fn ensure_status_change(ability: &Ability, report: &Report, to: ReportStatus) -> Result<(), ApiError> {
  let action = implied_action(report, to, ability.principal());
  let subject = Subject::Report(report);
  if ability.can(action, &subject) || ability.can(Action::Update, &subject) {
    return Ok(());
  }
  warn!(report_id = %report.report_id, %action, %to, "status change denied");
  Err(civic_core::Error::forbidden(format!("not allowed to {action} this report")).into())
}

/// `POST /reports/{id}/status`
pub async fn update_status<S: ReportStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusUpdate>,
) -> Result<Json<Report>, ApiError> {
  let report = load(&*store, id).await?;
  ensure_status_change(&caller.ability(), &report, body.new_status)?;
  let report = store
    .update_status(id, body, caller.require()?)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(report))
}

/// `POST /reports/{id}/proof`
pub async fn submit_proof<S: ReportStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<ProofSubmission>,
) -> Result<Json<Report>, ApiError> {
  let report = load(&*store, id).await?;
  caller
    .ability()
    .ensure(Action::CompleteWork, &Subject::Report(&report))?;
  let report = store
    .complete_work_with_proof(id, body, caller.require()?)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(report))
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveBody {
  pub notes: Option<String>,
}

/// `POST /reports/{id}/approve`
pub async fn approve<S: ReportStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<ApproveBody>,
) -> Result<Json<Report>, ApiError> {
  let report = load(&*store, id).await?;
  caller.ability().ensure(Action::Approve, &Subject::Report(&report))?;
  let report = store
    .approve_report(id, body.notes, caller.require()?)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
  pub reason: String,
}

/// `POST /reports/{id}/reject`
pub async fn reject<S: ReportStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<RejectBody>,
) -> Result<Json<Report>, ApiError> {
  let report = load(&*store, id).await?;
  caller.ability().ensure(Action::Reject, &Subject::Report(&report))?;
  let report = store
    .reject_report(id, body.reason, caller.require()?)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(report))
}
