//! Handlers for the support ledger.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `PUT`    | `/reports/{id}/support` | Idempotent; 403 for the owner |
//! | `DELETE` | `/reports/{id}/support` | Idempotent |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use civic_core::{
  ability::{Action, Subject},
  store::ReportStore,
  support::SupportOutcome,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{caller::Caller, error::ApiError, reports::load};

#[derive(Debug, Serialize)]
pub struct SupportResponse {
  pub outcome:       SupportOutcome,
  pub support_count: u32,
}

async fn respond<S: ReportStore>(
  store: &S,
  id: Uuid,
  outcome: SupportOutcome,
) -> Result<Json<SupportResponse>, ApiError> {
  let report = load(store, id).await?;
  Ok(Json(SupportResponse {
    outcome,
    support_count: report.support_count,
  }))
}

/// `PUT /reports/{id}/support`
pub async fn add<S: ReportStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<SupportResponse>, ApiError> {
  let report = load(&*store, id).await?;
  caller.ability().ensure(Action::Support, &Subject::Report(&report))?;
  let outcome = store
    .add_support(id, caller.require()?)
    .await
    .map_err(ApiError::store)?;
  respond(&*store, id, outcome).await
}

/// `DELETE /reports/{id}/support`
pub async fn remove<S: ReportStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<SupportResponse>, ApiError> {
  let report = load(&*store, id).await?;
  caller.ability().ensure(Action::Unsupport, &Subject::Report(&report))?;
  let outcome = store
    .remove_support(id, caller.require()?)
    .await
    .map_err(ApiError::store)?;
  respond(&*store, id, outcome).await
}
