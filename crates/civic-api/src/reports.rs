//! Handlers for report intake and reads.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/reports` | Body: [`NewReport`]; returns 201 |
//! | `GET`  | `/reports` | Optional `?status`, `department_id`, `owner_user_id`, `limit`, `offset` |
//! | `GET`  | `/reports/{id}` | 404 if missing or not visible to an anonymous caller |
//! | `GET`  | `/reports/{id}/history` | Status history, oldest first |
//! | `GET`  | `/reports/{id}/departments` | Department history, oldest first |
//! | `GET`  | `/reports/{id}/assignments` | All assignments, oldest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use civic_core::{
  ability::{Action, Subject, SubjectType},
  assignment::Assignment,
  history::{DepartmentHistoryEntry, StatusHistoryEntry},
  report::{NewReport, Report, ReportStatus},
  store::{ReportQuery, ReportStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{caller::Caller, error::ApiError};

/// Fetch a report or fail with 404.
pub(crate) async fn load<S: ReportStore>(store: &S, id: Uuid) -> Result<Report, ApiError> {
  store
    .get_report(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("report {id} not found")))
}

/// Fetch a report the caller may read.
///
/// Anonymous callers get 404 instead of 403 so hidden reports do not leak
/// their existence.
pub(crate) async fn load_readable<S: ReportStore>(
  store: &S,
  caller: &Caller,
  id: Uuid,
) -> Result<Report, ApiError> {
  let report = load(store, id).await?;
  let ability = caller.ability();
  if caller.is_anonymous() && ability.cannot(Action::Read, &Subject::Report(&report)) {
    return Err(ApiError::NotFound(format!("report {id} not found")));
  }
  ability.ensure(Action::Read, &Subject::Report(&report))?;
  Ok(report)
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /reports`
pub async fn create<S: ReportStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Json(body): Json<NewReport>,
) -> Result<impl IntoResponse, ApiError> {
  caller
    .ability()
    .ensure(Action::Create, &Subject::Type(SubjectType::Report))?;
  let report = store
    .create_report(body, caller.require()?)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(report)))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// Page size when the caller gives no `limit`.
pub const DEFAULT_LIMIT: usize = 100;
/// Largest page a caller may ask for.
pub const MAX_LIMIT: usize = 500;
/// Rows fetched from the store per round while filling a page.
const SCAN_BATCH: usize = 200;

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status:        Option<ReportStatus>,
  pub department_id: Option<Uuid>,
  pub owner_user_id: Option<Uuid>,
  pub limit:         Option<usize>,
  pub offset:        Option<usize>,
}

impl From<&ListParams> for ReportQuery {
  fn from(p: &ListParams) -> Self {
    ReportQuery {
      status:        p.status,
      department_id: p.department_id,
      owner_user_id: p.owner_user_id,
      limit:         None,
      offset:        None,
    }
  }
}

/// `GET /reports`: only the reports the caller may read.
///
/// `limit` and `offset` count readable reports, so the store is scanned in
/// batches and filtered before the page is cut.
pub async fn list<S: ReportStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Report>>, ApiError> {
  let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
  let mut skip = params.offset.unwrap_or(0);
  let ability = caller.ability();

  let mut query = ReportQuery::from(&params);
  query.limit = Some(SCAN_BATCH);
  let mut scanned = 0;
  let mut page = Vec::with_capacity(limit.min(SCAN_BATCH));

  while page.len() < limit {
    query.offset = Some(scanned);
    let batch = store.list_reports(&query).await.map_err(ApiError::store)?;
    let fetched = batch.len();
    scanned += fetched;

    for report in batch {
      if ability.cannot(Action::Read, &Subject::Report(&report)) {
        continue;
      }
      if skip > 0 {
        skip -= 1;
        continue;
      }
      page.push(report);
      if page.len() == limit {
        break;
      }
    }
    if fetched < SCAN_BATCH {
      break;
    }
  }
  Ok(Json(page))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /reports/{id}`
pub async fn get_one<S: ReportStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Report>, ApiError> {
  Ok(Json(load_readable(&*store, &caller, id).await?))
}

// ─── Audit trail ──────────────────────────────────────────────────────────────

/// `GET /reports/{id}/history`
pub async fn history<S: ReportStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<StatusHistoryEntry>>, ApiError> {
  load_readable(&*store, &caller, id).await?;
  let rows = store.status_history(id).await.map_err(ApiError::store)?;
  Ok(Json(rows))
}

/// `GET /reports/{id}/departments`
pub async fn departments<S: ReportStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<DepartmentHistoryEntry>>, ApiError> {
  load_readable(&*store, &caller, id).await?;
  let rows = store.department_history(id).await.map_err(ApiError::store)?;
  Ok(Json(rows))
}

/// `GET /reports/{id}/assignments`
pub async fn assignments<S: ReportStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Assignment>>, ApiError> {
  load_readable(&*store, &caller, id).await?;
  let rows = store.assignments(id).await.map_err(ApiError::store)?;
  Ok(Json(rows))
}
