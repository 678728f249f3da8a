//! Moving a report between departments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  assignment::Assignment,
  directory::Department,
  history::{DepartmentHistoryEntry, StatusHistoryEntry},
  lifecycle::{Transition, required_text},
  principal::Principal,
  report::{Report, ReportStatus, SubStatus},
};

/// Input to [`plan_forward`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardRequest {
  /// The department the caller believes currently owns the report.
  pub from_department_id:   Uuid,
  pub target_department_id: Uuid,
  pub reason:               String,
}

/// Everything a forward writes.
#[derive(Debug, Clone)]
pub struct ForwardPlan {
  /// The report after the move.
  pub report:             Report,
  pub department_history: DepartmentHistoryEntry,
  /// Present when the forced move to IN_REVIEW changed the status.
  pub status_history:     Option<StatusHistoryEntry>,
  /// The old department's ACTIVE assignment, now cancelled.
  pub cancelled:          Option<Assignment>,
}

/// Forward `report` to `target`. The report always lands IN_REVIEW in the
/// new department, and any ACTIVE assignment is cancelled.
pub fn plan_forward(
  report: &Report,
  request: &ForwardRequest,
  target: &Department,
  active: Option<&Assignment>,
  principal: &Principal,
  now: DateTime<Utc>,
) -> Result<ForwardPlan> {
  if request.from_department_id != report.department_id {
    return Err(Error::validation(
      "report is no longer in the stated source department",
    ));
  }
  if request.target_department_id == report.department_id {
    return Err(Error::validation(
      "target department must differ from the current department",
    ));
  }
  if target.department_id != request.target_department_id {
    return Err(Error::validation("target department mismatch"));
  }
  if !target.is_active {
    return Err(Error::validation(format!(
      "department {} is not active",
      target.name
    )));
  }
  let reason = required_text("reason", Some(&request.reason))?;

  let mut after = report.clone();
  after.department_id = target.department_id;
  after.status = ReportStatus::InReview;
  after.sub_status = SubStatus::None;

  let status_changed =
    report.status != ReportStatus::InReview || report.sub_status != SubStatus::None;
  let notes = format!("forwarded to {}", target.name);
  let transition = Transition::between(report, after, principal.user_id, Some(notes), now);

  let department_history = DepartmentHistoryEntry {
    history_id:             Uuid::new_v4(),
    report_id:              report.report_id,
    previous_department_id: report.department_id,
    new_department_id:      target.department_id,
    actor_user_id:          principal.user_id,
    reason,
    recorded_at:            now,
  };

  let cancelled =
    active.map(|a| a.cancelled(&format!("report forwarded to {}", target.name), now));

  Ok(ForwardPlan {
    report: transition.report,
    department_history,
    status_history: status_changed.then_some(transition.history),
    cancelled,
  })
}
