//! The report status machine.
//!
//! Every function here takes the locked, current snapshot of a report and
//! returns a [`Transition`]: the report as it must be persisted plus exactly
//! one status-history row. Nothing is written on error, so a caller that
//! persists only `Ok` transitions inside its transaction gets all-or-nothing
//! behaviour for free.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  history::StatusHistoryEntry,
  principal::Principal,
  report::{NewReport, Report, ReportStatus, SubStatus},
  transition,
};

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`update_status`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
  pub new_status:       ReportStatus,
  pub rejection_reason: Option<String>,
  pub resolution_notes: Option<String>,
  /// Only meaningful when `new_status` is `IN_PROGRESS`; defaults to `NONE`.
  pub sub_status:       Option<SubStatus>,
  pub notes:            Option<String>,
}

impl StatusUpdate {
  /// A bare move to `new_status` with every optional field unset.
  pub fn to(new_status: ReportStatus) -> Self {
    Self {
      new_status,
      rejection_reason: None,
      resolution_notes: None,
      sub_status: None,
      notes: None,
    }
  }
}

/// Input to [`submit_proof`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofSubmission {
  /// Identifiers issued by the media service for already-uploaded evidence.
  pub proof_media_ids:  Vec<i64>,
  pub resolution_notes: Option<String>,
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// What happens to the report's ACTIVE assignment alongside a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentEffect {
  Keep,
  /// The work is finished; mark the assignment COMPLETED.
  Complete,
  /// The work is abandoned; mark the assignment CANCELLED with this note.
  Cancel(String),
}

/// A validated status change, ready to persist.
#[derive(Debug, Clone)]
pub struct Transition {
  /// The report after the change.
  pub report:            Report,
  pub history:           StatusHistoryEntry,
  pub assignment_effect: AssignmentEffect,
}

impl Transition {
  /// Build a transition from `before` to `after`.
  ///
  /// `after` must already carry its new status and sub-status. Closure
  /// fields are cleared when a closed report becomes active again.
  pub(crate) fn between(
    before: &Report,
    mut after: Report,
    actor_user_id: Uuid,
    notes: Option<String>,
    now: DateTime<Utc>,
  ) -> Self {
    if before.status.is_closed() && !after.status.is_closed() {
      after.resolved_at = None;
      after.closed_by_user_id = None;
    }
    after.updated_at = now;

    let history = StatusHistoryEntry {
      history_id: Uuid::new_v4(),
      report_id: before.report_id,
      previous_status: Some(before.status),
      new_status: after.status,
      previous_sub_status: before.sub_status,
      new_sub_status: after.sub_status,
      actor_user_id,
      notes,
      recorded_at: now,
    };

    Self {
      report: after,
      history,
      assignment_effect: AssignmentEffect::Keep,
    }
  }

  pub(crate) fn with_effect(mut self, effect: AssignmentEffect) -> Self {
    self.assignment_effect = effect;
    self
  }
}

// ─── Text helpers ────────────────────────────────────────────────────────────

pub(crate) fn required_text(field: &str, value: Option<&str>) -> Result<String> {
  optional_text(value).ok_or_else(|| Error::validation(format!("{field} is required")))
}

pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
  value
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_owned)
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// Build a new OPEN report owned by `principal`, with its initial history row.
pub fn open(
  input: NewReport,
  principal: &Principal,
  now: DateTime<Utc>,
) -> Result<(Report, StatusHistoryEntry)> {
  let report = Report {
    report_id:         Uuid::new_v4(),
    title:             required_text("title", Some(&input.title))?,
    description:       required_text("description", Some(&input.description))?,
    category:          optional_text(input.category.as_deref()),
    status:            ReportStatus::Open,
    sub_status:        SubStatus::None,
    department_id:     input.department_id,
    owner_user_id:     principal.user_id,
    closed_by_user_id: None,
    resolution_notes:  None,
    rejection_reason:  None,
    resolved_at:       None,
    support_count:     0,
    created_at:        now,
    updated_at:        now,
  };

  let history = StatusHistoryEntry {
    history_id:          Uuid::new_v4(),
    report_id:           report.report_id,
    previous_status:     None,
    new_status:          ReportStatus::Open,
    previous_sub_status: SubStatus::None,
    new_sub_status:      SubStatus::None,
    actor_user_id:       principal.user_id,
    notes:               None,
    recorded_at:         now,
  };

  Ok((report, history))
}

/// General-purpose status change, checked against the role transition table.
pub fn update_status(
  report: &Report,
  update: &StatusUpdate,
  principal: &Principal,
  now: DateTime<Utc>,
) -> Result<Transition> {
  let from = report.status;
  let to = update.new_status;

  if !transition::is_permitted(&principal.roles, from, to) {
    let allowed = transition::targets_for(principal, from)
      .iter()
      .map(ToString::to_string)
      .collect::<Vec<_>>();
    return Err(Error::validation(format!(
      "cannot move report from {from} to {to} (allowed: [{}])",
      allowed.join(", ")
    )));
  }

  let sub_status = match (to, update.sub_status) {
    (_, Some(SubStatus::Forwarded)) => {
      return Err(Error::validation("sub-status FORWARDED cannot be assigned"));
    }
    (ReportStatus::InProgress, requested) => requested.unwrap_or_default(),
    (_, None | Some(SubStatus::None)) => SubStatus::None,
    (_, Some(other)) => {
      return Err(Error::validation(format!(
        "sub-status {other} is only valid while IN_PROGRESS"
      )));
    }
  };

  let mut after = report.clone();
  after.status = to;
  after.sub_status = sub_status;

  let effect = match to {
    ReportStatus::Rejected => {
      after.rejection_reason = Some(required_text(
        "rejection_reason",
        update.rejection_reason.as_deref(),
      )?);
      after.closed_by_user_id = Some(principal.user_id);
      AssignmentEffect::Cancel("report rejected".to_owned())
    }
    ReportStatus::Done => {
      after.resolved_at = Some(now);
      after.closed_by_user_id = Some(principal.user_id);
      if let Some(notes) = optional_text(update.resolution_notes.as_deref()) {
        after.resolution_notes = Some(notes);
      }
      AssignmentEffect::Complete
    }
    ReportStatus::Cancelled => {
      after.closed_by_user_id = Some(principal.user_id);
      AssignmentEffect::Cancel("report cancelled".to_owned())
    }
    _ => AssignmentEffect::Keep,
  };

  let notes = optional_text(update.notes.as_deref());
  Ok(Transition::between(report, after, principal.user_id, notes, now).with_effect(effect))
}

/// Submit finished work for supervisor approval. The status stays
/// IN_PROGRESS; the sub-status moves from NONE to PENDING_APPROVAL.
pub fn submit_proof(
  report: &Report,
  proof: &ProofSubmission,
  principal: &Principal,
  now: DateTime<Utc>,
) -> Result<Transition> {
  if report.status != ReportStatus::InProgress {
    return Err(Error::validation(format!(
      "work can only be completed while IN_PROGRESS (report is {})",
      report.status
    )));
  }
  if report.sub_status != SubStatus::None {
    return Err(Error::validation(format!(
      "report is already {}",
      report.sub_status
    )));
  }
  if proof.proof_media_ids.is_empty() {
    return Err(Error::validation("at least one proof media item is required"));
  }
  for (i, id) in proof.proof_media_ids.iter().enumerate() {
    if *id <= 0 {
      return Err(Error::validation(format!("invalid media id {id}")));
    }
    if proof.proof_media_ids[..i].contains(id) {
      return Err(Error::validation(format!("duplicate media id {id}")));
    }
  }

  let mut after = report.clone();
  after.sub_status = SubStatus::PendingApproval;
  if let Some(notes) = optional_text(proof.resolution_notes.as_deref()) {
    after.resolution_notes = Some(notes);
  }

  let notes = format!(
    "work submitted for approval with {} proof item(s)",
    proof.proof_media_ids.len()
  );
  Ok(Transition::between(report, after, principal.user_id, Some(notes), now))
}

/// Accept submitted work and close the report as DONE.
pub fn approve(
  report: &Report,
  notes: Option<&str>,
  principal: &Principal,
  now: DateTime<Utc>,
) -> Result<Transition> {
  if !report.is_pending_approval() {
    return Err(Error::validation(format!(
      "only reports IN_PROGRESS and PENDING_APPROVAL can be approved (report is {}/{})",
      report.status, report.sub_status
    )));
  }

  let mut after = report.clone();
  after.status = ReportStatus::Done;
  after.sub_status = SubStatus::None;
  after.resolved_at = Some(now);
  after.closed_by_user_id = Some(principal.user_id);

  Ok(
    Transition::between(report, after, principal.user_id, optional_text(notes), now)
      .with_effect(AssignmentEffect::Complete),
  )
}

/// Reject a report.
///
/// Submitted work bounces back to the assignee (IN_PROGRESS/NONE); an OPEN
/// report is closed as REJECTED. Any other state is invalid.
pub fn reject(
  report: &Report,
  reason: &str,
  principal: &Principal,
  now: DateTime<Utc>,
) -> Result<Transition> {
  let reason = required_text("reason", Some(reason))?;
  let mut after = report.clone();
  after.rejection_reason = Some(reason.clone());

  if report.is_pending_approval() {
    after.sub_status = SubStatus::None;
    return Ok(Transition::between(report, after, principal.user_id, Some(reason), now));
  }

  if report.status == ReportStatus::Open {
    after.status = ReportStatus::Rejected;
    after.sub_status = SubStatus::None;
    after.closed_by_user_id = Some(principal.user_id);
    return Ok(
      Transition::between(report, after, principal.user_id, Some(reason), now)
        .with_effect(AssignmentEffect::Cancel("report rejected".to_owned())),
    );
  }

  Err(Error::validation(format!(
    "cannot reject a report in {}/{}",
    report.status, report.sub_status
  )))
}
