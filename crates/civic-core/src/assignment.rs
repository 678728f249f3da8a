//! Assignments and the rules for creating and accepting them.
//!
//! A report has at most one ACTIVE assignment. New assignments always
//! supersede the current one inside the same transaction; the storage layer
//! additionally enforces the invariant with a partial uniqueness index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{
  Error, Result,
  directory::{Team, TeamStatus, User},
  lifecycle::Transition,
  principal::Principal,
  report::{Report, ReportStatus, SubStatus},
};

// ─── Types ───────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AssigneeType {
  User,
  Team,
}

/// Who an assignment points at. Exactly one of the two ids exists by
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "assignee_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Assignee {
  User { assignee_user_id: Uuid },
  Team { assignee_team_id: Uuid },
}

impl Assignee {
  pub fn kind(&self) -> AssigneeType {
    match self {
      Self::User { .. } => AssigneeType::User,
      Self::Team { .. } => AssigneeType::Team,
    }
  }

  pub fn user_id(&self) -> Option<Uuid> {
    match self {
      Self::User { assignee_user_id } => Some(*assignee_user_id),
      Self::Team { .. } => None,
    }
  }

  pub fn team_id(&self) -> Option<Uuid> {
    match self {
      Self::Team { assignee_team_id } => Some(*assignee_team_id),
      Self::User { .. } => None,
    }
  }

  /// Rebuild from the two nullable storage columns. Fails unless exactly the
  /// column matching `kind` is set.
  pub fn from_columns(
    kind: AssigneeType,
    user_id: Option<Uuid>,
    team_id: Option<Uuid>,
  ) -> Result<Self> {
    match (kind, user_id, team_id) {
      (AssigneeType::User, Some(assignee_user_id), None) => Ok(Self::User { assignee_user_id }),
      (AssigneeType::Team, None, Some(assignee_team_id)) => Ok(Self::Team { assignee_team_id }),
      _ => Err(Error::validation(format!(
        "malformed {kind} assignee: user={user_id:?} team={team_id:?}"
      ))),
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
  Active,
  Completed,
  Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
  pub assignment_id:       Uuid,
  pub report_id:           Uuid,
  #[serde(flatten)]
  pub assignee:            Assignee,
  pub assigned_by_user_id: Uuid,
  pub status:              AssignmentStatus,
  pub assigned_at:         DateTime<Utc>,
  pub accepted_at:         Option<DateTime<Utc>>,
  pub completed_at:        Option<DateTime<Utc>>,
  pub cancelled_at:        Option<DateTime<Utc>>,
  pub notes:               Option<String>,
}

impl Assignment {
  pub fn is_active(&self) -> bool { self.status == AssignmentStatus::Active }

  /// This assignment, cancelled at `now` with an explanatory note.
  pub fn cancelled(&self, note: &str, now: DateTime<Utc>) -> Self {
    Self {
      status: AssignmentStatus::Cancelled,
      cancelled_at: Some(now),
      notes: Some(note.to_owned()),
      ..self.clone()
    }
  }

  /// This assignment, completed at `now`.
  pub fn completed(&self, now: DateTime<Utc>) -> Self {
    Self {
      status: AssignmentStatus::Completed,
      completed_at: Some(now),
      ..self.clone()
    }
  }
}

// ─── Plans ───────────────────────────────────────────────────────────────────

/// Everything an assignment writes, in the order it must be written.
#[derive(Debug, Clone)]
pub struct AssignmentPlan {
  /// The previously ACTIVE assignment, now cancelled. Persist first.
  pub superseded: Option<Assignment>,
  pub assignment: Assignment,
  /// Status advance caused by the assignment, if any.
  pub transition: Option<Transition>,
}

fn ensure_assignable(report: &Report) -> Result<()> {
  if report.status.is_closed() {
    return Err(Error::validation(format!(
      "cannot assign a {} report",
      report.status
    )));
  }
  Ok(())
}

fn new_assignment(
  report: &Report,
  assignee: Assignee,
  principal: &Principal,
  accepted_at: Option<DateTime<Utc>>,
  now: DateTime<Utc>,
) -> Assignment {
  Assignment {
    assignment_id: Uuid::new_v4(),
    report_id: report.report_id,
    assignee,
    assigned_by_user_id: principal.user_id,
    status: AssignmentStatus::Active,
    assigned_at: now,
    accepted_at,
    completed_at: None,
    cancelled_at: None,
    notes: None,
  }
}

/// Assign `report` to `team`. Team assignments are accepted on creation and
/// move an OPEN report into review.
pub fn plan_team_assignment(
  report: &Report,
  team: &Team,
  current: Option<&Assignment>,
  principal: &Principal,
  now: DateTime<Utc>,
) -> Result<AssignmentPlan> {
  ensure_assignable(report)?;
  if team.status != TeamStatus::Available {
    return Err(Error::validation(format!(
      "team {} is {}",
      team.team_id, team.status
    )));
  }
  if team.department_id != report.department_id {
    return Err(Error::validation(format!(
      "team {} does not belong to the report's department",
      team.team_id
    )));
  }

  let assignee = Assignee::Team { assignee_team_id: team.team_id };
  let assignment = new_assignment(report, assignee, principal, Some(now), now);

  let transition = (report.status == ReportStatus::Open).then(|| {
    let mut after = report.clone();
    after.status = ReportStatus::InReview;
    after.sub_status = SubStatus::None;
    let notes = format!("assigned to team {}", team.name);
    Transition::between(report, after, principal.user_id, Some(notes), now)
  });

  Ok(AssignmentPlan {
    superseded: current.map(|a| a.cancelled("superseded by a new assignment", now)),
    assignment,
    transition,
  })
}

/// Assign `report` to an individual. Personal assignments are not
/// auto-accepted but start the work immediately: OPEN and IN_REVIEW reports
/// go straight to IN_PROGRESS.
pub fn plan_user_assignment(
  report: &Report,
  user: &User,
  current: Option<&Assignment>,
  principal: &Principal,
  now: DateTime<Utc>,
) -> Result<AssignmentPlan> {
  ensure_assignable(report)?;
  if user.department_id != Some(report.department_id) {
    return Err(Error::validation(format!(
      "user {} does not belong to the report's department",
      user.user_id
    )));
  }
  if !user.is_assignable() {
    return Err(Error::validation(format!(
      "user {} holds no assignable role",
      user.user_id
    )));
  }

  let assignee = Assignee::User { assignee_user_id: user.user_id };
  let assignment = new_assignment(report, assignee, principal, None, now);

  let transition = matches!(report.status, ReportStatus::Open | ReportStatus::InReview).then(|| {
    let mut after = report.clone();
    after.status = ReportStatus::InProgress;
    after.sub_status = SubStatus::None;
    let notes = format!("assigned to {}", user.display_name);
    Transition::between(report, after, principal.user_id, Some(notes), now)
  });

  Ok(AssignmentPlan {
    superseded: current.map(|a| a.cancelled("superseded by a new assignment", now)),
    assignment,
    transition,
  })
}

/// The assigned user accepts a personal assignment.
pub fn accept(
  assignment: &Assignment,
  principal: &Principal,
  now: DateTime<Utc>,
) -> Result<Assignment> {
  let Some(user_id) = assignment.assignee.user_id() else {
    return Err(Error::validation("team assignments are accepted on creation"));
  };
  if user_id != principal.user_id {
    return Err(Error::forbidden("only the assignee can accept an assignment"));
  }
  if !assignment.is_active() {
    return Err(Error::validation(format!(
      "assignment is {}",
      assignment.status
    )));
  }
  if assignment.accepted_at.is_some() {
    return Err(Error::validation("assignment is already accepted"));
  }

  Ok(Assignment {
    accepted_at: Some(now),
    ..assignment.clone()
  })
}
