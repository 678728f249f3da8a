//! Synchronous statements run on the database thread.
//!
//! Everything here takes a plain `&Connection`; mutating callers pass the
//! open `BEGIN IMMEDIATE` transaction, which derefs to one.

use chrono::{DateTime, Utc};
use civic_core::{
  Entity,
  assignment::Assignment,
  directory::{Department, Team, User},
  history::{DepartmentHistoryEntry, StatusHistoryEntry},
  lifecycle::{AssignmentEffect, Transition},
  report::{Report, ReportStatus},
  store::ReportQuery,
  support::ReportSupport,
};
use rusqlite::{Connection, OptionalExtension as _, params};
use tracing::warn;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    ASSIGNMENT_COLUMNS, DEPARTMENT_HISTORY_COLUMNS, REPORT_COLUMNS, RawAssignment,
    RawDepartment, RawDepartmentHistory, RawReport, RawStatusHistory, RawSupport, RawTeam,
    RawUser, STATUS_HISTORY_COLUMNS, encode_dt, encode_enum, encode_roles,
    encode_uuid,
  },
};

/// Media link context for evidence attached by `complete_work_with_proof`.
pub const RESOLUTION_PROOF: &str = "RESOLUTION_PROOF";

const DEFAULT_LIST_LIMIT: usize = 100;

fn not_found(entity: Entity, id: Uuid) -> Error { civic_core::Error::NotFound(entity, id).into() }

fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

// ─── Directory ───────────────────────────────────────────────────────────────

pub fn insert_department(conn: &Connection, d: &Department) -> Result<()> {
  conn.execute(
    "INSERT INTO departments (department_id, name, is_active) VALUES (?1, ?2, ?3)",
    params![encode_uuid(d.department_id), d.name, d.is_active],
  )?;
  Ok(())
}

pub fn find_department(conn: &Connection, id: Uuid) -> Result<Option<Department>> {
  conn
    .query_row(
      "SELECT department_id, name, is_active FROM departments WHERE department_id = ?1",
      params![encode_uuid(id)],
      RawDepartment::from_row,
    )
    .optional()?
    .map(RawDepartment::into_department)
    .transpose()
}

pub fn require_department(conn: &Connection, id: Uuid) -> Result<Department> {
  find_department(conn, id)?.ok_or_else(|| not_found(Entity::Department, id))
}

pub fn insert_team(conn: &Connection, t: &Team) -> Result<()> {
  conn.execute(
    "INSERT INTO teams (team_id, name, department_id, status) VALUES (?1, ?2, ?3, ?4)",
    params![
      encode_uuid(t.team_id),
      t.name,
      encode_uuid(t.department_id),
      encode_enum(t.status),
    ],
  )?;
  Ok(())
}

pub fn find_team(conn: &Connection, id: Uuid) -> Result<Option<Team>> {
  conn
    .query_row(
      "SELECT team_id, name, department_id, status FROM teams WHERE team_id = ?1",
      params![encode_uuid(id)],
      RawTeam::from_row,
    )
    .optional()?
    .map(RawTeam::into_team)
    .transpose()
}

pub fn require_team(conn: &Connection, id: Uuid) -> Result<Team> {
  find_team(conn, id)?.ok_or_else(|| not_found(Entity::Team, id))
}

pub fn insert_user(conn: &Connection, u: &User) -> Result<()> {
  conn.execute(
    "INSERT INTO users (user_id, display_name, department_id, roles) VALUES (?1, ?2, ?3, ?4)",
    params![
      encode_uuid(u.user_id),
      u.display_name,
      u.department_id.map(encode_uuid),
      encode_roles(&u.roles)?,
    ],
  )?;
  Ok(())
}

pub fn find_user(conn: &Connection, id: Uuid) -> Result<Option<User>> {
  conn
    .query_row(
      "SELECT user_id, display_name, department_id, roles FROM users WHERE user_id = ?1",
      params![encode_uuid(id)],
      RawUser::from_row,
    )
    .optional()?
    .map(RawUser::into_user)
    .transpose()
}

pub fn require_user(conn: &Connection, id: Uuid) -> Result<User> {
  find_user(conn, id)?.ok_or_else(|| not_found(Entity::User, id))
}

// ─── Reports ─────────────────────────────────────────────────────────────────

pub fn find_report(conn: &Connection, id: Uuid) -> Result<Option<Report>> {
  conn
    .query_row(
      &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE report_id = ?1"),
      params![encode_uuid(id)],
      RawReport::from_row,
    )
    .optional()?
    .map(RawReport::into_report)
    .transpose()
}

/// Read the report inside a write transaction. The transaction already holds
/// the database write lock, so the snapshot stays current until commit.
pub fn locked_report(conn: &Connection, id: Uuid) -> Result<Report> {
  find_report(conn, id)?.ok_or_else(|| not_found(Entity::Report, id))
}

pub fn insert_report(conn: &Connection, r: &Report) -> Result<()> {
  conn.execute(
    &format!(
      "INSERT INTO reports ({REPORT_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
    ),
    params![
      encode_uuid(r.report_id),
      r.title,
      r.description,
      r.category,
      encode_enum(r.status),
      encode_enum(r.sub_status),
      encode_uuid(r.department_id),
      encode_uuid(r.owner_user_id),
      r.closed_by_user_id.map(encode_uuid),
      r.resolution_notes,
      r.rejection_reason,
      r.resolved_at.map(encode_dt),
      r.support_count,
      encode_dt(r.created_at),
      encode_dt(r.updated_at),
    ],
  )?;
  Ok(())
}

/// Persist the lifecycle fields of `r`. `support_count` belongs to the
/// support ledger and is never written from a snapshot.
pub fn save_report(conn: &Connection, r: &Report) -> Result<()> {
  conn.execute(
    "UPDATE reports SET
       status = ?2, sub_status = ?3, department_id = ?4, closed_by_user_id = ?5,
       resolution_notes = ?6, rejection_reason = ?7, resolved_at = ?8, updated_at = ?9
     WHERE report_id = ?1",
    params![
      encode_uuid(r.report_id),
      encode_enum(r.status),
      encode_enum(r.sub_status),
      encode_uuid(r.department_id),
      r.closed_by_user_id.map(encode_uuid),
      r.resolution_notes,
      r.rejection_reason,
      r.resolved_at.map(encode_dt),
      encode_dt(r.updated_at),
    ],
  )?;
  Ok(())
}

/// SQLite reads a negative LIMIT as "no limit", so saturate instead of
/// wrapping.
fn sql_count(n: usize) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

pub fn list_reports(conn: &Connection, query: &ReportQuery) -> Result<Vec<Report>> {
  let status = query.status.map(encode_enum::<ReportStatus>);
  let department = query.department_id.map(encode_uuid);
  let owner = query.owner_user_id.map(encode_uuid);
  let limit = sql_count(query.limit.unwrap_or(DEFAULT_LIST_LIMIT));
  let offset = sql_count(query.offset.unwrap_or(0));

  let mut stmt = conn.prepare(&format!(
    "SELECT {REPORT_COLUMNS} FROM reports
     WHERE (?1 IS NULL OR status = ?1)
       AND (?2 IS NULL OR department_id = ?2)
       AND (?3 IS NULL OR owner_user_id = ?3)
     ORDER BY rowid DESC
     LIMIT ?4 OFFSET ?5"
  ))?;
  let raws = stmt
    .query_map(
      params![status, department, owner, limit, offset],
      RawReport::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawReport::into_report).collect()
}

// ─── Audit trail ─────────────────────────────────────────────────────────────

pub fn insert_status_history(conn: &Connection, h: &StatusHistoryEntry) -> Result<()> {
  conn.execute(
    &format!(
      "INSERT INTO report_status_history ({STATUS_HISTORY_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
    ),
    params![
      encode_uuid(h.history_id),
      encode_uuid(h.report_id),
      h.previous_status.map(encode_enum::<ReportStatus>),
      encode_enum(h.new_status),
      encode_enum(h.previous_sub_status),
      encode_enum(h.new_sub_status),
      encode_uuid(h.actor_user_id),
      h.notes,
      encode_dt(h.recorded_at),
    ],
  )?;
  Ok(())
}

pub fn insert_department_history(conn: &Connection, h: &DepartmentHistoryEntry) -> Result<()> {
  conn.execute(
    &format!(
      "INSERT INTO report_department_history ({DEPARTMENT_HISTORY_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
    ),
    params![
      encode_uuid(h.history_id),
      encode_uuid(h.report_id),
      encode_uuid(h.previous_department_id),
      encode_uuid(h.new_department_id),
      encode_uuid(h.actor_user_id),
      h.reason,
      encode_dt(h.recorded_at),
    ],
  )?;
  Ok(())
}

pub fn list_status_history(conn: &Connection, report_id: Uuid) -> Result<Vec<StatusHistoryEntry>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {STATUS_HISTORY_COLUMNS} FROM report_status_history
     WHERE report_id = ?1 ORDER BY rowid"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(report_id)], RawStatusHistory::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawStatusHistory::into_entry).collect()
}

pub fn list_department_history(
  conn: &Connection,
  report_id: Uuid,
) -> Result<Vec<DepartmentHistoryEntry>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {DEPARTMENT_HISTORY_COLUMNS} FROM report_department_history
     WHERE report_id = ?1 ORDER BY rowid"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(report_id)], RawDepartmentHistory::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawDepartmentHistory::into_entry).collect()
}

// ─── Assignments ─────────────────────────────────────────────────────────────

pub fn find_assignment(conn: &Connection, id: Uuid) -> Result<Option<Assignment>> {
  conn
    .query_row(
      &format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE assignment_id = ?1"),
      params![encode_uuid(id)],
      RawAssignment::from_row,
    )
    .optional()?
    .map(RawAssignment::into_assignment)
    .transpose()
}

pub fn find_active_assignment(conn: &Connection, report_id: Uuid) -> Result<Option<Assignment>> {
  conn
    .query_row(
      &format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM assignments
         WHERE report_id = ?1 AND status = 'ACTIVE'"
      ),
      params![encode_uuid(report_id)],
      RawAssignment::from_row,
    )
    .optional()?
    .map(RawAssignment::into_assignment)
    .transpose()
}

pub fn list_assignments(conn: &Connection, report_id: Uuid) -> Result<Vec<Assignment>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE report_id = ?1 ORDER BY rowid"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(report_id)], RawAssignment::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawAssignment::into_assignment).collect()
}

/// Insert a new assignment. A second ACTIVE row for the same report trips the
/// partial unique index and surfaces as [`Error::ActiveAssignmentConflict`].
pub fn insert_assignment(conn: &Connection, a: &Assignment) -> Result<()> {
  let inserted = conn.execute(
    &format!(
      "INSERT INTO assignments ({ASSIGNMENT_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
    ),
    params![
      encode_uuid(a.assignment_id),
      encode_uuid(a.report_id),
      encode_enum(a.assignee.kind()),
      a.assignee.user_id().map(encode_uuid),
      a.assignee.team_id().map(encode_uuid),
      encode_uuid(a.assigned_by_user_id),
      encode_enum(a.status),
      encode_dt(a.assigned_at),
      a.accepted_at.map(encode_dt),
      a.completed_at.map(encode_dt),
      a.cancelled_at.map(encode_dt),
      a.notes,
    ],
  );

  match inserted {
    Ok(_) => Ok(()),
    Err(e) if is_unique_violation(&e) => {
      warn!(report_id = %a.report_id, "active assignment index rejected insert");
      Err(Error::ActiveAssignmentConflict(a.report_id))
    }
    Err(e) => Err(e.into()),
  }
}

/// Persist the mutable fields of an existing assignment.
pub fn save_assignment(conn: &Connection, a: &Assignment) -> Result<()> {
  conn.execute(
    "UPDATE assignments SET
       status = ?2, accepted_at = ?3, completed_at = ?4, cancelled_at = ?5, notes = ?6
     WHERE assignment_id = ?1",
    params![
      encode_uuid(a.assignment_id),
      encode_enum(a.status),
      a.accepted_at.map(encode_dt),
      a.completed_at.map(encode_dt),
      a.cancelled_at.map(encode_dt),
      a.notes,
    ],
  )?;
  Ok(())
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// Write a validated transition: the report, its history row and whatever
/// happens to the ACTIVE assignment.
pub fn apply_transition(conn: &Connection, t: &Transition) -> Result<()> {
  save_report(conn, &t.report)?;
  insert_status_history(conn, &t.history)?;

  let now = t.history.recorded_at;
  let closed = match &t.assignment_effect {
    AssignmentEffect::Keep => return Ok(()),
    AssignmentEffect::Complete => {
      find_active_assignment(conn, t.report.report_id)?.map(|a| a.completed(now))
    }
    AssignmentEffect::Cancel(note) => {
      find_active_assignment(conn, t.report.report_id)?.map(|a| a.cancelled(note, now))
    }
  };
  if let Some(a) = closed {
    save_assignment(conn, &a)?;
  }
  Ok(())
}

// ─── Support ledger ──────────────────────────────────────────────────────────

/// Returns true if a row was inserted.
pub fn insert_support(
  conn: &Connection,
  report_id: Uuid,
  user_id: Uuid,
  now: DateTime<Utc>,
) -> Result<bool> {
  let id = encode_uuid(report_id);
  let inserted = conn.execute(
    "INSERT OR IGNORE INTO report_supports (report_id, user_id, created_at)
     VALUES (?1, ?2, ?3)",
    params![id, encode_uuid(user_id), encode_dt(now)],
  )?;
  if inserted == 1 {
    conn.execute(
      "UPDATE reports SET support_count = support_count + 1 WHERE report_id = ?1",
      params![id],
    )?;
  }
  Ok(inserted == 1)
}

/// Returns true if a row was deleted.
pub fn delete_support(conn: &Connection, report_id: Uuid, user_id: Uuid) -> Result<bool> {
  let id = encode_uuid(report_id);
  let deleted = conn.execute(
    "DELETE FROM report_supports WHERE report_id = ?1 AND user_id = ?2",
    params![id, encode_uuid(user_id)],
  )?;
  if deleted == 1 {
    conn.execute(
      "UPDATE reports SET support_count = MAX(support_count - 1, 0) WHERE report_id = ?1",
      params![id],
    )?;
  }
  Ok(deleted == 1)
}

pub fn list_supports(conn: &Connection, report_id: Uuid) -> Result<Vec<ReportSupport>> {
  let mut stmt = conn.prepare(
    "SELECT report_id, user_id, created_at FROM report_supports
     WHERE report_id = ?1 ORDER BY rowid",
  )?;
  let raws = stmt
    .query_map(params![encode_uuid(report_id)], RawSupport::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawSupport::into_support).collect()
}

// ─── Media ───────────────────────────────────────────────────────────────────

pub fn link_media(
  conn: &Connection,
  report_id: Uuid,
  media_ids: &[i64],
  context: &str,
  now: DateTime<Utc>,
) -> Result<()> {
  let mut stmt = conn.prepare(
    "INSERT OR IGNORE INTO report_media (report_id, media_id, context, created_at)
     VALUES (?1, ?2, ?3, ?4)",
  )?;
  let id = encode_uuid(report_id);
  let at = encode_dt(now);
  for media_id in media_ids {
    stmt.execute(params![id, media_id, context, at])?;
  }
  Ok(())
}

pub fn list_media(conn: &Connection, report_id: Uuid, context: &str) -> Result<Vec<i64>> {
  let mut stmt = conn.prepare(
    "SELECT media_id FROM report_media
     WHERE report_id = ?1 AND context = ?2 ORDER BY rowid",
  )?;
  Ok(
    stmt
      .query_map(params![encode_uuid(report_id), context], |row| row.get(0))?
      .collect::<rusqlite::Result<Vec<_>>>()?,
  )
}
