//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Enums are stored under
//! their SCREAMING_SNAKE_CASE names (the same strings serde uses). UUIDs are
//! stored as hyphenated lowercase strings. Role sets are compact JSON.

use std::{collections::BTreeSet, str::FromStr};

use chrono::{DateTime, Utc};
use civic_core::{
  assignment::{Assignee, Assignment},
  directory::{Department, Team, User},
  history::{DepartmentHistoryEntry, StatusHistoryEntry},
  principal::Role,
  report::Report,
  support::ReportSupport,
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Enums ───────────────────────────────────────────────────────────────────

/// The stored name of a `strum`-derived enum.
pub fn encode_enum<T: Into<&'static str>>(value: T) -> &'static str { value.into() }

pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::Decode {
    column,
    value: s.to_owned(),
  })
}

// ─── Roles ───────────────────────────────────────────────────────────────────

pub fn encode_roles(roles: &BTreeSet<Role>) -> Result<String> {
  Ok(serde_json::to_string(roles)?)
}

pub fn decode_roles(s: &str) -> Result<BTreeSet<Role>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

pub const REPORT_COLUMNS: &str = "report_id, title, description, category, status, sub_status,
   department_id, owner_user_id, closed_by_user_id, resolution_notes,
   rejection_reason, resolved_at, support_count, created_at, updated_at";

/// Raw strings read directly from a `reports` row.
pub struct RawReport {
  pub report_id:         String,
  pub title:             String,
  pub description:       String,
  pub category:          Option<String>,
  pub status:            String,
  pub sub_status:        String,
  pub department_id:     String,
  pub owner_user_id:     String,
  pub closed_by_user_id: Option<String>,
  pub resolution_notes:  Option<String>,
  pub rejection_reason:  Option<String>,
  pub resolved_at:       Option<String>,
  pub support_count:     i64,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawReport {
  /// Read a row selected with [`REPORT_COLUMNS`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      report_id:         row.get(0)?,
      title:             row.get(1)?,
      description:       row.get(2)?,
      category:          row.get(3)?,
      status:            row.get(4)?,
      sub_status:        row.get(5)?,
      department_id:     row.get(6)?,
      owner_user_id:     row.get(7)?,
      closed_by_user_id: row.get(8)?,
      resolution_notes:  row.get(9)?,
      rejection_reason:  row.get(10)?,
      resolved_at:       row.get(11)?,
      support_count:     row.get(12)?,
      created_at:        row.get(13)?,
      updated_at:        row.get(14)?,
    })
  }

  pub fn into_report(self) -> Result<Report> {
    Ok(Report {
      report_id:         decode_uuid(&self.report_id)?,
      title:             self.title,
      description:       self.description,
      category:          self.category,
      status:            decode_enum("status", &self.status)?,
      sub_status:        decode_enum("sub_status", &self.sub_status)?,
      department_id:     decode_uuid(&self.department_id)?,
      owner_user_id:     decode_uuid(&self.owner_user_id)?,
      closed_by_user_id: decode_opt_uuid(self.closed_by_user_id)?,
      resolution_notes:  self.resolution_notes,
      rejection_reason:  self.rejection_reason,
      resolved_at:       decode_opt_dt(self.resolved_at)?,
      support_count:     u32::try_from(self.support_count).map_err(|_| Error::Decode {
        column: "support_count",
        value:  self.support_count.to_string(),
      })?,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}

pub const ASSIGNMENT_COLUMNS: &str = "assignment_id, report_id, assignee_type, assignee_user_id,
   assignee_team_id, assigned_by_user_id, status, assigned_at, accepted_at,
   completed_at, cancelled_at, notes";

/// Raw strings read directly from an `assignments` row.
pub struct RawAssignment {
  pub assignment_id:       String,
  pub report_id:           String,
  pub assignee_type:       String,
  pub assignee_user_id:    Option<String>,
  pub assignee_team_id:    Option<String>,
  pub assigned_by_user_id: String,
  pub status:              String,
  pub assigned_at:         String,
  pub accepted_at:         Option<String>,
  pub completed_at:        Option<String>,
  pub cancelled_at:        Option<String>,
  pub notes:               Option<String>,
}

impl RawAssignment {
  /// Read a row selected with [`ASSIGNMENT_COLUMNS`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      assignment_id:       row.get(0)?,
      report_id:           row.get(1)?,
      assignee_type:       row.get(2)?,
      assignee_user_id:    row.get(3)?,
      assignee_team_id:    row.get(4)?,
      assigned_by_user_id: row.get(5)?,
      status:              row.get(6)?,
      assigned_at:         row.get(7)?,
      accepted_at:         row.get(8)?,
      completed_at:        row.get(9)?,
      cancelled_at:        row.get(10)?,
      notes:               row.get(11)?,
    })
  }

  pub fn into_assignment(self) -> Result<Assignment> {
    let assignee = Assignee::from_columns(
      decode_enum("assignee_type", &self.assignee_type)?,
      decode_opt_uuid(self.assignee_user_id)?,
      decode_opt_uuid(self.assignee_team_id)?,
    )?;

    Ok(Assignment {
      assignment_id: decode_uuid(&self.assignment_id)?,
      report_id: decode_uuid(&self.report_id)?,
      assignee,
      assigned_by_user_id: decode_uuid(&self.assigned_by_user_id)?,
      status: decode_enum("status", &self.status)?,
      assigned_at: decode_dt(&self.assigned_at)?,
      accepted_at: decode_opt_dt(self.accepted_at)?,
      completed_at: decode_opt_dt(self.completed_at)?,
      cancelled_at: decode_opt_dt(self.cancelled_at)?,
      notes: self.notes,
    })
  }
}

pub const STATUS_HISTORY_COLUMNS: &str = "history_id, report_id, previous_status, new_status,
   previous_sub_status, new_sub_status, actor_user_id, notes, recorded_at";

/// Raw strings read directly from a `report_status_history` row.
pub struct RawStatusHistory {
  pub history_id:          String,
  pub report_id:           String,
  pub previous_status:     Option<String>,
  pub new_status:          String,
  pub previous_sub_status: String,
  pub new_sub_status:      String,
  pub actor_user_id:       String,
  pub notes:               Option<String>,
  pub recorded_at:         String,
}

impl RawStatusHistory {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      history_id:          row.get(0)?,
      report_id:           row.get(1)?,
      previous_status:     row.get(2)?,
      new_status:          row.get(3)?,
      previous_sub_status: row.get(4)?,
      new_sub_status:      row.get(5)?,
      actor_user_id:       row.get(6)?,
      notes:               row.get(7)?,
      recorded_at:         row.get(8)?,
    })
  }

  pub fn into_entry(self) -> Result<StatusHistoryEntry> {
    Ok(StatusHistoryEntry {
      history_id:          decode_uuid(&self.history_id)?,
      report_id:           decode_uuid(&self.report_id)?,
      previous_status:     self
        .previous_status
        .as_deref()
        .map(|s| decode_enum("previous_status", s))
        .transpose()?,
      new_status:          decode_enum("new_status", &self.new_status)?,
      previous_sub_status: decode_enum("previous_sub_status", &self.previous_sub_status)?,
      new_sub_status:      decode_enum("new_sub_status", &self.new_sub_status)?,
      actor_user_id:       decode_uuid(&self.actor_user_id)?,
      notes:               self.notes,
      recorded_at:         decode_dt(&self.recorded_at)?,
    })
  }
}

pub const DEPARTMENT_HISTORY_COLUMNS: &str = "history_id, report_id, previous_department_id,
   new_department_id, actor_user_id, reason, recorded_at";

/// Raw strings read directly from a `report_department_history` row.
pub struct RawDepartmentHistory {
  pub history_id:             String,
  pub report_id:              String,
  pub previous_department_id: String,
  pub new_department_id:      String,
  pub actor_user_id:          String,
  pub reason:                 String,
  pub recorded_at:            String,
}

impl RawDepartmentHistory {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      history_id:             row.get(0)?,
      report_id:              row.get(1)?,
      previous_department_id: row.get(2)?,
      new_department_id:      row.get(3)?,
      actor_user_id:          row.get(4)?,
      reason:                 row.get(5)?,
      recorded_at:            row.get(6)?,
    })
  }

  pub fn into_entry(self) -> Result<DepartmentHistoryEntry> {
    Ok(DepartmentHistoryEntry {
      history_id:             decode_uuid(&self.history_id)?,
      report_id:              decode_uuid(&self.report_id)?,
      previous_department_id: decode_uuid(&self.previous_department_id)?,
      new_department_id:      decode_uuid(&self.new_department_id)?,
      actor_user_id:          decode_uuid(&self.actor_user_id)?,
      reason:                 self.reason,
      recorded_at:            decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw strings read directly from a `departments` row.
pub struct RawDepartment {
  pub department_id: String,
  pub name:          String,
  pub is_active:     bool,
}

impl RawDepartment {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      department_id: row.get(0)?,
      name:          row.get(1)?,
      is_active:     row.get(2)?,
    })
  }

  pub fn into_department(self) -> Result<Department> {
    Ok(Department {
      department_id: decode_uuid(&self.department_id)?,
      name:          self.name,
      is_active:     self.is_active,
    })
  }
}

/// Raw strings read directly from a `teams` row.
pub struct RawTeam {
  pub team_id:       String,
  pub name:          String,
  pub department_id: String,
  pub status:        String,
}

impl RawTeam {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      team_id:       row.get(0)?,
      name:          row.get(1)?,
      department_id: row.get(2)?,
      status:        row.get(3)?,
    })
  }

  pub fn into_team(self) -> Result<Team> {
    Ok(Team {
      team_id:       decode_uuid(&self.team_id)?,
      name:          self.name,
      department_id: decode_uuid(&self.department_id)?,
      status:        decode_enum("team status", &self.status)?,
    })
  }
}

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:       String,
  pub display_name:  String,
  pub department_id: Option<String>,
  pub roles:         String,
}

impl RawUser {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      display_name:  row.get(1)?,
      department_id: row.get(2)?,
      roles:         row.get(3)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:       decode_uuid(&self.user_id)?,
      display_name:  self.display_name,
      department_id: decode_opt_uuid(self.department_id)?,
      roles:         decode_roles(&self.roles)?,
    })
  }
}

/// Raw strings read directly from a `report_supports` row.
pub struct RawSupport {
  pub report_id:  String,
  pub user_id:    String,
  pub created_at: String,
}

impl RawSupport {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      report_id:  row.get(0)?,
      user_id:    row.get(1)?,
      created_at: row.get(2)?,
    })
  }

  pub fn into_support(self) -> Result<ReportSupport> {
    Ok(ReportSupport {
      report_id:  decode_uuid(&self.report_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
