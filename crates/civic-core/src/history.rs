//! Audit trail records.
//!
//! Both tables are append-only. A row is written in the same transaction as
//! the mutation it describes and is never updated or deleted afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::report::{ReportStatus, SubStatus};

/// One status or sub-status change of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
  pub history_id:          Uuid,
  pub report_id:           Uuid,
  /// `None` only for the entry written when the report is created.
  pub previous_status:     Option<ReportStatus>,
  pub new_status:          ReportStatus,
  pub previous_sub_status: SubStatus,
  pub new_sub_status:      SubStatus,
  pub actor_user_id:       Uuid,
  pub notes:               Option<String>,
  pub recorded_at:         DateTime<Utc>,
}

/// One move of a report between departments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentHistoryEntry {
  pub history_id:             Uuid,
  pub report_id:              Uuid,
  pub previous_department_id: Uuid,
  pub new_department_id:      Uuid,
  pub actor_user_id:          Uuid,
  pub reason:                 String,
  pub recorded_at:            DateTime<Utc>,
}
