//! Report: a citizen-filed issue and its lifecycle state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
  Open,
  InReview,
  InProgress,
  Done,
  Rejected,
  Cancelled,
}

impl ReportStatus {
  /// Statuses from which the report can only move again via a reopen.
  pub fn is_closed(self) -> bool {
    matches!(self, Self::Done | Self::Rejected | Self::Cancelled)
  }
}

/// Secondary refinement of [`ReportStatus::InProgress`]. Must be `None` for
/// every other status.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SubStatus {
  #[default]
  None,
  PendingApproval,
  /// Declared for compatibility with existing data; no transition assigns it.
  Forwarded,
}

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
  pub report_id:         Uuid,
  pub title:             String,
  pub description:       String,
  pub category:          Option<String>,
  pub status:            ReportStatus,
  pub sub_status:        SubStatus,
  pub department_id:     Uuid,
  pub owner_user_id:     Uuid,
  pub closed_by_user_id: Option<Uuid>,
  pub resolution_notes:  Option<String>,
  pub rejection_reason:  Option<String>,
  pub resolved_at:       Option<DateTime<Utc>>,
  /// Mirrors the number of support rows; never negative.
  pub support_count:     u32,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

impl Report {
  pub fn is_owned_by(&self, user_id: Uuid) -> bool { self.owner_user_id == user_id }

  pub fn is_pending_approval(&self) -> bool {
    self.status == ReportStatus::InProgress
      && self.sub_status == SubStatus::PendingApproval
  }
}

/// Input to [`crate::store::ReportStore::create_report`]. Identity, owner and
/// timestamps are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReport {
  pub title:         String,
  pub description:   String,
  pub category:      Option<String>,
  pub department_id: Uuid,
}
