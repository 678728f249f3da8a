//! The support ledger: one non-owner "upvote" per user per report.
//!
//! The existence of a `(report, user)` support row is the source of truth;
//! `Report::support_count` mirrors it. Adding and removing support are the
//! only idempotent operations in the engine: repeating either with the same
//! arguments succeeds without further change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, principal::Principal, report::Report};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSupport {
  pub report_id:  Uuid,
  pub user_id:    Uuid,
  pub created_at: DateTime<Utc>,
}

/// Result of a successful support or unsupport call. The `Already*`/`Not*`
/// variants are the idempotent no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportOutcome {
  Added,
  AlreadySupported,
  Removed,
  NotSupported,
}

impl SupportOutcome {
  /// True when the call changed the ledger.
  pub fn changed(self) -> bool { matches!(self, Self::Added | Self::Removed) }
}

/// Owners may not support their own report.
pub fn check_support(report: &Report, principal: &Principal) -> Result<()> {
  if report.is_owned_by(principal.user_id) {
    return Err(Error::forbidden("cannot support your own report"));
  }
  Ok(())
}
