//! The role-scoped status transition table.
//!
//! Keyed by `(role, from)`; the value is the set of statuses that role may
//! move a report to. The table is fixed at compile time. A transition is
//! permitted when ANY role held by the principal permits it.

use crate::{
  principal::{Principal, Role},
  report::ReportStatus::{self, *},
};

/// Statuses `role` may move a report to from `from`.
pub fn allowed_targets(role: Role, from: ReportStatus) -> &'static [ReportStatus] {
  match role {
    Role::Citizen => match from {
      Open => &[Cancelled],
      _ => &[],
    },
    Role::TeamMember => match from {
      InReview => &[InProgress],
      // Submitting finished work.
      InProgress => &[Done],
      // Reworking a rejected report.
      Rejected => &[InProgress],
      _ => &[],
    },
    Role::DepartmentSupervisor => match from {
      Open => &[InReview, Rejected, Cancelled],
      InReview => &[InProgress, Rejected],
      InProgress => &[Done, Rejected],
      Done => &[InReview, InProgress],
      Rejected => &[InReview],
      Cancelled => &[],
    },
    Role::SystemAdmin => match from {
      Open => &[InReview, InProgress, Rejected, Cancelled],
      InReview => &[InProgress, Rejected, Cancelled],
      InProgress => &[InReview, Done, Rejected, Cancelled],
      Done => &[InReview, InProgress],
      Rejected => &[InReview, InProgress],
      Cancelled => &[Open],
    },
  }
}

/// True when any of `roles` may move a report from `from` to `to`.
pub fn is_permitted<'r>(
  roles: impl IntoIterator<Item = &'r Role>,
  from: ReportStatus,
  to: ReportStatus,
) -> bool {
  roles
    .into_iter()
    .any(|role| allowed_targets(*role, from).contains(&to))
}

/// The union of targets reachable from `from` for everything `principal`
/// holds, in declaration order.
pub fn targets_for(principal: &Principal, from: ReportStatus) -> Vec<ReportStatus> {
  let mut out: Vec<ReportStatus> = Vec::new();
  for role in &principal.roles {
    for to in allowed_targets(*role, from) {
      if !out.contains(to) {
        out.push(*to);
      }
    }
  }
  out.sort();
  out
}
