//! Principal: the authenticated actor behind a request.
//!
//! Authentication happens upstream; this crate only consumes the result.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

/// A role granted to a user. A principal may hold several at once.
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
pub enum Role {
  Citizen,
  TeamMember,
  DepartmentSupervisor,
  SystemAdmin,
}

impl Role {
  /// Roles whose holders may receive a personal assignment.
  pub fn is_assignable(self) -> bool {
    matches!(self, Self::TeamMember | Self::DepartmentSupervisor)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub user_id:       Uuid,
  pub roles:         BTreeSet<Role>,
  pub department_id: Option<Uuid>,
}

impl Principal {
  pub fn new(user_id: Uuid, roles: impl IntoIterator<Item = Role>) -> Self {
    Self {
      user_id,
      roles: roles.into_iter().collect(),
      department_id: None,
    }
  }

  pub fn with_department(mut self, department_id: Uuid) -> Self {
    self.department_id = Some(department_id);
    self
  }

  pub fn has_role(&self, role: Role) -> bool { self.roles.contains(&role) }

  /// True when the principal is affiliated with `department_id`.
  pub fn in_department(&self, department_id: Uuid) -> bool {
    self.department_id == Some(department_id)
  }
}
