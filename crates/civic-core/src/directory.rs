//! Directory records: departments, teams and users.
//!
//! These are owned by other parts of the system; the lifecycle engine only
//! reads them to validate routing and assignment.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::principal::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
  pub department_id: Uuid,
  pub name:          String,
  pub is_active:     bool,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamStatus {
  Available,
  Busy,
  Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
  pub team_id:       Uuid,
  pub name:          String,
  pub department_id: Uuid,
  pub status:        TeamStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:       Uuid,
  pub display_name:  String,
  pub department_id: Option<Uuid>,
  pub roles:         BTreeSet<Role>,
}

impl User {
  /// True if the user holds at least one role that can carry an assignment.
  pub fn is_assignable(&self) -> bool { self.roles.iter().any(|r| r.is_assignable()) }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDepartment {
  pub name:      String,
  pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTeam {
  pub name:          String,
  pub department_id: Uuid,
  pub status:        TeamStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
  pub display_name:  String,
  pub department_id: Option<Uuid>,
  pub roles:         BTreeSet<Role>,
}
