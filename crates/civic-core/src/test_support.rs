//! Fixtures shared by the unit tests in this crate.

use chrono::Utc;
use uuid::Uuid;

use crate::{
  assignment::{Assignee, Assignment, AssignmentStatus},
  directory::{Department, Team, TeamStatus, User},
  principal::{Principal, Role},
  report::{Report, ReportStatus, SubStatus},
};

pub fn report(status: ReportStatus, sub_status: SubStatus) -> Report {
  let now = Utc::now();
  Report {
    report_id: Uuid::new_v4(),
    title: "Pothole on Main St".into(),
    description: "Deep enough to lose a wheel".into(),
    category: Some("roads".into()),
    status,
    sub_status,
    department_id: Uuid::new_v4(),
    owner_user_id: Uuid::new_v4(),
    closed_by_user_id: None,
    resolution_notes: None,
    rejection_reason: None,
    resolved_at: None,
    support_count: 0,
    created_at: now,
    updated_at: now,
  }
}

pub fn principal(role: Role, department_id: Option<Uuid>) -> Principal {
  Principal {
    user_id: Uuid::new_v4(),
    roles: [role].into(),
    department_id,
  }
}

pub fn department(department_id: Uuid, is_active: bool) -> Department {
  Department {
    department_id,
    name: "Public Works".into(),
    is_active,
  }
}

pub fn team(department_id: Uuid, status: TeamStatus) -> Team {
  Team {
    team_id: Uuid::new_v4(),
    name: "Road crew".into(),
    department_id,
    status,
  }
}

pub fn user(department_id: Option<Uuid>, role: Role) -> User {
  User {
    user_id: Uuid::new_v4(),
    display_name: "Sam Rivera".into(),
    department_id,
    roles: [role].into(),
  }
}

pub fn active_assignment(report_id: Uuid, assignee: Assignee) -> Assignment {
  Assignment {
    assignment_id: Uuid::new_v4(),
    report_id,
    assignee,
    assigned_by_user_id: Uuid::new_v4(),
    status: AssignmentStatus::Active,
    assigned_at: Utc::now(),
    accepted_at: None,
    completed_at: None,
    cancelled_at: None,
    notes: None,
  }
}
