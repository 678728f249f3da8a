//! Attribute-based authorization.
//!
//! An [`Ability`] is compiled per request from a [`Principal`] by unioning the
//! rule sets of every role it holds. Each rule names an action, a subject
//! type and an optional condition evaluated against the subject instance and
//! the principal. `can` is true if any rule matches.
//!
//! Abilities are cheap to build and must not be cached: a principal's roles
//! and department can change between requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::{
  Error, Result,
  assignment::Assignment,
  directory::{Department, Team, User},
  principal::{Principal, Role},
  report::{Report, ReportStatus, SubStatus},
};

// ─── Vocabulary ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
  /// Wildcard: matches every action.
  Manage,
  Create,
  Read,
  ReadPrivate,
  Update,
  Cancel,
  Support,
  Unsupport,
  StartWork,
  CompleteWork,
  Assign,
  Approve,
  Reject,
  Forward,
  Reopen,
  AcceptAssignment,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubjectType {
  Report,
  Team,
  Assignment,
  Department,
  User,
  /// Wildcard: matches every subject type.
  All,
}

/// The thing an action is performed on. Prefer passing an instance; `Type`
/// asks the class-level question "could this principal ever do X to a Y?".
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
  Report(&'a Report),
  Team(&'a Team),
  Assignment(&'a Assignment),
  Department(&'a Department),
  User(&'a User),
  Type(SubjectType),
}

impl Subject<'_> {
  pub fn subject_type(&self) -> SubjectType {
    match self {
      Self::Report(_) => SubjectType::Report,
      Self::Team(_) => SubjectType::Team,
      Self::Assignment(_) => SubjectType::Assignment,
      Self::Department(_) => SubjectType::Department,
      Self::User(_) => SubjectType::User,
      Self::Type(t) => *t,
    }
  }
}

// ─── Rules ───────────────────────────────────────────────────────────────────

/// A condition over a subject instance and the (possibly anonymous)
/// principal the ability was built for.
pub type Condition = fn(&Subject<'_>, Option<&Principal>) -> bool;

#[derive(Clone, Copy)]
pub struct Rule {
  pub action:    Action,
  pub subject:   SubjectType,
  pub condition: Option<Condition>,
}

impl std::fmt::Debug for Rule {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Rule")
      .field("action", &self.action)
      .field("subject", &self.subject)
      .field("conditional", &self.condition.is_some())
      .finish()
  }
}

impl Rule {
  const fn always(action: Action, subject: SubjectType) -> Self {
    Self { action, subject, condition: None }
  }

  const fn when(action: Action, subject: SubjectType, condition: Condition) -> Self {
    Self { action, subject, condition: Some(condition) }
  }

  fn matches(&self, action: Action, subject: &Subject<'_>, principal: Option<&Principal>) -> bool {
    if self.action != Action::Manage && self.action != action {
      return false;
    }
    let ty = subject.subject_type();
    if self.subject != SubjectType::All && self.subject != ty {
      return false;
    }
    match (subject, self.condition) {
      // Class-level checks ignore conditions.
      (Subject::Type(_), _) | (_, None) => true,
      (_, Some(condition)) => condition(subject, principal),
    }
  }
}

// ─── Conditions ──────────────────────────────────────────────────────────────

fn as_report<'a>(subject: &Subject<'a>) -> Option<&'a Report> {
  match subject {
    Subject::Report(r) => Some(r),
    _ => None,
  }
}

/// The report belongs to the principal's department and is in one of
/// `statuses` (any status when empty).
fn departmental(subject: &Subject<'_>, principal: Option<&Principal>, statuses: &[ReportStatus]) -> bool {
  match (as_report(subject), principal) {
    (Some(r), Some(p)) => {
      p.in_department(r.department_id) && (statuses.is_empty() || statuses.contains(&r.status))
    }
    _ => false,
  }
}

fn not_cancelled(s: &Subject<'_>, _: Option<&Principal>) -> bool {
  as_report(s).is_some_and(|r| r.status != ReportStatus::Cancelled)
}

fn own_open(s: &Subject<'_>, p: Option<&Principal>) -> bool {
  match (as_report(s), p) {
    (Some(r), Some(p)) => r.is_owned_by(p.user_id) && r.status == ReportStatus::Open,
    _ => false,
  }
}

fn supportable(s: &Subject<'_>, _: Option<&Principal>) -> bool {
  as_report(s).is_some_and(|r| {
    matches!(
      r.status,
      ReportStatus::Open | ReportStatus::InReview | ReportStatus::InProgress
    )
  })
}

fn dept_any(s: &Subject<'_>, p: Option<&Principal>) -> bool { departmental(s, p, &[]) }

fn dept_working(s: &Subject<'_>, p: Option<&Principal>) -> bool {
  departmental(s, p, &[ReportStatus::InReview, ReportStatus::InProgress])
}

fn dept_in_review(s: &Subject<'_>, p: Option<&Principal>) -> bool {
  departmental(s, p, &[ReportStatus::InReview])
}

fn dept_in_progress(s: &Subject<'_>, p: Option<&Principal>) -> bool {
  departmental(s, p, &[ReportStatus::InProgress])
}

fn dept_unassigned(s: &Subject<'_>, p: Option<&Principal>) -> bool {
  departmental(s, p, &[ReportStatus::Open, ReportStatus::InReview])
}

fn dept_pending_approval(s: &Subject<'_>, p: Option<&Principal>) -> bool {
  dept_in_progress(s, p)
    && as_report(s).is_some_and(|r| r.sub_status == SubStatus::PendingApproval)
}

fn dept_closed(s: &Subject<'_>, p: Option<&Principal>) -> bool {
  departmental(
    s,
    p,
    &[ReportStatus::Done, ReportStatus::Rejected, ReportStatus::Cancelled],
  )
}

fn own_department_team(s: &Subject<'_>, p: Option<&Principal>) -> bool {
  match (s, p) {
    (Subject::Team(t), Some(p)) => p.in_department(t.department_id),
    _ => false,
  }
}

fn own_assignment(s: &Subject<'_>, p: Option<&Principal>) -> bool {
  match (s, p) {
    (Subject::Assignment(a), Some(p)) => a.assignee.user_id() == Some(p.user_id),
    _ => false,
  }
}

// ─── Rule sets ───────────────────────────────────────────────────────────────

use Action::*;
use SubjectType as T;

const ANONYMOUS: &[Rule] = &[Rule::when(Read, T::Report, not_cancelled)];

const CITIZEN: &[Rule] = &[
  Rule::always(Create, T::Report),
  Rule::always(Read, T::Report),
  Rule::when(ReadPrivate, T::Report, own_open),
  Rule::when(Update, T::Report, own_open),
  Rule::when(Cancel, T::Report, own_open),
  Rule::when(Support, T::Report, supportable),
  Rule::when(Unsupport, T::Report, supportable),
];

const TEAM_MEMBER: &[Rule] = &[
  Rule::when(Read, T::Report, dept_working),
  Rule::when(Update, T::Report, dept_working),
  Rule::when(StartWork, T::Report, dept_in_review),
  Rule::when(CompleteWork, T::Report, dept_in_progress),
  Rule::when(AcceptAssignment, T::Assignment, own_assignment),
];

const DEPARTMENT_SUPERVISOR: &[Rule] = &[
  Rule::when(Read, T::Report, dept_any),
  Rule::when(Update, T::Report, dept_any),
  Rule::when(Assign, T::Report, dept_unassigned),
  Rule::when(Approve, T::Report, dept_pending_approval),
  Rule::when(Reject, T::Report, dept_working),
  Rule::when(Forward, T::Report, dept_any),
  Rule::when(Reopen, T::Report, dept_closed),
  Rule::when(Manage, T::Team, own_department_team),
];

const SYSTEM_ADMIN: &[Rule] = &[Rule::always(Manage, T::All)];

fn rules_for(role: Role) -> &'static [Rule] {
  match role {
    Role::Citizen => CITIZEN,
    Role::TeamMember => TEAM_MEMBER,
    Role::DepartmentSupervisor => DEPARTMENT_SUPERVISOR,
    Role::SystemAdmin => SYSTEM_ADMIN,
  }
}

// ─── Ability ─────────────────────────────────────────────────────────────────

/// The compiled, request-scoped permission set of one principal.
#[derive(Debug, Clone)]
pub struct Ability {
  principal: Option<Principal>,
  rules:     Vec<Rule>,
}

impl Ability {
  /// Compile the ability for `principal`. `None`, or a principal holding no
  /// roles, gets the anonymous rule set.
  pub fn for_principal(principal: Option<&Principal>) -> Self {
    let rules = match principal {
      Some(p) if !p.roles.is_empty() => p
        .roles
        .iter()
        .flat_map(|role| rules_for(*role).iter().copied())
        .collect(),
      _ => ANONYMOUS.to_vec(),
    };
    Self { principal: principal.cloned(), rules }
  }

  pub fn principal(&self) -> Option<&Principal> { self.principal.as_ref() }

  pub fn rules(&self) -> &[Rule] { &self.rules }

  pub fn can(&self, action: Action, subject: &Subject<'_>) -> bool {
    self
      .rules
      .iter()
      .any(|rule| rule.matches(action, subject, self.principal.as_ref()))
  }

  pub fn cannot(&self, action: Action, subject: &Subject<'_>) -> bool { !self.can(action, subject) }

  /// Like [`Ability::can`], but returns [`Error::Forbidden`] on denial.
  pub fn ensure(&self, action: Action, subject: &Subject<'_>) -> Result<()> {
    if self.can(action, subject) {
      return Ok(());
    }
    Err(Error::forbidden(format!(
      "not allowed to {action} this {}",
      subject.subject_type()
    )))
  }

  /// Authorize against a loosely-typed JSON value.
  ///
  /// This is a last resort for callers that cannot pass a typed [`Subject`].
  /// The subject type comes from an explicit `subject_type` field when
  /// present, otherwise from [`infer_subject_type`]. The value is then
  /// decoded into the typed record; anything that fails to decode is denied.
  pub fn can_value(&self, action: Action, value: &Value) -> bool {
    let Some(ty) = infer_subject_type(value) else {
      return false;
    };
    let owned = value.clone();
    match ty {
      SubjectType::Report => serde_json::from_value::<Report>(owned)
        .is_ok_and(|r| self.can(action, &Subject::Report(&r))),
      SubjectType::Team => serde_json::from_value::<Team>(owned)
        .is_ok_and(|t| self.can(action, &Subject::Team(&t))),
      SubjectType::Assignment => serde_json::from_value::<Assignment>(owned)
        .is_ok_and(|a| self.can(action, &Subject::Assignment(&a))),
      SubjectType::Department => serde_json::from_value::<Department>(owned)
        .is_ok_and(|d| self.can(action, &Subject::Department(&d))),
      SubjectType::User => serde_json::from_value::<User>(owned)
        .is_ok_and(|u| self.can(action, &Subject::User(&u))),
      SubjectType::All => false,
    }
  }
}

/// Field signatures checked in order by [`infer_subject_type`]. Order
/// matters: a team also has `name` and `status`, so it must be tested before
/// the looser department signature, and a report before either.
const SIGNATURES: &[(&[&str], SubjectType)] = &[
  (&["status", "title", "description"], SubjectType::Report),
  (&["report_id", "assignee_type"], SubjectType::Assignment),
  (&["department_id", "name", "status"], SubjectType::Team),
  (&["name", "is_active"], SubjectType::Department),
  (&["display_name", "roles"], SubjectType::User),
];

/// Work out what kind of record `value` is.
///
/// An explicit `subject_type` string wins. Without one this falls back to
/// matching field names against fixed signatures, which is fragile: a record
/// that gains a field can start matching an earlier signature. Prefer typed
/// subjects.
pub fn infer_subject_type(value: &Value) -> Option<SubjectType> {
  let object = value.as_object()?;

  if let Some(tag) = object.get("subject_type") {
    return tag.as_str().and_then(|s| s.parse().ok());
  }

  SIGNATURES
    .iter()
    .find(|(fields, _)| fields.iter().all(|f| object.contains_key(*f)))
    .map(|(_, ty)| *ty)
}
