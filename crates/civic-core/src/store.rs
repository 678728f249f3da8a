//! The `ReportStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `civic-store-sqlite`).
//! Every mutating method runs as one transaction that holds a write lock on
//! the target report for its whole duration, evaluates the rules in this
//! crate against the locked snapshot, and commits the mutation together with
//! its audit rows or nothing at all. No retries happen at this layer.
//!
//! Authorization is the caller's job: check the [`crate::ability::Ability`]
//! before invoking a mutating method.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Classify,
  assignment::Assignment,
  directory::{Department, NewDepartment, NewTeam, NewUser, Team, User},
  forwarding::ForwardRequest,
  history::{DepartmentHistoryEntry, StatusHistoryEntry},
  lifecycle::{ProofSubmission, StatusUpdate},
  principal::Principal,
  report::{NewReport, Report, ReportStatus},
  support::{ReportSupport, SupportOutcome},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`ReportStore::list_reports`].
#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
  pub status:        Option<ReportStatus>,
  pub department_id: Option<Uuid>,
  pub owner_user_id: Option<Uuid>,
  pub limit:         Option<usize>,
  pub offset:        Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a transactional report store.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ReportStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Directory ─────────────────────────────────────────────────────────

  fn add_department(
    &self,
    input: NewDepartment,
  ) -> impl Future<Output = Result<Department, Self::Error>> + Send + '_;

  fn get_department(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Department>, Self::Error>> + Send + '_;

  /// Fails with NotFound if the department does not exist.
  fn add_team(
    &self,
    input: NewTeam,
  ) -> impl Future<Output = Result<Team, Self::Error>> + Send + '_;

  fn get_team(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Team>, Self::Error>> + Send + '_;

  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  // ── Reports ───────────────────────────────────────────────────────────

  /// File a new OPEN report owned by `principal` and write its initial
  /// history row. The department must exist and be active.
  fn create_report(
    &self,
    input: NewReport,
    principal: Principal,
  ) -> impl Future<Output = Result<Report, Self::Error>> + Send + '_;

  /// Retrieve a report by UUID. Returns `None` if not found.
  fn get_report(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Report>, Self::Error>> + Send + '_;

  /// Newest first.
  fn list_reports<'a>(
    &'a self,
    query: &'a ReportQuery,
  ) -> impl Future<Output = Result<Vec<Report>, Self::Error>> + Send + 'a;

  // ── Status machine ────────────────────────────────────────────────────

  /// Move a report to `update.new_status` if any role of `principal`
  /// permits it from the current status.
  fn update_status(
    &self,
    report_id: Uuid,
    update: StatusUpdate,
    principal: Principal,
  ) -> impl Future<Output = Result<Report, Self::Error>> + Send + '_;

  /// Link resolution-proof media and mark the work PENDING_APPROVAL.
  fn complete_work_with_proof(
    &self,
    report_id: Uuid,
    proof: ProofSubmission,
    principal: Principal,
  ) -> impl Future<Output = Result<Report, Self::Error>> + Send + '_;

  fn approve_report(
    &self,
    report_id: Uuid,
    notes: Option<String>,
    principal: Principal,
  ) -> impl Future<Output = Result<Report, Self::Error>> + Send + '_;

  fn reject_report(
    &self,
    report_id: Uuid,
    reason: String,
    principal: Principal,
  ) -> impl Future<Output = Result<Report, Self::Error>> + Send + '_;

  // ── Assignment ────────────────────────────────────────────────────────

  fn assign_to_team(
    &self,
    report_id: Uuid,
    team_id: Uuid,
    principal: Principal,
  ) -> impl Future<Output = Result<Assignment, Self::Error>> + Send + '_;

  fn assign_to_user(
    &self,
    report_id: Uuid,
    user_id: Uuid,
    principal: Principal,
  ) -> impl Future<Output = Result<Assignment, Self::Error>> + Send + '_;

  fn accept_assignment(
    &self,
    assignment_id: Uuid,
    principal: Principal,
  ) -> impl Future<Output = Result<Assignment, Self::Error>> + Send + '_;

  fn get_assignment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Assignment>, Self::Error>> + Send + '_;

  /// All assignments of a report, oldest first.
  fn assignments(
    &self,
    report_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Assignment>, Self::Error>> + Send + '_;

  fn active_assignment(
    &self,
    report_id: Uuid,
  ) -> impl Future<Output = Result<Option<Assignment>, Self::Error>> + Send + '_;

  // ── Forwarding ────────────────────────────────────────────────────────

  fn forward(
    &self,
    report_id: Uuid,
    request: ForwardRequest,
    principal: Principal,
  ) -> impl Future<Output = Result<Report, Self::Error>> + Send + '_;

  // ── Support ledger ────────────────────────────────────────────────────

  fn add_support(
    &self,
    report_id: Uuid,
    principal: Principal,
  ) -> impl Future<Output = Result<SupportOutcome, Self::Error>> + Send + '_;

  fn remove_support(
    &self,
    report_id: Uuid,
    principal: Principal,
  ) -> impl Future<Output = Result<SupportOutcome, Self::Error>> + Send + '_;

  fn supports(
    &self,
    report_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ReportSupport>, Self::Error>> + Send + '_;

  // ── Audit trail ───────────────────────────────────────────────────────

  /// Oldest first.
  fn status_history(
    &self,
    report_id: Uuid,
  ) -> impl Future<Output = Result<Vec<StatusHistoryEntry>, Self::Error>> + Send + '_;

  /// Oldest first.
  fn department_history(
    &self,
    report_id: Uuid,
  ) -> impl Future<Output = Result<Vec<DepartmentHistoryEntry>, Self::Error>> + Send + '_;

  /// Media ids linked to the report as resolution proof.
  fn proof_media(
    &self,
    report_id: Uuid,
  ) -> impl Future<Output = Result<Vec<i64>, Self::Error>> + Send + '_;
}
