//! [`SqliteStore`], the SQLite implementation of [`ReportStore`].

use std::{path::Path, time::Duration};

use chrono::Utc;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use civic_core::{
  assignment::{self, Assignment, AssignmentPlan},
  directory::{Department, NewDepartment, NewTeam, NewUser, Team, User},
  forwarding::{self, ForwardRequest},
  history::{DepartmentHistoryEntry, StatusHistoryEntry},
  lifecycle::{self, ProofSubmission, StatusUpdate},
  principal::Principal,
  report::{NewReport, Report},
  store::{ReportQuery, ReportStore},
  support::{self, ReportSupport, SupportOutcome},
  Entity,
};

use crate::{
  queries::{self, RESOLUTION_PROOF},
  schema::SCHEMA,
  Error, Result,
};

/// How long a writer waits for the database lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A civic report store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` inside one `BEGIN IMMEDIATE` transaction.
  ///
  /// The write lock is taken before `f` reads anything. The transaction
  /// commits only if `f` succeeds; otherwise it is dropped and rolled back.
  async fn transact<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = f(&tx);
        if outcome.is_ok() {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await?
  }

  /// Run a read-only query outside any explicit transaction.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Persist an assignment plan: retire the superseded assignment before the
  /// new one goes in, then apply any status advance.
  fn write_assignment_plan(tx: &Transaction<'_>, plan: &AssignmentPlan) -> Result<()> {
    if let Some(old) = &plan.superseded {
      queries::save_assignment(tx, old)?;
    }
    queries::insert_assignment(tx, &plan.assignment)?;
    if let Some(t) = &plan.transition {
      queries::apply_transition(tx, t)?;
    }
    Ok(())
  }
}

fn required_name(field: &str, value: &str) -> Result<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(civic_core::Error::validation(format!("{field} is required")).into());
  }
  Ok(trimmed.to_owned())
}

// ─── ReportStore impl ────────────────────────────────────────────────────────

impl ReportStore for SqliteStore {
  type Error = Error;

  // ── Directory ─────────────────────────────────────────────────────────────

  async fn add_department(&self, input: NewDepartment) -> Result<Department> {
    let department = Department {
      department_id: Uuid::new_v4(),
      name:          required_name("name", &input.name)?,
      is_active:     input.is_active,
    };

    self
      .transact(move |tx| {
        queries::insert_department(tx, &department)?;
        Ok(department)
      })
      .await
  }

  async fn get_department(&self, id: Uuid) -> Result<Option<Department>> {
    self.read(move |conn| queries::find_department(conn, id)).await
  }

  async fn add_team(&self, input: NewTeam) -> Result<Team> {
    let team = Team {
      team_id:       Uuid::new_v4(),
      name:          required_name("name", &input.name)?,
      department_id: input.department_id,
      status:        input.status,
    };

    self
      .transact(move |tx| {
        queries::require_department(tx, team.department_id)?;
        queries::insert_team(tx, &team)?;
        Ok(team)
      })
      .await
  }

  async fn get_team(&self, id: Uuid) -> Result<Option<Team>> {
    self.read(move |conn| queries::find_team(conn, id)).await
  }

  async fn add_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:       Uuid::new_v4(),
      display_name:  required_name("display_name", &input.display_name)?,
      department_id: input.department_id,
      roles:         input.roles,
    };

    self
      .transact(move |tx| {
        if let Some(department_id) = user.department_id {
          queries::require_department(tx, department_id)?;
        }
        queries::insert_user(tx, &user)?;
        Ok(user)
      })
      .await
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    self.read(move |conn| queries::find_user(conn, id)).await
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  async fn create_report(&self, input: NewReport, principal: Principal) -> Result<Report> {
    let (report, history) = lifecycle::open(input, &principal, Utc::now())?;

    let report = self
      .transact(move |tx| {
        let department = queries::require_department(tx, report.department_id)?;
        if !department.is_active {
          return Err(
            civic_core::Error::validation(format!("department {} is not active", department.name))
              .into(),
          );
        }
        queries::insert_report(tx, &report)?;
        queries::insert_status_history(tx, &history)?;
        Ok(report)
      })
      .await?;

    info!(
      report_id = %report.report_id,
      owner = %report.owner_user_id,
      department_id = %report.department_id,
      "report created"
    );
    Ok(report)
  }

  async fn get_report(&self, id: Uuid) -> Result<Option<Report>> {
    self.read(move |conn| queries::find_report(conn, id)).await
  }

  async fn list_reports<'a>(&'a self, query: &'a ReportQuery) -> Result<Vec<Report>> {
    let query = query.clone();
    self.read(move |conn| queries::list_reports(conn, &query)).await
  }

  // ── Status machine ────────────────────────────────────────────────────────

  async fn update_status(
    &self,
    report_id: Uuid,
    update: StatusUpdate,
    principal: Principal,
  ) -> Result<Report> {
    let actor = principal.user_id;
    let now = Utc::now();

    let (before, report) = self
      .transact(move |tx| {
        let current = queries::locked_report(tx, report_id)?;
        let transition = lifecycle::update_status(&current, &update, &principal, now)?;
        queries::apply_transition(tx, &transition)?;
        Ok((current.status, transition.report))
      })
      .await?;

    info!(%report_id, %actor, from = %before, to = %report.status, "report status updated");
    Ok(report)
  }

  async fn complete_work_with_proof(
    &self,
    report_id: Uuid,
    proof: ProofSubmission,
    principal: Principal,
  ) -> Result<Report> {
    let actor = principal.user_id;
    let items = proof.proof_media_ids.len();
    let now = Utc::now();

    let report = self
      .transact(move |tx| {
        let current = queries::locked_report(tx, report_id)?;
        let transition = lifecycle::submit_proof(&current, &proof, &principal, now)?;
        queries::apply_transition(tx, &transition)?;
        queries::link_media(tx, report_id, &proof.proof_media_ids, RESOLUTION_PROOF, now)?;
        Ok(transition.report)
      })
      .await?;

    info!(%report_id, %actor, items, "work submitted for approval");
    Ok(report)
  }

  async fn approve_report(
    &self,
    report_id: Uuid,
    notes: Option<String>,
    principal: Principal,
  ) -> Result<Report> {
    let actor = principal.user_id;
    let now = Utc::now();

    let report = self
      .transact(move |tx| {
        let current = queries::locked_report(tx, report_id)?;
        let transition = lifecycle::approve(&current, notes.as_deref(), &principal, now)?;
        queries::apply_transition(tx, &transition)?;
        Ok(transition.report)
      })
      .await?;

    info!(%report_id, %actor, "report approved");
    Ok(report)
  }

  async fn reject_report(
    &self,
    report_id: Uuid,
    reason: String,
    principal: Principal,
  ) -> Result<Report> {
    let actor = principal.user_id;
    let now = Utc::now();

    let report = self
      .transact(move |tx| {
        let current = queries::locked_report(tx, report_id)?;
        let transition = lifecycle::reject(&current, &reason, &principal, now)?;
        queries::apply_transition(tx, &transition)?;
        Ok(transition.report)
      })
      .await?;

    info!(%report_id, %actor, status = %report.status, "report rejected");
    Ok(report)
  }

  // ── Assignment ────────────────────────────────────────────────────────────

  async fn assign_to_team(
    &self,
    report_id: Uuid,
    team_id: Uuid,
    principal: Principal,
  ) -> Result<Assignment> {
    let actor = principal.user_id;
    let now = Utc::now();

    let plan = self
      .transact(move |tx| {
        let report = queries::locked_report(tx, report_id)?;
        let team = queries::require_team(tx, team_id)?;
        let current = queries::find_active_assignment(tx, report_id)?;
        let plan =
          assignment::plan_team_assignment(&report, &team, current.as_ref(), &principal, now)?;
        Self::write_assignment_plan(tx, &plan)?;
        Ok(plan)
      })
      .await?;

    info!(
      %report_id,
      %actor,
      %team_id,
      assignment_id = %plan.assignment.assignment_id,
      superseded = plan.superseded.is_some(),
      "report assigned to team"
    );
    Ok(plan.assignment)
  }

  async fn assign_to_user(
    &self,
    report_id: Uuid,
    user_id: Uuid,
    principal: Principal,
  ) -> Result<Assignment> {
    let actor = principal.user_id;
    let now = Utc::now();

    let plan = self
      .transact(move |tx| {
        let report = queries::locked_report(tx, report_id)?;
        let user = queries::require_user(tx, user_id)?;
        let current = queries::find_active_assignment(tx, report_id)?;
        let plan =
          assignment::plan_user_assignment(&report, &user, current.as_ref(), &principal, now)?;
        Self::write_assignment_plan(tx, &plan)?;
        Ok(plan)
      })
      .await?;

    info!(
      %report_id,
      %actor,
      %user_id,
      assignment_id = %plan.assignment.assignment_id,
      superseded = plan.superseded.is_some(),
      "report assigned to user"
    );
    Ok(plan.assignment)
  }

  async fn accept_assignment(&self, assignment_id: Uuid, principal: Principal) -> Result<Assignment> {
    let actor = principal.user_id;
    let now = Utc::now();

    let accepted = self
      .transact(move |tx| {
        let current = queries::find_assignment(tx, assignment_id)?
          .ok_or(civic_core::Error::NotFound(Entity::Assignment, assignment_id))?;
        let accepted = assignment::accept(&current, &principal, now)?;
        queries::save_assignment(tx, &accepted)?;
        Ok(accepted)
      })
      .await?;

    info!(%assignment_id, report_id = %accepted.report_id, %actor, "assignment accepted");
    Ok(accepted)
  }

  async fn get_assignment(&self, id: Uuid) -> Result<Option<Assignment>> {
    self.read(move |conn| queries::find_assignment(conn, id)).await
  }

  async fn assignments(&self, report_id: Uuid) -> Result<Vec<Assignment>> {
    self.read(move |conn| queries::list_assignments(conn, report_id)).await
  }

  async fn active_assignment(&self, report_id: Uuid) -> Result<Option<Assignment>> {
    self
      .read(move |conn| queries::find_active_assignment(conn, report_id))
      .await
  }

  // ── Forwarding ────────────────────────────────────────────────────────────

  async fn forward(
    &self,
    report_id: Uuid,
    request: ForwardRequest,
    principal: Principal,
  ) -> Result<Report> {
    let actor = principal.user_id;
    let now = Utc::now();

    let plan = self
      .transact(move |tx| {
        let report = queries::locked_report(tx, report_id)?;
        let target = queries::require_department(tx, request.target_department_id)?;
        let active = queries::find_active_assignment(tx, report_id)?;
        let plan =
          forwarding::plan_forward(&report, &request, &target, active.as_ref(), &principal, now)?;

        queries::save_report(tx, &plan.report)?;
        queries::insert_department_history(tx, &plan.department_history)?;
        if let Some(h) = &plan.status_history {
          queries::insert_status_history(tx, h)?;
        }
        if let Some(a) = &plan.cancelled {
          queries::save_assignment(tx, a)?;
        }
        Ok(plan)
      })
      .await?;

    info!(
      %report_id,
      %actor,
      from = %plan.department_history.previous_department_id,
      to = %plan.department_history.new_department_id,
      cancelled_assignment = plan.cancelled.is_some(),
      "report forwarded"
    );
    Ok(plan.report)
  }

  // ── Support ledger ────────────────────────────────────────────────────────

  async fn add_support(&self, report_id: Uuid, principal: Principal) -> Result<SupportOutcome> {
    let user_id = principal.user_id;
    let now = Utc::now();

    let outcome = self
      .transact(move |tx| {
        let report = queries::locked_report(tx, report_id)?;
        support::check_support(&report, &principal)?;
        Ok(if queries::insert_support(tx, report_id, user_id, now)? {
          SupportOutcome::Added
        } else {
          SupportOutcome::AlreadySupported
        })
      })
      .await?;

    if outcome.changed() {
      info!(%report_id, %user_id, "support added");
    } else {
      debug!(%report_id, %user_id, "report already supported");
    }
    Ok(outcome)
  }

  async fn remove_support(&self, report_id: Uuid, principal: Principal) -> Result<SupportOutcome> {
    let user_id = principal.user_id;

    let outcome = self
      .transact(move |tx| {
        queries::locked_report(tx, report_id)?;
        Ok(if queries::delete_support(tx, report_id, user_id)? {
          SupportOutcome::Removed
        } else {
          SupportOutcome::NotSupported
        })
      })
      .await?;

    if outcome.changed() {
      info!(%report_id, %user_id, "support removed");
    } else {
      debug!(%report_id, %user_id, "report was not supported");
    }
    Ok(outcome)
  }

  async fn supports(&self, report_id: Uuid) -> Result<Vec<ReportSupport>> {
    self.read(move |conn| queries::list_supports(conn, report_id)).await
  }

  // ── Audit trail ───────────────────────────────────────────────────────────

  async fn status_history(&self, report_id: Uuid) -> Result<Vec<StatusHistoryEntry>> {
    self
      .read(move |conn| queries::list_status_history(conn, report_id))
      .await
  }

  async fn department_history(&self, report_id: Uuid) -> Result<Vec<DepartmentHistoryEntry>> {
    self
      .read(move |conn| queries::list_department_history(conn, report_id))
      .await
  }

  async fn proof_media(&self, report_id: Uuid) -> Result<Vec<i64>> {
    self
      .read(move |conn| queries::list_media(conn, report_id, RESOLUTION_PROOF))
      .await
  }
}
