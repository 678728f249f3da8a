//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::BTreeSet;

use chrono::Utc;
use civic_core::{
  Classify, ErrorKind,
  assignment::{Assignee, Assignment, AssignmentStatus},
  directory::{Department, NewDepartment, NewTeam, NewUser, Team, TeamStatus, User},
  forwarding::ForwardRequest,
  lifecycle::{ProofSubmission, StatusUpdate},
  principal::{Principal, Role},
  report::{NewReport, Report, ReportStatus, SubStatus},
  store::{ReportQuery, ReportStore},
  support::SupportOutcome,
};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::{Error, SqliteStore, queries};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// A store seeded with two departments, a crew and the usual cast.
struct World {
  store:      SqliteStore,
  roads:      Department,
  parks:      Department,
  crew:       Team,
  worker:     User,
  citizen:    Principal,
  neighbour:  Principal,
  supervisor: Principal,
  member:     Principal,
  admin:      Principal,
}

async fn world() -> World {
  let store = store().await;

  let roads = store
    .add_department(NewDepartment { name: "Roads".into(), is_active: true })
    .await
    .unwrap();
  let parks = store
    .add_department(NewDepartment { name: "Parks".into(), is_active: true })
    .await
    .unwrap();
  let crew = store
    .add_team(NewTeam {
      name:          "Asphalt crew".into(),
      department_id: roads.department_id,
      status:        TeamStatus::Available,
    })
    .await
    .unwrap();
  let worker = store
    .add_user(NewUser {
      display_name:  "Wren".into(),
      department_id: Some(roads.department_id),
      roles:         BTreeSet::from([Role::TeamMember]),
    })
    .await
    .unwrap();

  World {
    citizen: Principal::new(Uuid::new_v4(), [Role::Citizen]),
    neighbour: Principal::new(Uuid::new_v4(), [Role::Citizen]),
    supervisor: Principal::new(Uuid::new_v4(), [Role::DepartmentSupervisor])
      .with_department(roads.department_id),
    member: Principal::new(worker.user_id, [Role::TeamMember]).with_department(roads.department_id),
    admin: Principal::new(Uuid::new_v4(), [Role::SystemAdmin]),
    store,
    roads,
    parks,
    crew,
    worker,
  }
}

impl World {
  async fn open_report(&self) -> Report {
    self
      .store
      .create_report(
        NewReport {
          title:         "Pothole on Main St".into(),
          description:   "Deep enough to lose a wheel".into(),
          category:      Some("roads".into()),
          department_id: self.roads.department_id,
        },
        self.citizen.clone(),
      )
      .await
      .unwrap()
  }

  /// OPEN, then assigned to the worker, which starts the work.
  async fn in_progress_report(&self) -> Report {
    let r = self.open_report().await;
    self
      .store
      .assign_to_user(r.report_id, self.worker.user_id, self.supervisor.clone())
      .await
      .unwrap();
    self.reload(&r).await
  }

  async fn pending_report(&self) -> Report {
    let r = self.in_progress_report().await;
    self
      .store
      .complete_work_with_proof(r.report_id, proof(&[101]), self.member.clone())
      .await
      .unwrap()
  }

  async fn reload(&self, r: &Report) -> Report {
    self.store.get_report(r.report_id).await.unwrap().unwrap()
  }

  async fn history_len(&self, r: &Report) -> usize {
    self.store.status_history(r.report_id).await.unwrap().len()
  }

  async fn active_count(&self, r: &Report) -> usize {
    let all = self.store.assignments(r.report_id).await.unwrap();
    all.iter().filter(|a| a.is_active()).count()
  }
}

fn proof(ids: &[i64]) -> ProofSubmission {
  ProofSubmission {
    proof_media_ids:  ids.to_vec(),
    resolution_notes: Some("patched and rolled".into()),
  }
}

// ─── Directory ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn directory_round_trips() {
  let w = world().await;

  let team = w.store.get_team(w.crew.team_id).await.unwrap().unwrap();
  assert_eq!(team, w.crew);

  let user = w.store.get_user(w.worker.user_id).await.unwrap().unwrap();
  assert_eq!(user.roles, BTreeSet::from([Role::TeamMember]));
  assert_eq!(user.department_id, Some(w.roads.department_id));

  assert!(w.store.get_department(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn team_requires_existing_department() {
  let s = store().await;
  let err = s
    .add_team(NewTeam {
      name:          "Ghost crew".into(),
      department_id: Uuid::new_v4(),
      status:        TeamStatus::Available,
    })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ─── Intake ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_report_writes_initial_history() {
  let w = world().await;
  let r = w.open_report().await;

  assert_eq!(r.status, ReportStatus::Open);
  assert_eq!(r.sub_status, SubStatus::None);
  assert_eq!(r.owner_user_id, w.citizen.user_id);
  assert_eq!(r.support_count, 0);
  assert_eq!(w.reload(&r).await, r);

  let history = w.store.status_history(r.report_id).await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].previous_status, None);
  assert_eq!(history[0].new_status, ReportStatus::Open);
  assert_eq!(history[0].actor_user_id, w.citizen.user_id);
}

#[tokio::test]
async fn create_report_requires_active_department() {
  let w = world().await;
  let closed = w
    .store
    .add_department(NewDepartment { name: "Archive".into(), is_active: false })
    .await
    .unwrap();

  let input = |department_id| NewReport {
    title: "Flooded underpass".into(),
    description: "Knee deep".into(),
    category: None,
    department_id,
  };

  let err = w
    .store
    .create_report(input(closed.department_id), w.citizen.clone())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let err = w
    .store
    .create_report(input(Uuid::new_v4()), w.citizen.clone())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);

  let all = w.store.list_reports(&ReportQuery::default()).await.unwrap();
  assert!(all.is_empty());
}

#[tokio::test]
async fn list_reports_filters_newest_first() {
  let w = world().await;
  let first = w.open_report().await;
  let second = w.open_report().await;
  w.store
    .update_status(
      second.report_id,
      StatusUpdate::to(ReportStatus::InReview),
      w.supervisor.clone(),
    )
    .await
    .unwrap();

  let all = w.store.list_reports(&ReportQuery::default()).await.unwrap();
  let ids: Vec<_> = all.iter().map(|r| r.report_id).collect();
  assert_eq!(ids, vec![second.report_id, first.report_id]);

  let open = w
    .store
    .list_reports(&ReportQuery { status: Some(ReportStatus::Open), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(open.len(), 1);
  assert_eq!(open[0].report_id, first.report_id);

  let page = w
    .store
    .list_reports(&ReportQuery { limit: Some(1), offset: Some(1), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(page[0].report_id, first.report_id);

  let elsewhere = w
    .store
    .list_reports(&ReportQuery {
      department_id: Some(w.parks.department_id),
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(elsewhere.is_empty());
}

#[tokio::test]
async fn oversized_page_bounds_saturate() {
  let w = world().await;
  let r = w.open_report().await;

  let all = w
    .store
    .list_reports(&ReportQuery { limit: Some(usize::MAX), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].report_id, r.report_id);

  // Wrapping to -1 would read as OFFSET 0 and return the report.
  let past_end = w
    .store
    .list_reports(&ReportQuery { offset: Some(usize::MAX), ..Default::default() })
    .await
    .unwrap();
  assert!(past_end.is_empty());
}

// ─── Status machine ──────────────────────────────────────────────────────────

#[tokio::test]
async fn supervisor_moves_open_to_in_review() {
  let w = world().await;
  let r = w.open_report().await;

  let updated = w
    .store
    .update_status(r.report_id, StatusUpdate::to(ReportStatus::InReview), w.supervisor.clone())
    .await
    .unwrap();
  assert_eq!(updated.status, ReportStatus::InReview);

  let history = w.store.status_history(r.report_id).await.unwrap();
  assert_eq!(history.len(), 2);
  assert_eq!(history[1].previous_status, Some(ReportStatus::Open));
  assert_eq!(history[1].new_status, ReportStatus::InReview);
  assert_eq!(history[1].actor_user_id, w.supervisor.user_id);
}

#[tokio::test]
async fn illegal_transition_changes_nothing() {
  let w = world().await;
  let r = w.open_report().await;

  let attempts = [
    (w.citizen.clone(), ReportStatus::InProgress),
    (w.citizen.clone(), ReportStatus::Done),
    (w.citizen.clone(), ReportStatus::Open),
    (w.member.clone(), ReportStatus::Done),
    (w.supervisor.clone(), ReportStatus::Open),
  ];
  for (principal, to) in attempts {
    let err = w
      .store
      .update_status(r.report_id, StatusUpdate::to(to), principal)
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation, "OPEN -> {to}");
  }

  assert_eq!(w.reload(&r).await, r);
  assert_eq!(w.history_len(&r).await, 1);
}

#[tokio::test]
async fn rejected_without_reason_rolls_back() {
  let w = world().await;
  let r = w.open_report().await;

  let err = w
    .store
    .update_status(r.report_id, StatusUpdate::to(ReportStatus::Rejected), w.supervisor.clone())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
  assert_eq!(w.reload(&r).await.status, ReportStatus::Open);
  assert_eq!(w.history_len(&r).await, 1);
}

#[tokio::test]
async fn update_status_on_missing_report_is_not_found() {
  let w = world().await;
  let err = w
    .store
    .update_status(Uuid::new_v4(), StatusUpdate::to(ReportStatus::InReview), w.admin.clone())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn owner_cancels_open_report() {
  let w = world().await;
  let r = w.open_report().await;

  let cancelled = w
    .store
    .update_status(r.report_id, StatusUpdate::to(ReportStatus::Cancelled), w.citizen.clone())
    .await
    .unwrap();
  assert_eq!(cancelled.status, ReportStatus::Cancelled);
  assert_eq!(cancelled.closed_by_user_id, Some(w.citizen.user_id));
}

#[tokio::test]
async fn done_via_update_completes_assignment() {
  let w = world().await;
  let r = w.in_progress_report().await;

  let mut update = StatusUpdate::to(ReportStatus::Done);
  update.resolution_notes = Some("filled".into());
  let done = w.store.update_status(r.report_id, update, w.member.clone()).await.unwrap();

  assert_eq!(done.status, ReportStatus::Done);
  assert!(done.resolved_at.is_some());
  assert_eq!(done.resolution_notes.as_deref(), Some("filled"));

  let assignments = w.store.assignments(r.report_id).await.unwrap();
  assert_eq!(assignments.len(), 1);
  assert_eq!(assignments[0].status, AssignmentStatus::Completed);
  assert!(assignments[0].completed_at.is_some());
  assert!(w.store.active_assignment(r.report_id).await.unwrap().is_none());
}

#[tokio::test]
async fn admin_cancel_cancels_assignment() {
  let w = world().await;
  let r = w.in_progress_report().await;

  w.store
    .update_status(r.report_id, StatusUpdate::to(ReportStatus::Cancelled), w.admin.clone())
    .await
    .unwrap();

  let assignments = w.store.assignments(r.report_id).await.unwrap();
  assert_eq!(assignments[0].status, AssignmentStatus::Cancelled);
  assert!(assignments[0].cancelled_at.is_some());
}

#[tokio::test]
async fn reopening_clears_resolution() {
  let w = world().await;
  let r = w.pending_report().await;
  w.store.approve_report(r.report_id, None, w.supervisor.clone()).await.unwrap();

  let reopened = w
    .store
    .update_status(r.report_id, StatusUpdate::to(ReportStatus::InReview), w.admin.clone())
    .await
    .unwrap();
  assert_eq!(reopened.status, ReportStatus::InReview);
  assert_eq!(reopened.resolved_at, None);
  assert_eq!(reopened.closed_by_user_id, None);
}

// ─── Proof, approval, rejection ──────────────────────────────────────────────

#[tokio::test]
async fn proof_marks_pending_approval() {
  let w = world().await;
  let r = w.in_progress_report().await;
  let before = w.history_len(&r).await;

  let pending = w
    .store
    .complete_work_with_proof(r.report_id, proof(&[101]), w.member.clone())
    .await
    .unwrap();

  assert_eq!(pending.status, ReportStatus::InProgress);
  assert_eq!(pending.sub_status, SubStatus::PendingApproval);
  assert_eq!(pending.resolution_notes.as_deref(), Some("patched and rolled"));
  assert_eq!(w.store.proof_media(r.report_id).await.unwrap(), vec![101]);

  let history = w.store.status_history(r.report_id).await.unwrap();
  assert_eq!(history.len(), before + 1);
  let last = history.last().unwrap();
  assert_eq!(last.previous_sub_status, SubStatus::None);
  assert_eq!(last.new_sub_status, SubStatus::PendingApproval);
}

#[tokio::test]
async fn proof_outside_in_progress_links_nothing() {
  let w = world().await;
  let r = w.open_report().await;

  let err = w
    .store
    .complete_work_with_proof(r.report_id, proof(&[5, 6]), w.member.clone())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
  assert!(w.store.proof_media(r.report_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn approve_closes_pending_report() {
  let w = world().await;
  let r = w.pending_report().await;

  let done = w
    .store
    .approve_report(r.report_id, Some("good work".into()), w.supervisor.clone())
    .await
    .unwrap();

  assert_eq!(done.status, ReportStatus::Done);
  assert_eq!(done.sub_status, SubStatus::None);
  assert!(done.resolved_at.is_some());
  assert_eq!(done.closed_by_user_id, Some(w.supervisor.user_id));

  let assignments = w.store.assignments(r.report_id).await.unwrap();
  assert_eq!(assignments[0].status, AssignmentStatus::Completed);
}

#[tokio::test]
async fn approve_requires_pending_approval() {
  let w = world().await;

  for r in [w.open_report().await, w.in_progress_report().await] {
    let before = w.history_len(&r).await;
    let err = w
      .store
      .approve_report(r.report_id, None, w.supervisor.clone())
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(w.reload(&r).await, r);
    assert_eq!(w.history_len(&r).await, before);
  }
}

#[tokio::test]
async fn reject_bounces_pending_work() {
  let w = world().await;
  let r = w.pending_report().await;

  let bounced = w
    .store
    .reject_report(r.report_id, "incomplete".into(), w.supervisor.clone())
    .await
    .unwrap();

  assert_eq!(bounced.status, ReportStatus::InProgress);
  assert_eq!(bounced.sub_status, SubStatus::None);
  assert_eq!(bounced.rejection_reason.as_deref(), Some("incomplete"));
  assert!(w.store.active_assignment(r.report_id).await.unwrap().is_some());
}

#[tokio::test]
async fn reject_closes_open_report() {
  let w = world().await;
  let r = w.open_report().await;

  let rejected = w
    .store
    .reject_report(r.report_id, "private property".into(), w.supervisor.clone())
    .await
    .unwrap();
  assert_eq!(rejected.status, ReportStatus::Rejected);
  assert_eq!(rejected.closed_by_user_id, Some(w.supervisor.user_id));
}

// ─── Assignment ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn team_assignment_starts_review() {
  let w = world().await;
  let r = w.open_report().await;

  let a = w
    .store
    .assign_to_team(r.report_id, w.crew.team_id, w.supervisor.clone())
    .await
    .unwrap();

  assert_eq!(a.assignee, Assignee::Team { assignee_team_id: w.crew.team_id });
  assert!(a.accepted_at.is_some());
  assert_eq!(w.reload(&r).await.status, ReportStatus::InReview);
  assert_eq!(w.history_len(&r).await, 2);
  assert_eq!(w.store.get_assignment(a.assignment_id).await.unwrap(), Some(a));
}

#[tokio::test]
async fn reassignment_supersedes_previous() {
  let w = world().await;
  let r = w.open_report().await;

  let first = w
    .store
    .assign_to_team(r.report_id, w.crew.team_id, w.supervisor.clone())
    .await
    .unwrap();
  let second = w
    .store
    .assign_to_user(r.report_id, w.worker.user_id, w.supervisor.clone())
    .await
    .unwrap();

  let all = w.store.assignments(r.report_id).await.unwrap();
  assert_eq!(all.len(), 2);
  assert_eq!(all[0].assignment_id, first.assignment_id);
  assert_eq!(all[0].status, AssignmentStatus::Cancelled);
  assert!(all[0].cancelled_at.is_some());
  assert_eq!(w.active_count(&r).await, 1);

  let active = w.store.active_assignment(r.report_id).await.unwrap().unwrap();
  assert_eq!(active.assignment_id, second.assignment_id);
  assert_eq!(w.reload(&r).await.status, ReportStatus::InProgress);
}

#[tokio::test]
async fn busy_team_is_rejected_without_writes() {
  let w = world().await;
  let busy = w
    .store
    .add_team(NewTeam {
      name:          "Night shift".into(),
      department_id: w.roads.department_id,
      status:        TeamStatus::Busy,
    })
    .await
    .unwrap();
  let r = w.open_report().await;

  let err = w
    .store
    .assign_to_team(r.report_id, busy.team_id, w.supervisor.clone())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
  assert!(w.store.assignments(r.report_id).await.unwrap().is_empty());
  assert_eq!(w.reload(&r).await, r);
}

#[tokio::test]
async fn unknown_assignees_are_not_found() {
  let w = world().await;
  let r = w.open_report().await;

  let err = w
    .store
    .assign_to_team(r.report_id, Uuid::new_v4(), w.supervisor.clone())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);

  let err = w
    .store
    .assign_to_user(r.report_id, Uuid::new_v4(), w.supervisor.clone())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn assignee_accepts_once() {
  let w = world().await;
  let r = w.open_report().await;
  let a = w
    .store
    .assign_to_user(r.report_id, w.worker.user_id, w.supervisor.clone())
    .await
    .unwrap();
  assert!(a.accepted_at.is_none());

  let err = w
    .store
    .accept_assignment(a.assignment_id, w.supervisor.clone())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);

  let accepted = w.store.accept_assignment(a.assignment_id, w.member.clone()).await.unwrap();
  assert!(accepted.accepted_at.is_some());

  let err = w
    .store
    .accept_assignment(a.assignment_id, w.member.clone())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let err = w
    .store
    .accept_assignment(Uuid::new_v4(), w.member.clone())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn unique_index_backstops_active_assignment() {
  let w = world().await;
  let r = w.open_report().await;
  w.store
    .assign_to_team(r.report_id, w.crew.team_id, w.supervisor.clone())
    .await
    .unwrap();

  // Bypass the coordinator and write a second ACTIVE row directly.
  let rogue = Assignment {
    assignment_id:       Uuid::new_v4(),
    report_id:           r.report_id,
    assignee:            Assignee::User { assignee_user_id: w.worker.user_id },
    assigned_by_user_id: w.admin.user_id,
    status:              AssignmentStatus::Active,
    assigned_at:         Utc::now(),
    accepted_at:         None,
    completed_at:        None,
    cancelled_at:        None,
    notes:               None,
  };
  let outcome = w
    .store
    .conn
    .call(move |conn| Ok(queries::insert_assignment(conn, &rogue)))
    .await
    .unwrap();

  let err = outcome.unwrap_err();
  assert!(matches!(err, Error::ActiveAssignmentConflict(id) if id == r.report_id));
  assert_eq!(err.kind(), ErrorKind::Conflict);
  assert_eq!(w.active_count(&r).await, 1);
}

// ─── Forwarding ──────────────────────────────────────────────────────────────

fn forward_request(w: &World, r: &Report) -> ForwardRequest {
  ForwardRequest {
    from_department_id:   r.department_id,
    target_department_id: w.parks.department_id,
    reason:               "tree roots, not asphalt".into(),
  }
}

#[tokio::test]
async fn forward_moves_report_and_cancels_assignment() {
  let w = world().await;
  let r = w.in_progress_report().await;
  let before = w.history_len(&r).await;

  let moved = w
    .store
    .forward(r.report_id, forward_request(&w, &r), w.supervisor.clone())
    .await
    .unwrap();

  assert_eq!(moved.department_id, w.parks.department_id);
  assert_eq!(moved.status, ReportStatus::InReview);
  assert_eq!(moved.sub_status, SubStatus::None);
  assert_eq!(w.reload(&r).await, moved);

  assert_eq!(w.active_count(&r).await, 0);
  let assignments = w.store.assignments(r.report_id).await.unwrap();
  assert_eq!(assignments[0].status, AssignmentStatus::Cancelled);

  let moves = w.store.department_history(r.report_id).await.unwrap();
  assert_eq!(moves.len(), 1);
  assert_eq!(moves[0].previous_department_id, w.roads.department_id);
  assert_eq!(moves[0].new_department_id, w.parks.department_id);
  assert_eq!(moves[0].reason, "tree roots, not asphalt");

  let history = w.store.status_history(r.report_id).await.unwrap();
  assert_eq!(history.len(), before + 1);
  assert_eq!(history.last().unwrap().previous_status, Some(ReportStatus::InProgress));
}

#[tokio::test]
async fn forward_with_stale_source_changes_nothing() {
  let w = world().await;
  let r = w.open_report().await;
  let mut request = forward_request(&w, &r);
  request.from_department_id = w.parks.department_id;

  let err = w.store.forward(r.report_id, request, w.supervisor.clone()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
  assert_eq!(w.reload(&r).await, r);
  assert!(w.store.department_history(r.report_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn forward_to_unknown_department_is_not_found() {
  let w = world().await;
  let r = w.open_report().await;
  let mut request = forward_request(&w, &r);
  request.target_department_id = Uuid::new_v4();

  let err = w.store.forward(r.report_id, request, w.supervisor.clone()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ─── Support ledger ──────────────────────────────────────────────────────────

#[tokio::test]
async fn owner_cannot_support() {
  let w = world().await;
  let r = w.open_report().await;

  let err = w.store.add_support(r.report_id, w.citizen.clone()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);
  assert_eq!(w.reload(&r).await.support_count, 0);
  assert!(w.store.supports(r.report_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn support_is_idempotent() {
  let w = world().await;
  let r = w.open_report().await;

  let first = w.store.add_support(r.report_id, w.neighbour.clone()).await.unwrap();
  let second = w.store.add_support(r.report_id, w.neighbour.clone()).await.unwrap();
  assert_eq!(first, SupportOutcome::Added);
  assert_eq!(second, SupportOutcome::AlreadySupported);
  assert_eq!(w.reload(&r).await.support_count, 1);

  let rows = w.store.supports(r.report_id).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].user_id, w.neighbour.user_id);

  let first = w.store.remove_support(r.report_id, w.neighbour.clone()).await.unwrap();
  let second = w.store.remove_support(r.report_id, w.neighbour.clone()).await.unwrap();
  assert_eq!(first, SupportOutcome::Removed);
  assert_eq!(second, SupportOutcome::NotSupported);
  assert_eq!(w.reload(&r).await.support_count, 0);
}

#[tokio::test]
async fn support_count_survives_lifecycle_writes() {
  let w = world().await;
  let r = w.open_report().await;
  w.store.add_support(r.report_id, w.neighbour.clone()).await.unwrap();

  let updated = w
    .store
    .update_status(r.report_id, StatusUpdate::to(ReportStatus::InReview), w.supervisor.clone())
    .await
    .unwrap();
  assert_eq!(updated.support_count, 1);
  assert_eq!(w.reload(&r).await.support_count, 1);
}

#[tokio::test]
async fn support_on_missing_report_is_not_found() {
  let w = world().await;
  let err = w.store.add_support(Uuid::new_v4(), w.neighbour.clone()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ─── Audit trail ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn history_is_append_only() {
  let w = world().await;
  let r = w.open_report().await;

  let update = w
    .store
    .conn
    .call(|conn| Ok(conn.execute("UPDATE report_status_history SET notes = 'edited'", [])))
    .await
    .unwrap();
  assert!(update.is_err());

  let delete = w
    .store
    .conn
    .call(|conn| Ok(conn.execute("DELETE FROM report_status_history", [])))
    .await
    .unwrap();
  assert!(delete.is_err());

  assert_eq!(w.history_len(&r).await, 1);
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_supporters_all_count() {
  let w = world().await;
  let r = w.open_report().await;
  let report_id = r.report_id;

  let mut tasks = JoinSet::new();
  for _ in 0..16 {
    let store = w.store.clone();
    let supporter = Principal::new(Uuid::new_v4(), [Role::Citizen]);
    tasks.spawn(async move { store.add_support(report_id, supporter).await });
  }
  while let Some(joined) = tasks.join_next().await {
    assert_eq!(joined.unwrap().unwrap(), SupportOutcome::Added);
  }

  let rows = w.store.supports(r.report_id).await.unwrap();
  assert_eq!(rows.len(), 16);
  assert_eq!(w.reload(&r).await.support_count, 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_toggles_keep_count_and_rows_in_step() {
  let w = world().await;
  let r = w.open_report().await;
  let report_id = r.report_id;

  let mut tasks = JoinSet::new();
  for i in 0..24 {
    let store = w.store.clone();
    let neighbour = w.neighbour.clone();
    tasks.spawn(async move {
      if i % 2 == 0 {
        store.add_support(report_id, neighbour).await.unwrap();
      } else {
        store.remove_support(report_id, neighbour).await.unwrap();
      }
      let count = store.get_report(report_id).await.unwrap().unwrap().support_count;
      assert!(count <= 1, "support_count drifted to {count}");
    });
  }
  while let Some(joined) = tasks.join_next().await {
    joined.unwrap();
  }

  let rows = w.store.supports(r.report_id).await.unwrap();
  assert!(rows.len() <= 1);
  assert_eq!(w.reload(&r).await.support_count as usize, rows.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_assignments_leave_one_active() {
  let w = world().await;
  let r = w.open_report().await;
  let report_id = r.report_id;

  let mut tasks = JoinSet::new();
  for i in 0..12 {
    let store = w.store.clone();
    let supervisor = w.supervisor.clone();
    let (team_id, user_id) = (w.crew.team_id, w.worker.user_id);
    tasks.spawn(async move {
      if i % 2 == 0 {
        store.assign_to_team(report_id, team_id, supervisor).await
      } else {
        store.assign_to_user(report_id, user_id, supervisor).await
      }
    });
  }
  while let Some(joined) = tasks.join_next().await {
    joined.unwrap().unwrap();
  }

  let all = w.store.assignments(r.report_id).await.unwrap();
  assert_eq!(all.len(), 12);
  let (last, earlier) = all.split_last().unwrap();
  assert_eq!(last.status, AssignmentStatus::Active);
  assert!(earlier.iter().all(|a| a.status == AssignmentStatus::Cancelled));

  let active = w.store.active_assignment(r.report_id).await.unwrap().unwrap();
  assert_eq!(active.assignment_id, last.assignment_id);
}
