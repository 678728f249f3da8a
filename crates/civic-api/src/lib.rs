//! JSON REST API for the civic report lifecycle engine.
//!
//! Exposes an axum [`Router`] backed by any [`civic_core::store::ReportStore`].
//! Authentication happens upstream; the caller's identity arrives in trusted
//! headers (see [`caller`]). Every handler checks the caller's ability against
//! a fresh read of the report, then hands the mutation to the store, which
//! re-validates the state rules under its own lock.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", civic_api::api_router(store.clone()))
//! ```

pub mod caller;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod reports;
pub mod support;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use civic_core::store::ReportStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: ReportStore + 'static,
{
  Router::new()
    // Intake and reads
    .route("/reports", get(reports::list::<S>).post(reports::create::<S>))
    .route("/reports/{id}", get(reports::get_one::<S>))
    .route("/reports/{id}/history", get(reports::history::<S>))
    .route("/reports/{id}/departments", get(reports::departments::<S>))
    .route("/reports/{id}/assignments", get(reports::assignments::<S>))
    // Status machine
    .route("/reports/{id}/status", post(lifecycle::update_status::<S>))
    .route("/reports/{id}/proof", post(lifecycle::submit_proof::<S>))
    .route("/reports/{id}/approve", post(lifecycle::approve::<S>))
    .route("/reports/{id}/reject", post(lifecycle::reject::<S>))
    // Dispatch
    .route("/reports/{id}/assign/team", post(dispatch::assign_team::<S>))
    .route("/reports/{id}/assign/user", post(dispatch::assign_user::<S>))
    .route("/reports/{id}/forward", post(dispatch::forward::<S>))
    .route("/assignments/{id}/accept", post(dispatch::accept::<S>))
    // Support ledger
    .route(
      "/reports/{id}/support",
      put(support::add::<S>).delete(support::remove::<S>),
    )
    .with_state(store)
}
