//! SQLite backend for the civic report store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every mutation is one
//! `BEGIN IMMEDIATE` transaction: the rules from `civic-core` run against the
//! locked snapshot and their output is written before commit.

mod encode;
mod queries;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
