//! Core types and rules for the civic report lifecycle engine.
//!
//! No HTTP or database dependencies live here. The rules are pure functions
//! over a locked snapshot of a report; storage backends run them inside a
//! transaction and persist what they return.

pub mod ability;
pub mod assignment;
pub mod directory;
pub mod error;
pub mod forwarding;
pub mod history;
pub mod lifecycle;
pub mod principal;
pub mod report;
pub mod store;
pub mod support;
pub mod transition;

#[cfg(test)]
mod test_support;

pub use error::{Classify, Entity, Error, ErrorKind, Result};
