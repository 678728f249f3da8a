//! Error types for `civic-core`.
//!
//! Every failure maps to exactly one [`ErrorKind`], so callers can pick a
//! transport-level response without re-deriving business meaning.

use strum::Display;
use thiserror::Error;
use uuid::Uuid;

/// The record type a [`Error::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Entity {
  Report,
  Assignment,
  Team,
  User,
  Department,
}

/// Outcome category of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
  /// A referenced record does not exist; nothing was changed.
  NotFound,
  /// The request is illegal for the current state; rolled back before any
  /// write.
  Validation,
  /// The principal is not allowed to perform the action.
  Forbidden,
  /// A storage-level uniqueness guarantee rejected the write.
  Conflict,
  /// Anything else (storage, decoding).
  Internal,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0} not found: {1}")]
  NotFound(Entity, Uuid),

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("forbidden: {0}")]
  Forbidden(String),
}

impl Error {
  pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }

  pub fn forbidden(msg: impl Into<String>) -> Self { Self::Forbidden(msg.into()) }
}

/// Implemented by every error type that crosses a crate boundary, so the
/// outer layers can classify failures from any storage backend.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::NotFound(..) => ErrorKind::NotFound,
      Self::Validation(_) => ErrorKind::Validation,
      Self::Forbidden(_) => ErrorKind::Forbidden,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kinds_map_one_to_one() {
    let id = Uuid::new_v4();
    assert_eq!(Error::NotFound(Entity::Team, id).kind(), ErrorKind::NotFound);
    assert_eq!(Error::validation("x").kind(), ErrorKind::Validation);
    assert_eq!(Error::forbidden("x").kind(), ErrorKind::Forbidden);
  }

  #[test]
  fn not_found_names_the_entity() {
    let id = Uuid::nil();
    let msg = Error::NotFound(Entity::Department, id).to_string();
    assert!(msg.starts_with("department not found"));
  }
}
