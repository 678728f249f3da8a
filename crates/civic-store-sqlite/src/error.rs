//! Error type for `civic-store-sqlite`.

use civic_core::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A rule in `civic-core` rejected the operation.
  #[error(transparent)]
  Core(#[from] civic_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {column} value: {value:?}")]
  Decode {
    column: &'static str,
    value:  String,
  },

  /// The partial uniqueness index on ACTIVE assignments rejected an insert.
  #[error("report {0} already has an active assignment")]
  ActiveAssignmentConflict(uuid::Uuid),
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      Self::ActiveAssignmentConflict(_) => ErrorKind::Conflict,
      _ => ErrorKind::Internal,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
