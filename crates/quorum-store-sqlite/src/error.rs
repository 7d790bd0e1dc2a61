//! Error type for `quorum-store-sqlite`.

use quorum_core::store::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored document violates its record shape.
  #[error("malformed document: {0}")]
  Malformed(String),
}

impl BackendError for Error {
  fn is_unavailable(&self) -> bool {
    matches!(self, Error::Database(tokio_rusqlite::Error::ConnectionClosed))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
