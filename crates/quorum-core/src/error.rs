//! Error types for `quorum-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// A write was attempted without a signed-in identity.
  #[error("no identity is signed in")]
  Unauthenticated,

  #[error("identity has already voted on post {0}")]
  AlreadyVoted(Uuid),

  #[error("answer {answer_id} not found on post {post_id}")]
  AnswerNotFound { post_id: Uuid, answer_id: Uuid },

  #[error("post not found: {0}")]
  PostNotFound(Uuid),

  #[error("invalid post: {0}")]
  InvalidPost(String),

  /// The store could not be reached at all (closed connection, failed open).
  #[error("backend unavailable: {0}")]
  BackendUnavailable(String),

  /// Any other failed store call.
  #[error("transient failure: {0}")]
  TransientNetworkFailure(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Short machine-readable name, used as the `error` field of API bodies.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Unauthenticated => "unauthenticated",
      Self::AlreadyVoted(_) => "already_voted",
      Self::AnswerNotFound { .. } => "answer_not_found",
      Self::PostNotFound(_) => "post_not_found",
      Self::InvalidPost(_) => "invalid_post",
      Self::BackendUnavailable(_) => "backend_unavailable",
      Self::TransientNetworkFailure(_) => "transient_failure",
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
