//! Error type for `quorum-relay`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no identity is signed in")]
  SignedOut,

  #[error("unknown bearer token")]
  UnknownToken,

  #[error("bearer token expired")]
  Expired,

  #[error("bearer token is blank")]
  BlankToken,

  #[error("interception agent is not running")]
  AgentGone,

  #[error("invalid origin: {0}")]
  InvalidOrigin(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
