//! Request extractors recovering who is calling.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use quorum_core::{profile::Identity, store::DocumentStore};
use quorum_relay::{
  BearerToken, provider::TokenVerifier, recover::recover_token,
};
use tracing::debug;

use crate::ApiState;

/// Presence marker: whether the request carries a session token at all.
///
/// The token is not verified. Use this only to shape read views.
pub struct Viewer(pub Option<BearerToken>);

impl Viewer {
  pub fn is_signed_in(&self) -> bool { self.0.is_some() }
}

impl<St: Send + Sync> FromRequestParts<St> for Viewer {
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &St,
  ) -> Result<Self, Self::Rejection> {
    Ok(Viewer(recover_token(&parts.headers)))
  }
}

/// The verified identity behind the request's token, if any.
///
/// An invalid or expired token yields an anonymous caller; write handlers
/// then fail with `Unauthenticated`.
pub struct Caller(pub Option<Identity>);

impl<S, V> FromRequestParts<ApiState<S, V>> for Caller
where
  S: DocumentStore + 'static,
  V: TokenVerifier + 'static,
{
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S, V>,
  ) -> Result<Self, Self::Rejection> {
    let Some(token) = recover_token(&parts.headers) else {
      return Ok(Caller(None));
    };
    match state.verifier.verify(&token).await {
      Ok(identity) => Ok(Caller(Some(identity))),
      Err(e) => {
        debug!("treating request as anonymous: {e}");
        Ok(Caller(None))
      }
    }
  }
}
