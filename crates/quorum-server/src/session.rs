//! Session endpoints: sign-in issues a token and sets the `authToken` cookie,
//! sign-out revokes it and expires the cookie.

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
};
use quorum_core::{profile::Identity, store::DocumentStore};
use quorum_relay::{
  BearerToken, agent::Origin, cookie, recover::recover_token,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{AppState, error::Error};

/// Identity claims presented to the local provider.
#[derive(Debug, Deserialize)]
pub struct SignInBody {
  pub uid:          String,
  pub display_name: Option<String>,
  pub email:        Option<String>,
  pub photo_url:    Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
  pub token:      BearerToken,
  pub expires_in: u64,
  pub identity:   Identity,
}

/// Reject requests whose `Origin` header names another site.
fn check_origin(headers: &HeaderMap, expected: &Origin) -> Result<(), Error> {
  let Some(value) = headers.get(header::ORIGIN) else {
    return Ok(());
  };
  let raw = value
    .to_str()
    .map_err(|_| Error::Forbidden("unreadable Origin header".into()))?;
  match Origin::parse(raw) {
    Ok(origin) if origin == *expected => Ok(()),
    _ => Err(Error::Forbidden(format!("cross-origin sign-in from {raw}"))),
  }
}

/// `POST /session`
pub async fn sign_in<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Json(body): Json<SignInBody>,
) -> Result<impl IntoResponse, Error>
where
  S: DocumentStore + 'static,
{
  if !state.config.local_sign_in {
    return Err(Error::Forbidden("local sign-in is disabled".into()));
  }
  check_origin(&headers, &state.origin)?;

  let uid = body.uid.trim();
  if uid.is_empty() {
    return Err(Error::BadRequest("uid must not be empty".into()));
  }
  let identity = Identity {
    uid:          uid.to_owned(),
    display_name: body.display_name,
    email:        body.email,
    photo_url:    body.photo_url,
  };

  // Profile bookkeeping never blocks a sign-in.
  if let Err(e) = state.ledger.record_sign_in(&identity).await {
    warn!(uid = %identity.uid, "sign-in bookkeeping failed: {e}");
  }

  let token = state.provider.issue(&identity);
  let max_age = state.config.cookie_max_age_secs;
  info!(uid = %identity.uid, "session started");

  Ok((
    [(header::SET_COOKIE, cookie::set_auth_cookie(&token, max_age))],
    Json(SessionInfo { token, expires_in: max_age, identity }),
  ))
}

/// `DELETE /session`
pub async fn sign_out<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> impl IntoResponse
where
  S: DocumentStore + 'static,
{
  if let Some(token) = recover_token(&headers)
    && state.provider.revoke(&token)
  {
    info!("session ended");
  }
  (
    StatusCode::NO_CONTENT,
    [(header::SET_COOKIE, cookie::clear_auth_cookie())],
  )
}
