//! Server-side recovery of the session token from a request.

use http::{HeaderMap, header};

use crate::{
  cookie::{AUTH_COOKIE, cookie_value},
  token::BearerToken,
};

/// The request's bearer token: the `Authorization: Bearer` header first, then
/// the `authToken` cookie. `None` means anonymous.
///
/// Only presence is checked here; verification is up to the caller.
pub fn recover_token(headers: &HeaderMap) -> Option<BearerToken> {
  from_authorization(headers).or_else(|| from_cookie(headers))
}

fn from_authorization(headers: &HeaderMap) -> Option<BearerToken> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = value.split_once(' ')?;
  if !scheme.eq_ignore_ascii_case("bearer") {
    return None;
  }
  BearerToken::parse(token)
}

fn from_cookie(headers: &HeaderMap) -> Option<BearerToken> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|value| value.to_str().ok())
    .find_map(|cookies| cookie_value(cookies, AUTH_COOKIE))
    .and_then(BearerToken::parse)
}
