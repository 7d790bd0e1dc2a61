//! The `authToken` session cookie.
//!
//! The server side only formats `Set-Cookie` values and reads `Cookie`
//! headers. [`CookieJar`] is the client-side store the relay writes into; it
//! honours `Max-Age` and nothing else.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;

use crate::token::BearerToken;

/// Name of the cookie mirroring the current bearer token.
pub const AUTH_COOKIE: &str = "authToken";

// ─── Header values ───────────────────────────────────────────────────────────

/// `Set-Cookie` value storing `token` for `max_age_secs`.
///
/// Not `HttpOnly`: client scripts read the cookie back.
pub fn set_auth_cookie(token: &BearerToken, max_age_secs: u64) -> String {
  format!(
    "{AUTH_COOKIE}={}; Path=/; Max-Age={max_age_secs}; SameSite=Strict",
    token.as_str()
  )
}

/// `Set-Cookie` value expiring the auth cookie immediately.
pub fn clear_auth_cookie() -> String {
  format!("{AUTH_COOKIE}=; Path=/; Max-Age=0; SameSite=Strict")
}

/// Look up `name` in a `Cookie` request header (`a=1; b=2`).
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
  header.split(';').find_map(|pair| {
    let (key, value) = pair.trim().split_once('=')?;
    (key == name).then_some(value)
  })
}

// ─── Client jar ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct StoredCookie {
  value:   String,
  expires: DateTime<Utc>,
}

/// In-memory cookie store for a single origin.
///
/// Cloning is cheap; clones share the same cookies.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
  cookies: Arc<DashMap<String, StoredCookie>>,
}

impl CookieJar {
  pub fn new() -> Self { Self::default() }

  /// Apply a `Set-Cookie` value. A `Max-Age` of zero or less removes the
  /// cookie; a value without `Max-Age` is ignored.
  pub fn apply(&self, set_cookie: &str) {
    let mut parts = set_cookie.split(';').map(str::trim);
    let Some((name, value)) = parts.next().and_then(|p| p.split_once('='))
    else {
      return;
    };

    let max_age = parts.find_map(|attr| {
      let (key, value) = attr.split_once('=')?;
      key.eq_ignore_ascii_case("max-age").then(|| value.parse::<i64>().ok())?
    });

    match max_age {
      Some(secs) if secs > 0 => {
        self.cookies.insert(name.to_owned(), StoredCookie {
          value:   value.to_owned(),
          expires: Utc::now() + TimeDelta::seconds(secs),
        });
      }
      Some(_) => {
        self.cookies.remove(name);
      }
      None => {}
    }
  }

  /// The unexpired value of `name`, if any.
  pub fn get(&self, name: &str) -> Option<String> {
    let now = Utc::now();
    self.cookies.remove_if(name, |_, c| c.expires <= now);
    self.cookies.get(name).map(|c| c.value.clone())
  }

  /// A `Cookie` request header carrying every unexpired cookie.
  pub fn header(&self) -> Option<String> {
    let now = Utc::now();
    self.cookies.retain(|_, c| c.expires > now);
    let mut pairs: Vec<String> = self
      .cookies
      .iter()
      .map(|entry| format!("{}={}", entry.key(), entry.value().value))
      .collect();
    pairs.sort();
    (!pairs.is_empty()).then(|| pairs.join("; "))
  }
}
