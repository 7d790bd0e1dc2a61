//! The bearer token credential.

use std::fmt;

use http::HeaderValue;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Validity of an issued token in seconds, and the default cookie `Max-Age`.
pub const TOKEN_TTL_SECS: u64 = 3600;

/// An opaque short-lived credential proving an identity.
///
/// `Debug` is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BearerToken(String);

impl BearerToken {
  /// Mint a fresh random token.
  pub fn generate() -> Self {
    Self(format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()))
  }

  /// Wrap a token received from elsewhere. Returns `None` for blank input.
  pub fn parse(raw: &str) -> Option<Self> {
    let raw = raw.trim();
    (!raw.is_empty()).then(|| Self(raw.to_owned()))
  }

  pub fn as_str(&self) -> &str { &self.0 }

  /// `Bearer <token>`, ready for an `Authorization` header.
  pub fn authorization(&self) -> Option<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", self.0)).ok()?;
    value.set_sensitive(true);
    Some(value)
  }
}

impl TryFrom<String> for BearerToken {
  type Error = Error;

  fn try_from(raw: String) -> Result<Self> {
    Self::parse(&raw).ok_or(Error::BlankToken)
  }
}

impl From<BearerToken> for String {
  fn from(token: BearerToken) -> Self { token.0 }
}

impl fmt::Debug for BearerToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("BearerToken(..)")
  }
}
