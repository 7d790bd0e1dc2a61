//! Identity provider seams and a process-local implementation.

use std::{future::Future, sync::Arc};

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use quorum_core::profile::Identity;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{
  Error, Result,
  token::{BearerToken, TOKEN_TTL_SECS},
};

/// Client-side view of an identity provider.
pub trait IdentityProvider: Send + Sync {
  /// Identity changes, starting with the current identity. `None` means
  /// signed out.
  fn subscribe(&self) -> watch::Receiver<Option<Identity>>;

  /// A bearer token for the currently signed-in identity.
  fn id_token(&self) -> impl Future<Output = Result<BearerToken>> + Send + '_;
}

/// Server-side token verification.
pub trait TokenVerifier: Send + Sync {
  fn verify<'a>(
    &'a self,
    token: &'a BearerToken,
  ) -> impl Future<Output = Result<Identity>> + Send + 'a;
}

// ─── Local provider ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Issued {
  identity: Identity,
  expires:  DateTime<Utc>,
}

/// In-process identity provider.
///
/// Issues random tokens valid for a fixed lifetime and keeps them in a shared
/// table. It also tracks one "current" identity for client-side use, which is
/// what [`IdentityProvider::subscribe`] reports. Cloning is cheap; clones
/// share tokens and the current identity.
#[derive(Clone)]
pub struct LocalIdentityProvider {
  tokens:  Arc<DashMap<BearerToken, Issued>>,
  current: Arc<watch::Sender<Option<Identity>>>,
  ttl:     TimeDelta,
}

impl Default for LocalIdentityProvider {
  fn default() -> Self { Self::new() }
}

impl LocalIdentityProvider {
  pub fn new() -> Self { Self::with_ttl_secs(TOKEN_TTL_SECS) }

  pub fn with_ttl_secs(secs: u64) -> Self {
    Self {
      tokens:  Arc::new(DashMap::new()),
      current: Arc::new(watch::Sender::new(None)),
      ttl:     i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX),
    }
  }

  /// Token lifetime in whole seconds.
  pub fn ttl_secs(&self) -> i64 { self.ttl.num_seconds() }

  /// Issue a fresh token for `identity`.
  pub fn issue(&self, identity: &Identity) -> BearerToken {
    let token = BearerToken::generate();
    self.tokens.insert(token.clone(), Issued {
      identity: identity.clone(),
      expires:  Utc::now()
        .checked_add_signed(self.ttl)
        .unwrap_or(DateTime::<Utc>::MAX_UTC),
    });
    debug!(uid = %identity.uid, "token issued");
    token
  }

  /// Forget a token. Returns whether it was known.
  pub fn revoke(&self, token: &BearerToken) -> bool {
    self.tokens.remove(token).is_some()
  }

  /// Drop every expired token. Returns how many were removed.
  pub fn purge_expired(&self) -> usize {
    let now = Utc::now();
    let before = self.tokens.len();
    self.tokens.retain(|_, issued| issued.expires > now);
    before.saturating_sub(self.tokens.len())
  }

  /// Make `identity` the current identity and notify subscribers.
  pub fn sign_in(&self, identity: Identity) {
    info!(uid = %identity.uid, "signed in");
    self.current.send_replace(Some(identity));
  }

  /// Clear the current identity and revoke its outstanding tokens.
  pub fn sign_out(&self) {
    if let Some(previous) = self.current.send_replace(None) {
      self.tokens.retain(|_, issued| issued.identity.uid != previous.uid);
      info!(uid = %previous.uid, "signed out");
    }
  }

  pub fn current(&self) -> Option<Identity> { self.current.borrow().clone() }
}

impl IdentityProvider for LocalIdentityProvider {
  fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
    self.current.subscribe()
  }

  async fn id_token(&self) -> Result<BearerToken> {
    let identity = self.current().ok_or(Error::SignedOut)?;
    Ok(self.issue(&identity))
  }
}

impl TokenVerifier for LocalIdentityProvider {
  async fn verify(&self, token: &BearerToken) -> Result<Identity> {
    let now = Utc::now();
    let issued = self
      .tokens
      .get(token)
      .map(|entry| entry.value().clone())
      .ok_or(Error::UnknownToken)?;

    if issued.expires <= now {
      self.tokens.remove(token);
      return Err(Error::Expired);
    }
    Ok(issued.identity)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn alice() -> Identity {
    Identity { display_name: Some("Alice".into()), ..Identity::new("alice") }
  }

  #[tokio::test]
  async fn issued_token_verifies() {
    let provider = LocalIdentityProvider::new();
    let token = provider.issue(&alice());
    assert_eq!(provider.verify(&token).await.unwrap(), alice());
  }

  #[tokio::test]
  async fn unknown_and_revoked_tokens_fail() {
    let provider = LocalIdentityProvider::new();
    let stranger = BearerToken::generate();
    assert!(matches!(provider.verify(&stranger).await, Err(Error::UnknownToken)));

    let token = provider.issue(&alice());
    assert!(provider.revoke(&token));
    assert!(!provider.revoke(&token));
    assert!(matches!(provider.verify(&token).await, Err(Error::UnknownToken)));
  }

  #[tokio::test]
  async fn expired_tokens_fail_and_are_purged() {
    let provider = LocalIdentityProvider::with_ttl_secs(0);
    let token = provider.issue(&alice());
    let _other = provider.issue(&alice());

    assert!(matches!(provider.verify(&token).await, Err(Error::Expired)));
    assert_eq!(provider.purge_expired(), 1);
  }

  #[tokio::test]
  async fn id_token_requires_sign_in() {
    let provider = LocalIdentityProvider::new();
    assert!(matches!(provider.id_token().await, Err(Error::SignedOut)));

    provider.sign_in(alice());
    let token = provider.id_token().await.unwrap();
    assert_eq!(provider.verify(&token).await.unwrap().uid, "alice");
  }

  #[tokio::test]
  async fn sign_out_notifies_and_revokes() {
    let provider = LocalIdentityProvider::new();
    let mut rx = provider.subscribe();
    assert!(rx.borrow_and_update().is_none());

    provider.sign_in(alice());
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().as_ref().unwrap().uid, "alice");

    let token = provider.id_token().await.unwrap();
    provider.sign_out();
    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().is_none());
    assert!(provider.verify(&token).await.is_err());
  }
}
