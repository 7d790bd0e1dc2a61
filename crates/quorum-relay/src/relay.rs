//! The token relay: identity changes → cookie + interception agent.

use std::sync::Arc;

use quorum_core::profile::Identity;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
  Result,
  agent::{AgentMailbox, AgentMessage},
  cookie::{self, CookieJar},
  provider::IdentityProvider,
  token::TOKEN_TTL_SECS,
};

/// Propagates the signed-in identity's token to the cookie and the agent.
///
/// There is no refresh: a token is fetched only when the identity changes.
pub struct TokenRelay<P> {
  provider: Arc<P>,
  jar:      CookieJar,
  mailbox:  AgentMailbox,
}

impl<P: IdentityProvider + 'static> TokenRelay<P> {
  pub fn new(provider: Arc<P>, jar: CookieJar, mailbox: AgentMailbox) -> Self {
    Self { provider, jar, mailbox }
  }

  /// React to one identity change.
  ///
  /// Signed in: fetch a token, store it in the cookie, then forward it to
  /// the agent. Signed out: expire the cookie; the agent is not told.
  pub async fn on_identity_changed(
    &self,
    identity: Option<&Identity>,
  ) -> Result<()> {
    match identity {
      Some(identity) => {
        let token = self.provider.id_token().await?;
        self.jar.apply(&cookie::set_auth_cookie(&token, TOKEN_TTL_SECS));
        self.mailbox.post(AgentMessage::AuthToken { token }).await?;
        info!(uid = %identity.uid, "session token relayed");
      }
      None => {
        self.jar.apply(&cookie::clear_auth_cookie());
        info!("session cookie cleared");
      }
    }
    Ok(())
  }

  /// Subscribe to the provider and relay every change, starting with the
  /// current identity, until the returned handle is dropped.
  pub fn spawn(self) -> RelayHandle {
    let mut changes = self.provider.subscribe();
    let task = tokio::spawn(async move {
      loop {
        let identity = changes.borrow_and_update().clone();
        if let Err(e) = self.on_identity_changed(identity.as_ref()).await {
          warn!("token relay failed: {e}");
        }
        if changes.changed().await.is_err() {
          break;
        }
      }
    });
    RelayHandle { task }
  }
}

/// Cancels the relay's subscription when dropped.
pub struct RelayHandle {
  task: JoinHandle<()>,
}

impl RelayHandle {
  /// Stop relaying now rather than at drop.
  pub fn cancel(self) {}
}

impl Drop for RelayHandle {
  fn drop(&mut self) { self.task.abort(); }
}
