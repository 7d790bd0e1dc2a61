//! The request interception agent.
//!
//! The agent holds the most recently forwarded token in volatile memory and
//! attaches it to outgoing same-origin requests. Its state machine is
//! `NoToken → HasToken`; a new `AUTH_TOKEN` message replaces the held token,
//! and [`InterceptionAgent::restart`] drops back to `NoToken`.
//!
//! Messages arrive through an [`AgentMailbox`] and are applied by a background
//! task. Requests read the current state synchronously from a `watch`
//! channel, so a request racing a message sees either the old or the new
//! token, never a torn one.

use std::{
  sync::Arc,
  task::{Context, Poll},
};

use http::{Request, Uri, header};
use serde::{Deserialize, Serialize};
use tokio::{
  sync::{mpsc, watch},
  task::JoinHandle,
};
use tower::{Layer, Service};
use tracing::{debug, info};

use crate::{Error, Result, token::BearerToken};

const MAILBOX_CAPACITY: usize = 16;

// ─── Messages and state ──────────────────────────────────────────────────────

/// A message from the page to the agent.
///
/// Serialises as `{"type":"AUTH_TOKEN","token":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentMessage {
  AuthToken { token: BearerToken },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AgentState {
  #[default]
  NoToken,
  HasToken(BearerToken),
}

impl AgentState {
  pub fn token(&self) -> Option<&BearerToken> {
    match self {
      AgentState::NoToken => None,
      AgentState::HasToken(token) => Some(token),
    }
  }
}

// ─── Origin ──────────────────────────────────────────────────────────────────

/// Scheme, host and port of the page the agent serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
  scheme: String,
  host:   String,
  port:   u16,
}

impl Origin {
  /// Parse an absolute origin such as `https://quorum.example`.
  pub fn parse(raw: &str) -> Result<Self> {
    let uri: Uri = raw.parse().map_err(|_| Error::InvalidOrigin(raw.into()))?;
    Self::of(&uri).ok_or_else(|| Error::InvalidOrigin(raw.into()))
  }

  /// The origin of an absolute URI; `None` for relative ones.
  pub fn of(uri: &Uri) -> Option<Self> {
    let scheme = uri.scheme_str()?.to_ascii_lowercase();
    let host = uri.host()?.to_ascii_lowercase();
    let port = match uri.port_u16() {
      Some(port) => port,
      None => default_port(&scheme)?,
    };
    Some(Self { scheme, host, port })
  }

  /// Whether a request to `uri` stays on this origin. Relative URIs always
  /// do.
  pub fn is_same_origin(&self, uri: &Uri) -> bool {
    if uri.scheme().is_none() && uri.authority().is_none() {
      return true;
    }
    Self::of(uri).is_some_and(|other| other == *self)
  }
}

fn default_port(scheme: &str) -> Option<u16> {
  match scheme {
    "http" => Some(80),
    "https" => Some(443),
    _ => None,
  }
}

// ─── Agent ───────────────────────────────────────────────────────────────────

/// Sending half of the agent's message channel. No reply is ever sent.
#[derive(Debug, Clone)]
pub struct AgentMailbox {
  tx: mpsc::Sender<AgentMessage>,
}

impl AgentMailbox {
  pub async fn post(&self, message: AgentMessage) -> Result<()> {
    self.tx.send(message).await.map_err(|_| Error::AgentGone)
  }

  /// Post a JSON-encoded message, as a page would. Unknown messages are
  /// ignored.
  pub async fn post_json(&self, raw: &str) -> Result<()> {
    match serde_json::from_str::<AgentMessage>(raw) {
      Ok(message) => self.post(message).await,
      Err(e) => {
        debug!("ignoring unrecognised agent message: {e}");
        Ok(())
      }
    }
  }
}

/// The running interception agent for one origin.
pub struct InterceptionAgent {
  origin:  Arc<Origin>,
  mailbox: AgentMailbox,
  state:   Arc<watch::Sender<AgentState>>,
  task:    JoinHandle<()>,
}

impl InterceptionAgent {
  /// Start the agent with no token held.
  pub fn spawn(origin: Origin) -> Self {
    let (tx, mut rx) = mpsc::channel(MAILBOX_CAPACITY);
    let state = Arc::new(watch::Sender::new(AgentState::NoToken));

    let task_state = Arc::clone(&state);
    let task = tokio::spawn(async move {
      while let Some(message) = rx.recv().await {
        match message {
          AgentMessage::AuthToken { token } => {
            debug!("agent received a new token");
            task_state.send_replace(AgentState::HasToken(token));
          }
        }
      }
    });

    Self { origin: Arc::new(origin), mailbox: AgentMailbox { tx }, state, task }
  }

  pub fn mailbox(&self) -> AgentMailbox { self.mailbox.clone() }

  /// Watch the agent's state.
  pub fn state(&self) -> watch::Receiver<AgentState> { self.state.subscribe() }

  /// Forget the held token, as a restarted agent would. Requests pass through
  /// unmodified until the next `AUTH_TOKEN` message.
  pub fn restart(&self) {
    self.state.send_replace(AgentState::NoToken);
    info!("interception agent restarted; token discarded");
  }

  /// A layer attaching the held token to same-origin requests.
  pub fn layer(&self) -> BearerLayer {
    BearerLayer {
      origin: Arc::clone(&self.origin),
      state:  self.state.subscribe(),
    }
  }
}

impl Drop for InterceptionAgent {
  fn drop(&mut self) { self.task.abort(); }
}

// ─── Tower layer ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct BearerLayer {
  origin: Arc<Origin>,
  state:  watch::Receiver<AgentState>,
}

impl<S> Layer<S> for BearerLayer {
  type Service = BearerService<S>;

  fn layer(&self, inner: S) -> Self::Service {
    BearerService {
      inner,
      origin: Arc::clone(&self.origin),
      state: self.state.clone(),
    }
  }
}

/// Sets `Authorization: Bearer <token>` on same-origin requests while the
/// agent holds a token. Everything else passes through untouched.
#[derive(Debug, Clone)]
pub struct BearerService<S> {
  inner:  S,
  origin: Arc<Origin>,
  state:  watch::Receiver<AgentState>,
}

impl<S, B> Service<Request<B>> for BearerService<S>
where
  S: Service<Request<B>>,
{
  type Response = S::Response;
  type Error = S::Error;
  type Future = S::Future;

  fn poll_ready(
    &mut self,
    cx: &mut Context<'_>,
  ) -> Poll<Result<(), Self::Error>> {
    self.inner.poll_ready(cx)
  }

  fn call(&mut self, mut req: Request<B>) -> Self::Future {
    if self.origin.is_same_origin(req.uri()) {
      let value = self.state.borrow().token().and_then(BearerToken::authorization);
      if let Some(value) = value {
        req.headers_mut().insert(header::AUTHORIZATION, value);
      }
    }
    self.inner.call(req)
  }
}
