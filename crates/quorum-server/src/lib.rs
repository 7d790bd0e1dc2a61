//! HTTP server for Quorum.
//!
//! Mounts the JSON API under `/api`, plus session and health endpoints, over
//! any [`DocumentStore`].

pub mod error;
pub mod session;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use quorum_core::{Ledger, store::DocumentStore};
use quorum_relay::{
  agent::Origin, provider::LocalIdentityProvider, token::TOKEN_TTL_SECS,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `quorum.toml` and
/// `QUORUM_*` environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  /// Public origin of the site, e.g. `https://quorum.example`.
  pub origin:              String,
  pub cookie_max_age_secs: u64,
  /// Accept `POST /session` claims as-is. The local provider does no
  /// credential check, so this is for development only.
  pub local_sign_in:       bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                "127.0.0.1".to_string(),
      port:                8080,
      store_path:          PathBuf::from("quorum.db"),
      origin:              "http://localhost:8080".to_string(),
      cookie_max_age_secs: TOKEN_TTL_SECS,
      local_sign_in:       false,
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the session handlers.
pub struct AppState<S> {
  pub ledger:   Ledger<S>,
  pub provider: Arc<LocalIdentityProvider>,
  pub config:   Arc<ServerConfig>,
  pub origin:   Arc<Origin>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      ledger:   self.ledger.clone(),
      provider: Arc::clone(&self.provider),
      config:   Arc::clone(&self.config),
      origin:   Arc::clone(&self.origin),
    }
  }
}

impl<S: DocumentStore> AppState<S> {
  /// Build state over `store`, with a provider whose tokens live as long as
  /// the cookie.
  pub fn new(store: Arc<S>, config: ServerConfig) -> quorum_relay::Result<Self> {
    let origin = Origin::parse(&config.origin)?;
    Ok(Self {
      ledger:   Ledger::new(store),
      provider: Arc::new(LocalIdentityProvider::with_ttl_secs(
        config.cookie_max_age_secs,
      )),
      config:   Arc::new(config),
      origin:   Arc::new(origin),
    })
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: DocumentStore + 'static,
{
  let api = quorum_api::api_router(
    state.ledger.clone(),
    Arc::clone(&state.provider),
  );

  Router::new()
    .route("/health", get(health))
    .route(
      "/session",
      post(session::sign_in::<S>).delete(session::sign_out::<S>),
    )
    .with_state(state)
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str { "ok" }

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use quorum_core::{post::NewPost, profile::Identity};
  use quorum_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let config = ServerConfig {
      origin: "https://quorum.example".to_string(),
      local_sign_in: true,
      ..ServerConfig::default()
    };
    AppState::new(Arc::new(store), config).unwrap()
  }

  async fn oneshot_raw(
    state:   AppState<SqliteStore>,
    method:  &str,
    uri:     &str,
    headers: Vec<(header::HeaderName, String)>,
    body:    &str,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    router(state).oneshot(req).await.unwrap()
  }

  fn json_headers() -> Vec<(header::HeaderName, String)> {
    vec![(header::CONTENT_TYPE, "application/json".to_string())]
  }

  fn set_cookie(resp: &Response) -> String {
    resp
      .headers()
      .get(header::SET_COOKIE)
      .and_then(|v| v.to_str().ok())
      .unwrap()
      .to_string()
  }

  /// The `name=value` pair of a `Set-Cookie` header.
  fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().to_string()
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  #[tokio::test]
  async fn health_is_ok() {
    let state = make_state().await;
    let resp = oneshot_raw(state, "GET", "/health", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn sign_in_sets_cookie_and_creates_profile() {
    let state = make_state().await;
    let resp = oneshot_raw(
      state.clone(),
      "POST",
      "/session",
      json_headers(),
      r#"{"uid":"alice","display_name":"Alice"}"#,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = set_cookie(&resp);
    assert!(cookie.starts_with("authToken="));
    assert!(cookie.contains("Max-Age=3600"));
    assert!(cookie.contains("SameSite=Strict"));

    let json = json_body(resp).await;
    assert_eq!(json["expires_in"], 3600);
    assert_eq!(json["identity"]["uid"], "alice");

    let profile = state.ledger.store().get_profile("alice").await.unwrap();
    assert_eq!(profile.unwrap().display_name.as_deref(), Some("Alice"));
  }

  #[tokio::test]
  async fn cookie_session_can_vote_until_signed_out() {
    let state = make_state().await;
    let (post, answers) = state
      .ledger
      .create_post(
        Some(&Identity::new("poster")),
        NewPost {
          title:   "Tea or coffee?".into(),
          answers: vec!["Tea".into(), "Coffee".into()],
          ..Default::default()
        },
      )
      .await
      .unwrap();

    let resp = oneshot_raw(
      state.clone(),
      "POST",
      "/session",
      json_headers(),
      r#"{"uid":"alice"}"#,
    )
    .await;
    let cookie = cookie_pair(&set_cookie(&resp));

    let vote_uri = format!("/api/posts/{}/vote", post.post_id);
    let mut headers = json_headers();
    headers.push((header::COOKIE, cookie.clone()));
    let body = json!({ "answer_id": answers[0].answer_id }).to_string();
    let resp = oneshot_raw(state.clone(), "POST", &vote_uri, headers, &body).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = oneshot_raw(
      state.clone(),
      "DELETE",
      "/session",
      vec![(header::COOKIE, cookie.clone())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(set_cookie(&resp).contains("Max-Age=0"));

    // The revoked token no longer identifies anyone.
    let resp = oneshot_raw(
      state,
      "GET",
      &vote_uri,
      vec![(header::COOKIE, cookie)],
      "",
    )
    .await;
    assert_eq!(json_body(resp).await["answer_id"], Value::Null);
  }

  #[tokio::test]
  async fn cross_origin_sign_in_is_forbidden() {
    let state = make_state().await;
    let mut headers = json_headers();
    headers.push((header::ORIGIN, "https://evil.example".to_string()));
    let resp =
      oneshot_raw(state, "POST", "/session", headers, r#"{"uid":"alice"}"#).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
  }

  #[tokio::test]
  async fn same_origin_sign_in_is_allowed() {
    let state = make_state().await;
    let mut headers = json_headers();
    headers.push((header::ORIGIN, "https://quorum.example".to_string()));
    let resp =
      oneshot_raw(state, "POST", "/session", headers, r#"{"uid":"alice"}"#).await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn blank_uid_is_rejected() {
    let state = make_state().await;
    let resp =
      oneshot_raw(state, "POST", "/session", json_headers(), r#"{"uid":"  "}"#)
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "bad_request");
  }

  #[test]
  fn config_layers_over_defaults() {
    let cfg: ServerConfig = config::Config::builder()
      .add_source(config::File::from_str(
        "port = 9000\norigin = \"https://quorum.example\"",
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.cookie_max_age_secs, 3600);
    assert!(!cfg.local_sign_in);
  }

  #[tokio::test]
  async fn sign_in_is_forbidden_unless_enabled() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let state = AppState::new(Arc::new(store), ServerConfig::default()).unwrap();
    let resp = oneshot_raw(
      state.clone(),
      "POST",
      "/session",
      json_headers(),
      r#"{"uid":"mallory"}"#,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
    assert!(state.ledger.store().get_profile("mallory").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn invalid_origin_is_rejected() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let config = ServerConfig { origin: "not a url".into(), ..Default::default() };
    assert!(AppState::new(Arc::new(store), config).is_err());
  }
}
