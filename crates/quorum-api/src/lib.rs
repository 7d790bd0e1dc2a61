//! JSON REST API for Quorum.
//!
//! Exposes an axum [`Router`] over a [`Ledger`] and a [`TokenVerifier`].
//! Session endpoints, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", quorum_api::api_router(ledger.clone(), verifier.clone()))
//! ```

pub mod error;
pub mod extract;
pub mod posts;
pub mod votes;

use std::sync::Arc;

use axum::{Router, routing::get};
use quorum_core::{Ledger, store::DocumentStore};
use quorum_relay::provider::TokenVerifier;

pub use error::ApiError;

/// Shared state threaded through all API handlers.
pub struct ApiState<S, V> {
  pub ledger:   Ledger<S>,
  pub verifier: Arc<V>,
}

impl<S, V> Clone for ApiState<S, V> {
  fn clone(&self) -> Self {
    Self {
      ledger:   self.ledger.clone(),
      verifier: Arc::clone(&self.verifier),
    }
  }
}

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, V>(ledger: Ledger<S>, verifier: Arc<V>) -> Router<()>
where
  S: DocumentStore + 'static,
  V: TokenVerifier + 'static,
{
  Router::new()
    // Posts
    .route("/posts", get(posts::list::<S, V>).post(posts::create::<S, V>))
    .route("/posts/{id}", get(posts::get_one::<S, V>))
    .route("/posts/{id}/answers", get(posts::answers::<S, V>))
    // Votes
    .route("/posts/{id}/vote", get(votes::check::<S, V>).post(votes::cast::<S, V>))
    .with_state(ApiState { ledger, verifier })
}
