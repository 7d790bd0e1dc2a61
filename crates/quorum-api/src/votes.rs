//! Handlers for `/posts/:id/vote`.

use axum::{
  Json,
  extract::{Path, State},
};
use quorum_core::{ledger::VoteReceipt, store::DocumentStore};
use quorum_relay::provider::TokenVerifier;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, error::ApiError, extract::Caller};

#[derive(Debug, Serialize)]
pub struct ExistingVote {
  pub answer_id: Option<Uuid>,
}

/// `GET /posts/:id/vote`: the caller's vote on the post, `null` if none.
pub async fn check<S, V>(
  State(state): State<ApiState<S, V>>,
  Caller(identity): Caller,
  Path(post_id): Path<Uuid>,
) -> Json<ExistingVote>
where
  S: DocumentStore + 'static,
  V: TokenVerifier + 'static,
{
  let answer_id =
    state.ledger.check_existing_vote(identity.as_ref(), post_id).await;
  Json(ExistingVote { answer_id })
}

#[derive(Debug, Deserialize)]
pub struct CastBody {
  pub answer_id: Uuid,
}

/// `POST /posts/:id/vote`, body: `{"answer_id":"<uuid>"}`
pub async fn cast<S, V>(
  State(state): State<ApiState<S, V>>,
  Caller(identity): Caller,
  Path(post_id): Path<Uuid>,
  Json(body): Json<CastBody>,
) -> Result<Json<VoteReceipt>, ApiError>
where
  S: DocumentStore + 'static,
  V: TokenVerifier + 'static,
{
  let receipt = state
    .ledger
    .cast_vote(identity.as_ref(), post_id, body.answer_id)
    .await?;
  Ok(Json(receipt))
}
