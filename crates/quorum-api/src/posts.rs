//! Handlers for `/posts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/posts` | Optional `?tags=a,b&sort=Newest\|Oldest` |
//! | `POST` | `/posts` | Body: `{"title":..,"answers":[..],"tags":[..]}` |
//! | `GET`  | `/posts/:id` | Post, answers and viewer marker; 404 if not found |
//! | `GET`  | `/posts/:id/answers` | |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use quorum_core::{
  post::{Answer, NewPost, Post},
  store::{DocumentStore, PostQuery, SortOrder},
};
use quorum_relay::provider::TokenVerifier;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
  ApiState,
  error::ApiError,
  extract::{Caller, Viewer},
};

/// A post with its answers.
#[derive(Debug, Serialize)]
pub struct PostDetail {
  pub post:      Post,
  pub answers:   Vec<Answer>,
  pub signed_in: bool,
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  /// Comma-separated; a post matches if it has any of them.
  pub tags: Option<String>,
  pub sort: Option<SortOrder>,
}

impl ListParams {
  pub fn into_query(self) -> PostQuery {
    let tags = self
      .tags
      .iter()
      .flat_map(|t| t.split(','))
      .map(str::trim)
      .filter(|t| !t.is_empty())
      .map(str::to_owned)
      .collect();
    PostQuery { tags, sort: self.sort.unwrap_or_default() }
  }
}

/// `GET /posts[?tags=..][&sort=..]`; failures yield an empty list.
pub async fn list<S, V>(
  State(state): State<ApiState<S, V>>,
  Query(params): Query<ListParams>,
) -> Json<Vec<Post>>
where
  S: DocumentStore + 'static,
  V: TokenVerifier + 'static,
{
  let query = params.into_query();
  match state.ledger.list_posts(&query).await {
    Ok(posts) => Json(posts),
    Err(e) => {
      warn!("listing posts failed: {e}");
      Json(Vec::new())
    }
  }
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /posts`
pub async fn create<S, V>(
  State(state): State<ApiState<S, V>>,
  Caller(identity): Caller,
  Json(body): Json<NewPost>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore + 'static,
  V: TokenVerifier + 'static,
{
  let (post, answers) =
    state.ledger.create_post(identity.as_ref(), body).await?;
  let detail = PostDetail { post, answers, signed_in: true };
  Ok((StatusCode::CREATED, Json(detail)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /posts/:id`
pub async fn get_one<S, V>(
  State(state): State<ApiState<S, V>>,
  viewer: Viewer,
  Path(id): Path<Uuid>,
) -> Result<Json<PostDetail>, ApiError>
where
  S: DocumentStore + 'static,
  V: TokenVerifier + 'static,
{
  let post = state.ledger.get_post(id).await?;
  let answers = load_answers(&state, id).await;
  Ok(Json(PostDetail { post, answers, signed_in: viewer.is_signed_in() }))
}

// ─── Answers ──────────────────────────────────────────────────────────────────

/// `GET /posts/:id/answers`; failures yield an empty list.
pub async fn answers<S, V>(
  State(state): State<ApiState<S, V>>,
  Path(id): Path<Uuid>,
) -> Json<Vec<Answer>>
where
  S: DocumentStore + 'static,
  V: TokenVerifier + 'static,
{
  Json(load_answers(&state, id).await)
}

async fn load_answers<S, V>(state: &ApiState<S, V>, post_id: Uuid) -> Vec<Answer>
where
  S: DocumentStore + 'static,
{
  match state.ledger.list_answers(post_id).await {
    Ok(answers) => answers,
    Err(e) => {
      warn!(%post_id, "listing answers failed: {e}");
      Vec::new()
    }
  }
}
