//! The `DocumentStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `quorum-store-sqlite`).
//! Every method is a single document read or write; no method spans more than
//! one document except the collection queries. Cross-document consistency is
//! the [`Ledger`](crate::Ledger)'s concern.

use std::{collections::BTreeSet, future::Future};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  post::{Answer, Post},
  profile::{MarkerWrite, UserProfile, VoteMarker},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Ordering on `created_at` for [`DocumentStore::list_posts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
  #[default]
  Newest,
  Oldest,
}

/// Parameters for [`DocumentStore::list_posts`].
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
  /// Any-match filter: a post is returned if it carries at least one of
  /// these tags. Empty means no filter.
  pub tags: BTreeSet<String>,
  pub sort: SortOrder,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Error bound for store backends.
pub trait BackendError: std::error::Error + Send + Sync + 'static {
  /// Whether the backend itself is unreachable, as opposed to one call having
  /// failed.
  fn is_unavailable(&self) -> bool { false }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the document store backing posts, answers and profiles.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait DocumentStore: Send + Sync {
  type Error: BackendError;

  // ── Posts ─────────────────────────────────────────────────────────────

  fn insert_post<'a>(
    &'a self,
    post: &'a Post,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Retrieve a post by id. Returns `None` if not found.
  fn get_post(
    &self,
    post_id: Uuid,
  ) -> impl Future<Output = Result<Option<Post>, Self::Error>> + Send + '_;

  fn list_posts<'a>(
    &'a self,
    query: &'a PostQuery,
  ) -> impl Future<Output = Result<Vec<Post>, Self::Error>> + Send + 'a;

  // ── Answers ───────────────────────────────────────────────────────────

  fn insert_answer<'a>(
    &'a self,
    answer: &'a Answer,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn get_answer(
    &self,
    post_id: Uuid,
    answer_id: Uuid,
  ) -> impl Future<Output = Result<Option<Answer>, Self::Error>> + Send + '_;

  /// All answers of a post, in no particular order.
  fn list_answers(
    &self,
    post_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Answer>, Self::Error>> + Send + '_;

  /// Answers of a post whose `user_votes` contain `uid`.
  fn answers_voted_by<'a>(
    &'a self,
    post_id: Uuid,
    uid: &'a str,
  ) -> impl Future<Output = Result<Vec<Answer>, Self::Error>> + Send + 'a;

  /// Append `uid` to the answer's `user_votes` and increment `votes` by one,
  /// as a single atomic document update. Returns the updated answer, or
  /// `None` if it does not exist.
  fn record_vote<'a>(
    &'a self,
    post_id: Uuid,
    answer_id: Uuid,
    uid: &'a str,
  ) -> impl Future<Output = Result<Option<Answer>, Self::Error>> + Send + 'a;

  // ── Profiles ──────────────────────────────────────────────────────────

  fn get_profile<'a>(
    &'a self,
    uid: &'a str,
  ) -> impl Future<Output = Result<Option<UserProfile>, Self::Error>> + Send + 'a;

  /// Write a whole profile only if none exists for its `uid`. Returns
  /// whether it was written; an existing profile is left untouched.
  fn create_profile<'a>(
    &'a self,
    profile: &'a UserProfile,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Merge `votes[post_id] = answer_id` into an existing profile. Returns
  /// `false` if there is no profile for `uid`.
  fn merge_profile_vote<'a>(
    &'a self,
    uid: &'a str,
    post_id: Uuid,
    answer_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Merge `last_login = at` into an existing profile. Returns `false` if
  /// there is no profile for `uid`.
  fn touch_last_login<'a>(
    &'a self,
    uid: &'a str,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Vote markers ──────────────────────────────────────────────────────

  /// Create the marker only if none exists for its `(post_id, uid)`.
  fn create_vote_marker<'a>(
    &'a self,
    marker: &'a VoteMarker,
  ) -> impl Future<Output = Result<MarkerWrite, Self::Error>> + Send + 'a;

  /// Remove a marker whose vote could not be recorded.
  fn release_vote_marker<'a>(
    &'a self,
    post_id: Uuid,
    uid: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
