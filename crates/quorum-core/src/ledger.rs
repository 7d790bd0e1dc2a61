//! The vote ledger: post creation, reads, and the one-vote-per-post protocol.
//!
//! Per `(identity, post)` pair the ledger moves through `NOT_VOTED → VOTED`,
//! and `VOTED` is terminal. The gate for that transition is the store's
//! create-if-absent [`VoteMarker`]; the scan of `user_votes` in front of it
//! only rejects early and covers votes recorded before markers existed.
//!
//! Answer and profile documents are written separately, so the profile's
//! reverse index can lag behind the answers. [`Ledger::check_existing_vote`]
//! repairs it when it notices.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  post::{Answer, NewPost, Post},
  profile::{Identity, MarkerWrite, UserProfile, VoteMarker},
  store::{BackendError, DocumentStore, PostQuery},
};

/// Result of a successful [`Ledger::cast_vote`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteReceipt {
  pub post_id:   Uuid,
  pub answer_id: Uuid,
  /// The answer's vote count after this vote.
  pub votes:     u64,
}

/// Convert a backend error into the ledger's taxonomy.
fn backend<E: BackendError>(e: E) -> Error {
  if e.is_unavailable() {
    Error::BackendUnavailable(e.to_string())
  } else {
    Error::TransientNetworkFailure(Box::new(e))
  }
}

/// Entry point for every read and write the HTTP layers perform.
///
/// Cloning is cheap; the store handle is reference-counted.
pub struct Ledger<S> {
  store: Arc<S>,
}

impl<S> Clone for Ledger<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: DocumentStore> Ledger<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  // ── Posts ─────────────────────────────────────────────────────────────────

  /// Create a post and its answers.
  ///
  /// The post and each answer are separate writes. If an answer write fails
  /// the post stays behind with the answers written so far.
  pub async fn create_post(
    &self,
    identity: Option<&Identity>,
    input: NewPost,
  ) -> Result<(Post, Vec<Answer>)> {
    let identity = identity.ok_or(Error::Unauthenticated)?;
    let input = input.validated()?;

    let now = Utc::now();
    let post = Post {
      post_id:             Uuid::new_v4(),
      title:               input.title,
      description:         input.description,
      poster_id:           identity.uid.clone(),
      poster_display_name: identity.display_name.clone(),
      poster_photo_url:    identity.photo_url.clone(),
      tags:                input.tags.into_iter().collect(),
      created_at:          now,
      modified_at:         now,
    };
    self.store.insert_post(&post).await.map_err(backend)?;

    let mut answers = Vec::with_capacity(input.answers.len());
    for text in input.answers {
      let answer = Answer::new(post.post_id, text);
      if let Err(e) = self.store.insert_answer(&answer).await {
        error!(
          post_id = %post.post_id,
          written = answers.len(),
          "answer write failed after post was created: {e}"
        );
        return Err(backend(e));
      }
      answers.push(answer);
    }

    info!(post_id = %post.post_id, uid = %identity.uid, "post created");
    Ok((post, answers))
  }

  pub async fn get_post(&self, post_id: Uuid) -> Result<Post> {
    self
      .store
      .get_post(post_id)
      .await
      .map_err(backend)?
      .ok_or(Error::PostNotFound(post_id))
  }

  /// Posts matching any of `tags` (all posts if empty), ordered by
  /// `created_at` per `query.sort`.
  pub async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
    self.store.list_posts(query).await.map_err(backend)
  }

  pub async fn list_answers(&self, post_id: Uuid) -> Result<Vec<Answer>> {
    self.store.list_answers(post_id).await.map_err(backend)
  }

  // ── Sign-in bookkeeping ───────────────────────────────────────────────────

  /// Create the identity's profile on first sign-in, otherwise stamp
  /// `last_login`.
  pub async fn record_sign_in(&self, identity: &Identity) -> Result<()> {
    let now = Utc::now();
    let existed = self
      .store
      .touch_last_login(&identity.uid, now)
      .await
      .map_err(backend)?;

    if existed {
      return Ok(());
    }

    let mut profile = UserProfile::for_identity(identity, now);
    profile.last_login = Some(now);
    if self.store.create_profile(&profile).await.map_err(backend)? {
      info!(uid = %identity.uid, "profile created on first sign-in");
    } else {
      // Another write created the profile after the touch missed it.
      self
        .store
        .touch_last_login(&identity.uid, now)
        .await
        .map_err(backend)?;
    }
    Ok(())
  }

  // ── Votes ─────────────────────────────────────────────────────────────────

  /// The answer the identity voted for on `post_id`, if any.
  ///
  /// Never fails: anonymous callers and store failures both yield `None`.
  pub async fn check_existing_vote(
    &self,
    identity: Option<&Identity>,
    post_id: Uuid,
  ) -> Option<Uuid> {
    let identity = identity?;
    match self.lookup_vote(identity, post_id).await {
      Ok(found) => found,
      Err(e) => {
        warn!(%post_id, uid = %identity.uid, "vote lookup failed: {e}");
        None
      }
    }
  }

  async fn lookup_vote(
    &self,
    identity: &Identity,
    post_id: Uuid,
  ) -> Result<Option<Uuid>> {
    let profile = self
      .store
      .get_profile(&identity.uid)
      .await
      .map_err(backend)?;

    if let Some(answer_id) =
      profile.as_ref().and_then(|p| p.votes.get(&post_id))
    {
      return Ok(Some(*answer_id));
    }

    let voted = self
      .store
      .answers_voted_by(post_id, &identity.uid)
      .await
      .map_err(backend)?;
    let Some(answer) = voted.into_iter().next() else {
      return Ok(None);
    };

    // The index is missing an entry the answers know about; write it back.
    if let Err(e) = self
      .upsert_profile_vote(identity, post_id, answer.answer_id)
      .await
    {
      warn!(%post_id, uid = %identity.uid, "profile vote repair failed: {e}");
    }

    Ok(Some(answer.answer_id))
  }

  /// Cast the identity's single vote on `post_id` for `answer_id`.
  pub async fn cast_vote(
    &self,
    identity: Option<&Identity>,
    post_id: Uuid,
    answer_id: Uuid,
  ) -> Result<VoteReceipt> {
    let identity = identity.ok_or(Error::Unauthenticated)?;
    let uid = identity.uid.as_str();

    let voted = self
      .store
      .answers_voted_by(post_id, uid)
      .await
      .map_err(backend)?;
    if !voted.is_empty() {
      info!(%post_id, uid, "rejected repeat vote");
      return Err(Error::AlreadyVoted(post_id));
    }

    self
      .store
      .get_answer(post_id, answer_id)
      .await
      .map_err(backend)?
      .ok_or(Error::AnswerNotFound { post_id, answer_id })?;

    let marker = VoteMarker {
      post_id,
      uid: uid.to_owned(),
      answer_id,
      recorded_at: Utc::now(),
    };
    if let MarkerWrite::Exists(existing) =
      self.store.create_vote_marker(&marker).await.map_err(backend)?
    {
      info!(
        %post_id,
        uid,
        answer_id = %existing.answer_id,
        "rejected concurrent repeat vote"
      );
      return Err(Error::AlreadyVoted(post_id));
    }

    let updated = match self.store.record_vote(post_id, answer_id, uid).await {
      Ok(Some(answer)) => answer,
      Ok(None) => {
        self.release_marker(post_id, uid).await;
        return Err(Error::AnswerNotFound { post_id, answer_id });
      }
      Err(e) => {
        self.release_marker(post_id, uid).await;
        return Err(backend(e));
      }
    };

    if let Err(e) = self.upsert_profile_vote(identity, post_id, answer_id).await
    {
      error!(
        %post_id,
        %answer_id,
        uid,
        "vote recorded but profile index not updated: {e}"
      );
      return Err(e);
    }

    info!(%post_id, %answer_id, uid, votes = updated.votes, "vote recorded");
    Ok(VoteReceipt { post_id, answer_id, votes: updated.votes })
  }

  async fn release_marker(&self, post_id: Uuid, uid: &str) {
    if let Err(e) = self.store.release_vote_marker(post_id, uid).await {
      warn!(%post_id, uid, "failed to release vote marker: {e}");
    }
  }

  /// Merge `votes[post_id] = answer_id` into the profile, creating it if
  /// absent.
  async fn upsert_profile_vote(
    &self,
    identity: &Identity,
    post_id: Uuid,
    answer_id: Uuid,
  ) -> Result<()> {
    let now = Utc::now();
    let merged = self
      .store
      .merge_profile_vote(&identity.uid, post_id, answer_id, now)
      .await
      .map_err(backend)?;

    if merged {
      return Ok(());
    }

    let mut profile = UserProfile::for_identity(identity, now);
    profile.votes.insert(post_id, answer_id);
    if !self.store.create_profile(&profile).await.map_err(backend)? {
      self
        .store
        .merge_profile_vote(&identity.uid, post_id, answer_id, now)
        .await
        .map_err(backend)?;
    }
    Ok(())
  }
}
