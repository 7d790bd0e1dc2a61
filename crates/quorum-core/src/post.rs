//! Posts and their answer options.
//!
//! A post is immutable once written. Its answers are the only documents whose
//! vote fields ever change, and only through the ledger.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Fewest answer options a post may be created with.
pub const MIN_ANSWERS: usize = 2;

// ─── Post ────────────────────────────────────────────────────────────────────

/// A question with a set of answer options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
  pub post_id:             Uuid,
  pub title:               String,
  pub description:         Option<String>,
  /// `uid` of the identity that created the post.
  pub poster_id:           String,
  pub poster_display_name: Option<String>,
  pub poster_photo_url:    Option<String>,
  pub tags:                BTreeSet<String>,
  pub created_at:          DateTime<Utc>,
  pub modified_at:         DateTime<Utc>,
}

// ─── Answer ──────────────────────────────────────────────────────────────────

/// One answer option of a post.
///
/// `votes` always equals `user_votes.len()`: every increment is paired with
/// exactly one append, and nothing is ever removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
  pub answer_id:  Uuid,
  pub post_id:    Uuid,
  pub text:       String,
  pub votes:      u64,
  /// Voter `uid`s in the order the votes were cast.
  pub user_votes: Vec<String>,
}

impl Answer {
  /// A fresh answer with no votes.
  pub fn new(post_id: Uuid, text: impl Into<String>) -> Self {
    Self {
      answer_id: Uuid::new_v4(),
      post_id,
      text: text.into(),
      votes: 0,
      user_votes: Vec::new(),
    }
  }

  pub fn has_vote_from(&self, uid: &str) -> bool {
    self.user_votes.iter().any(|v| v == uid)
  }

  pub fn is_consistent(&self) -> bool {
    self.votes == self.user_votes.len() as u64
  }
}

// ─── NewPost ─────────────────────────────────────────────────────────────────

/// Input to [`crate::Ledger::create_post`]. Ids and timestamps are assigned
/// by the ledger.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPost {
  pub title:       String,
  pub description: Option<String>,
  pub answers:     Vec<String>,
  #[serde(default)]
  pub tags:        Vec<String>,
}

impl NewPost {
  /// Trim fields, drop a blank description and check the required ones.
  pub fn validated(self) -> Result<Self> {
    let title = self.title.trim().to_owned();
    if title.is_empty() {
      return Err(Error::InvalidPost("title is required".into()));
    }

    let answers: Vec<String> =
      self.answers.iter().map(|a| a.trim().to_owned()).collect();
    if answers.iter().any(String::is_empty) {
      return Err(Error::InvalidPost(
        "all answer options must have text".into(),
      ));
    }
    if answers.len() < MIN_ANSWERS {
      return Err(Error::InvalidPost(format!(
        "a post needs at least {MIN_ANSWERS} answer options"
      )));
    }

    let description = self
      .description
      .map(|d| d.trim().to_owned())
      .filter(|d| !d.is_empty());

    let tags = self
      .tags
      .into_iter()
      .map(|t| t.trim().to_owned())
      .filter(|t| !t.is_empty())
      .collect();

    Ok(Self { title, description, answers, tags })
  }
}
