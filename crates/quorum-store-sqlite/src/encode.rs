//! Encoding and decoding helpers between Quorum records and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings with a fixed microsecond precision and a
//! `Z` suffix, so lexical order equals chronological order and `ORDER BY
//! created_at` sorts correctly. Array and map fields are compact JSON. UUIDs
//! are hyphenated lowercase strings.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, SecondsFormat, Utc};
use quorum_core::{
  post::{Answer, Post},
  profile::{UserProfile, VoteMarker},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── JSON fields ─────────────────────────────────────────────────────────────

pub fn encode_tags(tags: &BTreeSet<String>) -> Result<String> {
  Ok(serde_json::to_string(tags)?)
}

pub fn decode_tags(s: &str) -> Result<BTreeSet<String>> {
  Ok(serde_json::from_str(s)?)
}

pub fn decode_user_votes(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_vote_index(votes: &BTreeMap<Uuid, Uuid>) -> Result<String> {
  Ok(serde_json::to_string(votes)?)
}

pub fn decode_vote_index(s: &str) -> Result<BTreeMap<Uuid, Uuid>> {
  Ok(serde_json::from_str(s)?)
}

/// JSON path addressing one post's entry in a `users.votes` object.
pub fn vote_index_path(post_id: Uuid) -> String {
  format!("$.\"{}\"", encode_uuid(post_id))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawPost`] field order.
pub const POST_COLUMNS: &str = "post_id, title, description, poster_id, \
   poster_display_name, poster_photo_url, tags, created_at, modified_at";

/// Raw strings read directly from a `posts` row.
pub struct RawPost {
  pub post_id:             String,
  pub title:               String,
  pub description:         Option<String>,
  pub poster_id:           String,
  pub poster_display_name: Option<String>,
  pub poster_photo_url:    Option<String>,
  pub tags:                String,
  pub created_at:          String,
  pub modified_at:         String,
}

impl RawPost {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      post_id:             row.get(0)?,
      title:               row.get(1)?,
      description:         row.get(2)?,
      poster_id:           row.get(3)?,
      poster_display_name: row.get(4)?,
      poster_photo_url:    row.get(5)?,
      tags:                row.get(6)?,
      created_at:          row.get(7)?,
      modified_at:         row.get(8)?,
    })
  }

  pub fn into_post(self) -> Result<Post> {
    Ok(Post {
      post_id:             decode_uuid(&self.post_id)?,
      title:               self.title,
      description:         self.description,
      poster_id:           self.poster_id,
      poster_display_name: self.poster_display_name,
      poster_photo_url:    self.poster_photo_url,
      tags:                decode_tags(&self.tags)?,
      created_at:          decode_dt(&self.created_at)?,
      modified_at:         decode_dt(&self.modified_at)?,
    })
  }
}

/// Column list matching [`RawAnswer`] field order.
pub const ANSWER_COLUMNS: &str = "answer_id, post_id, text, votes, user_votes";

/// Raw values read directly from an `answers` row.
pub struct RawAnswer {
  pub answer_id:  String,
  pub post_id:    String,
  pub text:       String,
  pub votes:      i64,
  pub user_votes: String,
}

impl RawAnswer {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      answer_id:  row.get(0)?,
      post_id:    row.get(1)?,
      text:       row.get(2)?,
      votes:      row.get(3)?,
      user_votes: row.get(4)?,
    })
  }

  /// Decode and check the `votes == len(user_votes)` invariant.
  pub fn into_answer(self) -> Result<Answer> {
    let votes = u64::try_from(self.votes).map_err(|_| {
      Error::Malformed(format!(
        "answer {} has negative vote count {}",
        self.answer_id, self.votes
      ))
    })?;

    let answer = Answer {
      answer_id: decode_uuid(&self.answer_id)?,
      post_id: decode_uuid(&self.post_id)?,
      text: self.text,
      votes,
      user_votes: decode_user_votes(&self.user_votes)?,
    };

    if !answer.is_consistent() {
      return Err(Error::Malformed(format!(
        "answer {} has {} votes but {} voters",
        answer.answer_id,
        answer.votes,
        answer.user_votes.len()
      )));
    }
    Ok(answer)
  }
}

/// Column list matching [`RawProfile`] field order.
pub const PROFILE_COLUMNS: &str = "uid, display_name, email, photo_url, votes, \
   created_at, last_login, updated_at";

/// Raw strings read directly from a `users` row.
pub struct RawProfile {
  pub uid:          String,
  pub display_name: Option<String>,
  pub email:        Option<String>,
  pub photo_url:    Option<String>,
  pub votes:        String,
  pub created_at:   String,
  pub last_login:   Option<String>,
  pub updated_at:   String,
}

impl RawProfile {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      uid:          row.get(0)?,
      display_name: row.get(1)?,
      email:        row.get(2)?,
      photo_url:    row.get(3)?,
      votes:        row.get(4)?,
      created_at:   row.get(5)?,
      last_login:   row.get(6)?,
      updated_at:   row.get(7)?,
    })
  }

  pub fn into_profile(self) -> Result<UserProfile> {
    Ok(UserProfile {
      uid:          self.uid,
      display_name: self.display_name,
      email:        self.email,
      photo_url:    self.photo_url,
      votes:        decode_vote_index(&self.votes)?,
      created_at:   decode_dt(&self.created_at)?,
      last_login:   self.last_login.as_deref().map(decode_dt).transpose()?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `vote_markers` row.
pub struct RawMarker {
  pub post_id:     String,
  pub uid:         String,
  pub answer_id:   String,
  pub recorded_at: String,
}

impl RawMarker {
  pub fn into_marker(self) -> Result<VoteMarker> {
    Ok(VoteMarker {
      post_id:     decode_uuid(&self.post_id)?,
      uid:         self.uid,
      answer_id:   decode_uuid(&self.answer_id)?,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
