//! Identities, user profiles and vote markers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Identity ────────────────────────────────────────────────────────────────

/// A signed-in end user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
  /// Stable, provider-assigned unique id.
  pub uid:          String,
  pub display_name: Option<String>,
  pub email:        Option<String>,
  pub photo_url:    Option<String>,
}

impl Identity {
  pub fn new(uid: impl Into<String>) -> Self {
    Self {
      uid:          uid.into(),
      display_name: None,
      email:        None,
      photo_url:    None,
    }
  }
}

// ─── UserProfile ─────────────────────────────────────────────────────────────

/// One per identity; created lazily on first sign-in or first vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
  pub uid:          String,
  pub display_name: Option<String>,
  pub email:        Option<String>,
  pub photo_url:    Option<String>,
  /// Reverse index: post id → the answer this identity voted for.
  pub votes:        BTreeMap<Uuid, Uuid>,
  pub created_at:   DateTime<Utc>,
  pub last_login:   Option<DateTime<Utc>>,
  pub updated_at:   DateTime<Utc>,
}

impl UserProfile {
  /// A new profile echoing the identity's base fields, with no votes.
  pub fn for_identity(identity: &Identity, now: DateTime<Utc>) -> Self {
    Self {
      uid:          identity.uid.clone(),
      display_name: identity.display_name.clone(),
      email:        identity.email.clone(),
      photo_url:    identity.photo_url.clone(),
      votes:        BTreeMap::new(),
      created_at:   now,
      last_login:   None,
      updated_at:   now,
    }
  }
}

// ─── VoteMarker ──────────────────────────────────────────────────────────────

/// The gate document for a single vote. At most one can exist per
/// `(post_id, uid)`; the store creates it only if absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteMarker {
  pub post_id:     Uuid,
  pub uid:         String,
  pub answer_id:   Uuid,
  pub recorded_at: DateTime<Utc>,
}

/// Outcome of a conditional marker write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerWrite {
  Created,
  /// A marker for the pair was already present; it is returned unchanged.
  Exists(VoteMarker),
}
