//! [`SqliteStore`], the SQLite implementation of [`DocumentStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use quorum_core::{
  post::{Answer, Post},
  profile::{MarkerWrite, UserProfile, VoteMarker},
  store::{DocumentStore, PostQuery, SortOrder},
};

use crate::{
  Result,
  encode::{
    ANSWER_COLUMNS, POST_COLUMNS, PROFILE_COLUMNS, RawAnswer, RawMarker,
    RawPost, RawProfile, encode_dt, encode_tags, encode_uuid,
    encode_vote_index, vote_index_path,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Quorum document store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All calls
/// are serialised on the connection's thread, which is what makes each
/// single-statement write atomic with respect to every other call.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run raw SQL against the connection, bypassing the record types.
  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: impl Into<String>) -> Result<()> {
    let sql = sql.into();
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Close the underlying connection. Later calls fail as unavailable.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = crate::Error;

  // ── Posts ─────────────────────────────────────────────────────────────────

  async fn insert_post(&self, post: &Post) -> Result<()> {
    let post_id_str     = encode_uuid(post.post_id);
    let title           = post.title.clone();
    let description     = post.description.clone();
    let poster_id       = post.poster_id.clone();
    let display_name    = post.poster_display_name.clone();
    let photo_url       = post.poster_photo_url.clone();
    let tags_str        = encode_tags(&post.tags)?;
    let created_at_str  = encode_dt(post.created_at);
    let modified_at_str = encode_dt(post.modified_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO posts (
             post_id, title, description, poster_id, poster_display_name,
             poster_photo_url, tags, created_at, modified_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            post_id_str,
            title,
            description,
            poster_id,
            display_name,
            photo_url,
            tags_str,
            created_at_str,
            modified_at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>> {
    let id_str = encode_uuid(post_id);

    let raw: Option<RawPost> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts WHERE post_id = ?1"),
            rusqlite::params![id_str],
            RawPost::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawPost::into_post).transpose()
  }

  async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
    // Any-match over the tag array; NULL disables the filter.
    let tags_json = if query.tags.is_empty() {
      None
    } else {
      Some(encode_tags(&query.tags)?)
    };
    let direction = match query.sort {
      SortOrder::Newest => "DESC",
      SortOrder::Oldest => "ASC",
    };

    let raws: Vec<RawPost> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {POST_COLUMNS} FROM posts p
           WHERE ?1 IS NULL
              OR EXISTS (
                   SELECT 1 FROM json_each(p.tags) t
                   WHERE t.value IN (SELECT value FROM json_each(?1))
                 )
           ORDER BY p.created_at {direction}, p.post_id {direction}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![tags_json], RawPost::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPost::into_post).collect()
  }

  // ── Answers ───────────────────────────────────────────────────────────────

  async fn insert_answer(&self, answer: &Answer) -> Result<()> {
    let answer_id_str  = encode_uuid(answer.answer_id);
    let post_id_str    = encode_uuid(answer.post_id);
    let text           = answer.text.clone();
    let votes          = answer.votes as i64;
    let user_votes_str = serde_json::to_string(&answer.user_votes)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO answers (answer_id, post_id, text, votes, user_votes)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            answer_id_str,
            post_id_str,
            text,
            votes,
            user_votes_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_answer(
    &self,
    post_id:   Uuid,
    answer_id: Uuid,
  ) -> Result<Option<Answer>> {
    let post_id_str   = encode_uuid(post_id);
    let answer_id_str = encode_uuid(answer_id);

    let raw: Option<RawAnswer> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {ANSWER_COLUMNS} FROM answers
               WHERE post_id = ?1 AND answer_id = ?2"
            ),
            rusqlite::params![post_id_str, answer_id_str],
            RawAnswer::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAnswer::into_answer).transpose()
  }

  async fn list_answers(&self, post_id: Uuid) -> Result<Vec<Answer>> {
    let post_id_str = encode_uuid(post_id);

    let raws: Vec<RawAnswer> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ANSWER_COLUMNS} FROM answers WHERE post_id = ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![post_id_str], RawAnswer::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAnswer::into_answer).collect()
  }

  async fn answers_voted_by(&self, post_id: Uuid, uid: &str) -> Result<Vec<Answer>> {
    let post_id_str = encode_uuid(post_id);
    let uid         = uid.to_owned();

    let raws: Vec<RawAnswer> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ANSWER_COLUMNS} FROM answers a
           WHERE a.post_id = ?1
             AND EXISTS (
                   SELECT 1 FROM json_each(a.user_votes) v WHERE v.value = ?2
                 )"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![post_id_str, uid], RawAnswer::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAnswer::into_answer).collect()
  }

  async fn record_vote(
    &self,
    post_id:   Uuid,
    answer_id: Uuid,
    uid:       &str,
  ) -> Result<Option<Answer>> {
    let post_id_str   = encode_uuid(post_id);
    let answer_id_str = encode_uuid(answer_id);
    let uid           = uid.to_owned();

    // One statement: the increment and the append cannot be separated.
    let raw: Option<RawAnswer> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "UPDATE answers
               SET votes      = votes + 1,
                   user_votes = json_insert(user_votes, '$[#]', ?3)
               WHERE post_id = ?1 AND answer_id = ?2
               RETURNING {ANSWER_COLUMNS}"
            ),
            rusqlite::params![post_id_str, answer_id_str, uid],
            RawAnswer::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAnswer::into_answer).transpose()
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
    let uid = uid.to_owned();

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM users WHERE uid = ?1"),
            rusqlite::params![uid],
            RawProfile::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn create_profile(&self, profile: &UserProfile) -> Result<bool> {
    let uid            = profile.uid.clone();
    let display_name   = profile.display_name.clone();
    let email          = profile.email.clone();
    let photo_url      = profile.photo_url.clone();
    let votes_str      = encode_vote_index(&profile.votes)?;
    let created_at_str = encode_dt(profile.created_at);
    let last_login_str = profile.last_login.map(encode_dt);
    let updated_at_str = encode_dt(profile.updated_at);

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO users (
             uid, display_name, email, photo_url, votes,
             created_at, last_login, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT (uid) DO NOTHING",
          rusqlite::params![
            uid,
            display_name,
            email,
            photo_url,
            votes_str,
            created_at_str,
            last_login_str,
            updated_at_str,
          ],
        )?)
      })
      .await?;

    Ok(inserted > 0)
  }

  async fn merge_profile_vote(
    &self,
    uid:       &str,
    post_id:   Uuid,
    answer_id: Uuid,
    at:        DateTime<Utc>,
  ) -> Result<bool> {
    let uid           = uid.to_owned();
    let path          = vote_index_path(post_id);
    let answer_id_str = encode_uuid(answer_id);
    let at_str        = encode_dt(at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users
           SET votes = json_set(votes, ?2, ?3), updated_at = ?4
           WHERE uid = ?1",
          rusqlite::params![uid, path, answer_id_str, at_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn touch_last_login(&self, uid: &str, at: DateTime<Utc>) -> Result<bool> {
    let uid    = uid.to_owned();
    let at_str = encode_dt(at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET last_login = ?2, updated_at = ?2 WHERE uid = ?1",
          rusqlite::params![uid, at_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  // ── Vote markers ──────────────────────────────────────────────────────────

  async fn create_vote_marker(&self, marker: &VoteMarker) -> Result<MarkerWrite> {
    let post_id_str   = encode_uuid(marker.post_id);
    let uid           = marker.uid.clone();
    let answer_id_str = encode_uuid(marker.answer_id);
    let at_str        = encode_dt(marker.recorded_at);

    let existing: Option<RawMarker> = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO vote_markers (post_id, uid, answer_id, recorded_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (post_id, uid) DO NOTHING",
          rusqlite::params![post_id_str, uid, answer_id_str, at_str],
        )?;
        if inserted > 0 {
          return Ok(None);
        }

        Ok(Some(conn.query_row(
          "SELECT post_id, uid, answer_id, recorded_at
           FROM vote_markers WHERE post_id = ?1 AND uid = ?2",
          rusqlite::params![post_id_str, uid],
          |row| {
            Ok(RawMarker {
              post_id:     row.get(0)?,
              uid:         row.get(1)?,
              answer_id:   row.get(2)?,
              recorded_at: row.get(3)?,
            })
          },
        )?))
      })
      .await?;

    match existing {
      None => Ok(MarkerWrite::Created),
      Some(raw) => Ok(MarkerWrite::Exists(raw.into_marker()?)),
    }
  }

  async fn release_vote_marker(&self, post_id: Uuid, uid: &str) -> Result<()> {
    let post_id_str = encode_uuid(post_id);
    let uid         = uid.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM vote_markers WHERE post_id = ?1 AND uid = ?2",
          rusqlite::params![post_id_str, uid],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
