use super::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::debug;

pub const MAX_TRACK_ID_LEN: usize = 100;
pub const MAX_TRACK_NAME_LEN: usize = 512;

/// External catalog identifier of a track, primary key of a submission.
#[derive(Clone, Hash, PartialEq, Eq, Debug, Deserialize, Serialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn is_too_long(&self) -> bool {
        self.0.chars().count() > MAX_TRACK_ID_LEN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct InternalSong {
    pub track_id: TrackId,
    pub track_name: String,
    pub submitted_by: UserId,
    pub submitted_at: DateTime<Utc>,
}

/// One line of the tally as seen by a particular user.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct TallyRow {
    pub track_id: TrackId,
    pub track_name: String,
    pub submitted_by: UserId,
    pub vote_count: i64,
    pub has_voted: i64,
}

pub async fn find(
    conn: &mut SqliteConnection,
    track_id: &TrackId,
) -> Result<Option<InternalSong>, sqlx::Error> {
    debug!(track_id = track_id.as_str(), "Retrieving submitted song");
    sqlx::query_as::<_, InternalSong>(
        r#"
        SELECT TrackId AS track_id, TrackName AS track_name,
               SubmittedByUserId AS submitted_by, SubmittedAtUtc AS submitted_at
        FROM SubmittedSongs WHERE TrackId = ?
        "#,
    )
    .bind(track_id)
    .fetch_optional(conn)
    .await
}

pub async fn insert(conn: &mut SqliteConnection, song: &InternalSong) -> Result<(), sqlx::Error> {
    debug!(track_id = song.track_id.as_str(), "Inserting submitted song");
    sqlx::query(
        r#"
        INSERT INTO SubmittedSongs (TrackId, TrackName, SubmittedByUserId, SubmittedAtUtc)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&song.track_id)
    .bind(&song.track_name)
    .bind(&song.submitted_by)
    .bind(song.submitted_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Deletes the song together with its votes. Returns whether a row was removed.
pub async fn delete(conn: &mut SqliteConnection, track_id: &TrackId) -> Result<bool, sqlx::Error> {
    debug!(track_id = track_id.as_str(), "Deleting submitted song");
    let result = sqlx::query("DELETE FROM SubmittedSongs WHERE TrackId = ?")
        .bind(track_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Ranked tally: most votes first, then track name, then track id.
pub async fn tally(
    conn: &mut SqliteConnection,
    user_id: &UserId,
) -> Result<Vec<TallyRow>, sqlx::Error> {
    sqlx::query_as::<_, TallyRow>(
        r#"
        SELECT s.TrackId AS track_id, s.TrackName AS track_name,
               s.SubmittedByUserId AS submitted_by,
               COUNT(v.Id) AS vote_count,
               COALESCE(MAX(v.UserId = ?), 0) AS has_voted
        FROM SubmittedSongs s
        LEFT JOIN SongVotes v ON v.TrackId = s.TrackId
        GROUP BY s.TrackId, s.TrackName, s.SubmittedByUserId
        ORDER BY vote_count DESC, s.TrackName ASC, s.TrackId ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
}
