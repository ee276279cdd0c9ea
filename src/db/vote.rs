use super::{song::TrackId, user::UserId};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, sqlx::Type)]
#[sqlx(transparent)]
pub struct VoteId(pub i64);

#[derive(Clone, PartialEq, Eq, Debug, sqlx::FromRow)]
pub struct InternalVote {
    pub id: VoteId,
    pub track_id: TrackId,
    pub user_id: UserId,
    pub voted_at: DateTime<Utc>,
}

pub async fn find(
    conn: &mut SqliteConnection,
    track_id: &TrackId,
    user_id: &UserId,
) -> Result<Option<InternalVote>, sqlx::Error> {
    sqlx::query_as::<_, InternalVote>(
        r#"
        SELECT Id AS id, TrackId AS track_id, UserId AS user_id, VotedAtUtc AS voted_at
        FROM SongVotes WHERE TrackId = ? AND UserId = ?
        "#,
    )
    .bind(track_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await
}

pub async fn insert(
    conn: &mut SqliteConnection,
    track_id: &TrackId,
    user_id: &UserId,
    voted_at: DateTime<Utc>,
) -> Result<VoteId, sqlx::Error> {
    debug!(
        track_id = track_id.as_str(),
        user_id = user_id.as_str(),
        "Inserting vote"
    );
    let result = sqlx::query("INSERT INTO SongVotes (TrackId, UserId, VotedAtUtc) VALUES (?, ?, ?)")
        .bind(track_id)
        .bind(user_id)
        .bind(voted_at)
        .execute(conn)
        .await?;
    Ok(VoteId(result.last_insert_rowid()))
}

pub async fn delete(conn: &mut SqliteConnection, vote_id: VoteId) -> Result<(), sqlx::Error> {
    debug!(id = vote_id.0, "Deleting vote");
    sqlx::query("DELETE FROM SongVotes WHERE Id = ?")
        .bind(vote_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Number of votes the user currently holds across all songs.
pub async fn count_by_user(
    conn: &mut SqliteConnection,
    user_id: &UserId,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM SongVotes WHERE UserId = ?")
        .bind(user_id)
        .fetch_one(conn)
        .await
}

pub async fn count_for_track(
    conn: &mut SqliteConnection,
    track_id: &TrackId,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM SongVotes WHERE TrackId = ?")
        .bind(track_id)
        .fetch_one(conn)
        .await
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
