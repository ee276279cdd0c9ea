//! Song submission poll: submissions, votes and the ranked tally.
//!
//! Every mutating operation runs in a single transaction. Dropping the
//! returned future before it resolves rolls the transaction back, so an
//! abandoned operation never leaves partial state behind.

use crate::config::VotingConfig;
use crate::db::{
    song::{self, InternalSong, TrackId},
    user::UserId,
    vote,
};
use chrono::Utc;
use color_eyre::eyre::Report;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, instrument};

const NOT_AUTHENTICATED: &str = "Not authenticated";
const INVALID_TRACK: &str = "Invalid track";
const SONG_NOT_FOUND: &str = "Song not found";
const ALREADY_VOTED: &str = "Already voted";
const NOT_VOTED: &str = "Not voted";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedSongView {
    pub track_id: TrackId,
    pub track_name: String,
    pub submitted_by_user_id: UserId,
    pub vote_count: u32,
    pub has_voted: bool,
}

impl From<song::TallyRow> for SubmittedSongView {
    fn from(row: song::TallyRow) -> Self {
        Self {
            track_id: row.track_id,
            track_name: row.track_name,
            submitted_by_user_id: row.submitted_by,
            vote_count: to_u32(row.vote_count),
            has_voted: row.has_voted != 0,
        }
    }
}

/// Result of a voting operation as shown to the user.
///
/// `changed` is set whenever the operation persisted something, which is
/// what observers of the tally need to hear about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub ok: bool,
    pub message: String,
    pub changed: bool,
}

impl Outcome {
    fn changed(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            changed: true,
        }
    }

    fn unchanged(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            changed: false,
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            changed: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteQuota {
    pub used: u32,
    pub max: u32,
}

#[derive(Clone, Debug)]
pub struct VotingManager {
    pool: SqlitePool,
    config: VotingConfig,
}

impl VotingManager {
    pub fn new(pool: SqlitePool, config: VotingConfig) -> Self {
        Self { pool, config }
    }

    pub fn max_votes_per_user(&self) -> u32 {
        self.config.max_votes_per_user()
    }

    /// All submissions, most voted first and ties ordered by track name.
    #[instrument(skip(self))]
    pub async fn submissions(&self, user_id: &UserId) -> Result<Vec<SubmittedSongView>, Report> {
        let mut conn = self.pool.acquire().await?;
        let rows = song::tally(&mut conn, user_id).await?;
        debug!("Tally has {} submissions", rows.len());
        Ok(rows.into_iter().map(SubmittedSongView::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn quota(&self, user_id: &UserId) -> Result<VoteQuota, Report> {
        let mut conn = self.pool.acquire().await?;
        let used = vote::count_by_user(&mut conn, user_id).await?;
        Ok(VoteQuota {
            used: to_u32(used),
            max: self.max_votes_per_user(),
        })
    }

    /// Submits a track. Submitting is never blocked by the vote cap, only
    /// the submitter's vote that normally comes with it.
    #[instrument(skip(self))]
    pub async fn submit(
        &self,
        user_id: &UserId,
        track_id: &TrackId,
        track_name: &str,
    ) -> Result<Outcome, Report> {
        if user_id.is_blank() || user_id.is_too_long() {
            return Ok(Outcome::rejected(NOT_AUTHENTICATED));
        }
        if track_id.is_blank()
            || track_id.is_too_long()
            || track_name.chars().count() > song::MAX_TRACK_NAME_LEN
        {
            return Ok(Outcome::rejected(INVALID_TRACK));
        }
        let max = self.max_votes_per_user();
        let mut tx = self.pool.begin().await?;

        let outcome = if song::find(&mut tx, track_id).await?.is_some() {
            if vote::find(&mut tx, track_id, user_id).await?.is_some() {
                Outcome::unchanged("Already submitted and you have already voted")
            } else if vote::count_by_user(&mut tx, user_id).await? >= i64::from(max) {
                Outcome::unchanged(format!(
                    "Song already submitted. Vote not added because you have reached the maximum of {} votes.",
                    max
                ))
            } else if add_vote(&mut tx, track_id, user_id).await? {
                Outcome::changed("Song already submitted. Your vote has been added.")
            } else {
                Outcome::unchanged("Already submitted and you have already voted")
            }
        } else {
            song::insert(
                &mut tx,
                &InternalSong {
                    track_id: track_id.clone(),
                    track_name: track_name.to_owned(),
                    submitted_by: user_id.clone(),
                    submitted_at: Utc::now(),
                },
            )
            .await?;
            let used = vote::count_by_user(&mut tx, user_id).await?;
            if used < i64::from(max) && add_vote(&mut tx, track_id, user_id).await? {
                Outcome::changed("Song submitted and your vote has been added.")
            } else {
                Outcome::changed(format!(
                    "Song submitted. You have already used {} of {} votes, so your vote was not added.",
                    used, max
                ))
            }
        };

        tx.commit().await?;
        info!(ok = outcome.ok, changed = outcome.changed, "{}", outcome.message);
        Ok(outcome)
    }

    #[instrument(skip(self))]
    pub async fn vote(&self, user_id: &UserId, track_id: &TrackId) -> Result<Outcome, Report> {
        if user_id.is_blank() || user_id.is_too_long() {
            return Ok(Outcome::rejected(NOT_AUTHENTICATED));
        }
        let max = self.max_votes_per_user();
        let mut tx = self.pool.begin().await?;

        let outcome = if song::find(&mut tx, track_id).await?.is_none() {
            Outcome::rejected(SONG_NOT_FOUND)
        } else if vote::count_by_user(&mut tx, user_id).await? >= i64::from(max) {
            Outcome::rejected(format!("You have reached the maximum of {} votes.", max))
        } else if vote::find(&mut tx, track_id, user_id).await?.is_some() {
            Outcome::unchanged(ALREADY_VOTED)
        } else if add_vote(&mut tx, track_id, user_id).await? {
            Outcome::changed("Voted")
        } else {
            Outcome::unchanged(ALREADY_VOTED)
        };

        tx.commit().await?;
        info!(ok = outcome.ok, changed = outcome.changed, "{}", outcome.message);
        Ok(outcome)
    }

    /// Retracts a vote. The submission goes away together with its last vote.
    #[instrument(skip(self))]
    pub async fn unvote(&self, user_id: &UserId, track_id: &TrackId) -> Result<Outcome, Report> {
        if user_id.is_blank() || user_id.is_too_long() {
            return Ok(Outcome::rejected(NOT_AUTHENTICATED));
        }
        let mut tx = self.pool.begin().await?;

        let existing = match vote::find(&mut tx, track_id, user_id).await? {
            Some(existing) => existing,
            None => return Ok(Outcome::unchanged(NOT_VOTED)),
        };
        vote::delete(&mut tx, existing.id).await?;

        let outcome = if vote::count_for_track(&mut tx, track_id).await? == 0
            && song::delete(&mut tx, track_id).await?
        {
            Outcome::changed("Unvoted and removed submission (no remaining votes)")
        } else {
            Outcome::changed("Unvoted")
        };

        tx.commit().await?;
        info!(ok = outcome.ok, changed = outcome.changed, "{}", outcome.message);
        Ok(outcome)
    }
}

/// Inserts a vote, reporting `false` when the unique (track, user) index
/// shows the vote already exists.
async fn add_vote(
    conn: &mut SqliteConnection,
    track_id: &TrackId,
    user_id: &UserId,
) -> Result<bool, sqlx::Error> {
    match vote::insert(conn, track_id, user_id, Utc::now()).await {
        Ok(_) => Ok(true),
        Err(err) if vote::is_unique_violation(&err) => {
            debug!("Vote already present according to unique index");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

fn to_u32(count: i64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}
