#![allow(dead_code)]

use breadcharts_server::{
    config::VotingConfig,
    db::{self, song::TrackId, user::UserId},
    managers::voting::VotingManager,
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::{str::FromStr, time::Duration};

/// Fresh in-memory database with all migrations applied.
pub struct IntegrationTestDb {
    pool: SqlitePool,
}

impl IntegrationTestDb {
    pub async fn new() -> Self {
        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        // Every connection to :memory: is its own database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(connect_options)
            .await
            .unwrap();
        db::migrate(&pool).await.unwrap();
        Self { pool }
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    pub fn manager(&self, max_votes_per_user: i64) -> VotingManager {
        VotingManager::new(self.pool(), VotingConfig::new(max_votes_per_user))
    }

    pub async fn song_rows(&self, track_id: &str) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM SubmittedSongs WHERE TrackId = ?")
            .bind(track_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn vote_rows(&self, track_id: &str) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM SongVotes WHERE TrackId = ?")
            .bind(track_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

pub fn user(id: &str) -> UserId {
    UserId::from(id)
}

pub fn track(id: &str) -> TrackId {
    TrackId::from(id)
}
