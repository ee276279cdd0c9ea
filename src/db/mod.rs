pub mod song;
pub mod user;
pub mod vote;

use sqlx::{
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use std::{str::FromStr, time::Duration};
use tracing::debug;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

pub async fn new_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let connect_options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));
    new_pool_with(connect_options, DEFAULT_MAX_CONNECTIONS).await
}

pub async fn new_pool_with(
    connect_options: SqliteConnectOptions,
    max_connections: u32,
) -> Result<SqlitePool, sqlx::Error> {
    // Cascading vote removal relies on the foreign key from SongVotes
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(connect_options.foreign_keys(true))
        .await
}

/// Applies the embedded migrations from `migrations/`.
pub async fn migrate(pool: &SqlitePool) -> Result<(), MigrateError> {
    debug!("Running database migrations");
    sqlx::migrate!().run(pool).await
}
