// SQLite connection pool: creates the database file when missing, switches
// to WAL so both loops can write, and brings the schema up to date.

use sqlx::{migrate::MigrateDatabase, Pool, Sqlite, SqlitePool};
use crate::db::migration;

pub async fn establish_connection(database_url: &str) -> Result<Pool<Sqlite>, sqlx::Error> {
    // Create database if it doesn't exist
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        Sqlite::create_database(database_url).await?;
    }

    // Create connection pool
    let pool = SqlitePool::connect(database_url).await?;

    // Enable WAL mode for better concurrency
    sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;

    migration::run_migrations(&pool).await?;

    Ok(pool)
}
