//! Database layer
//!
//! This module handles database operations for:
//! - Organizations, members, teams and custom roles
//! - Organization invites and their state machine
//! - Counted resource tables consulted by license enforcement

pub mod invite_repository;
pub mod member_repository;
pub mod organization_repository;
pub mod resource_repository;

pub use invite_repository::InviteRepository;
pub use member_repository::{MemberCounts, MemberRepository};
pub use organization_repository::OrganizationRepository;
pub use resource_repository::CountingRepository;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};

/// Database connection pool type
pub type DbPool = Pool<Sqlite>;

/// Initialize the database connection pool
pub async fn init_pool(database_url: &str) -> Result<DbPool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Parse a timestamp stored as TEXT, tolerating both RFC3339 and the plain
/// SQLite datetime format.
pub(crate) fn parse_db_timestamp(ts: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S") {
        return DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc);
    }
    Utc::now()
}
