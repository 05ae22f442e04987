//! PostgreSQL review store and hotel catalog.
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
//! - `DB_MIN_CONNECTIONS`: Minimum idle connections (default: 2)
//! - `DB_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//! - `DB_IDLE_TIMEOUT_SECS`: Idle connection timeout (default: 300)
//! - `DB_MAX_LIFETIME_SECS`: Max connection lifetime (default: 1800)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;
use uuid::Uuid;

use super::{moderation_rejected, HotelCatalog, ReviewStore};
use crate::error::ReviewError;
use crate::types::{
    Hotel, HotelId, Rating, Review, ReviewDraft, ReviewId, ReviewListing, ReviewStatus, UserId,
};

/// Hotel catalog table.
pub const HOTEL_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS hotels (
    seq         BIGSERIAL,
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    location    TEXT NOT NULL DEFAULT ''
)
"#;

/// User directory table, read for author projections.
pub const USER_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id       TEXT PRIMARY KEY,
    username TEXT NOT NULL
)
"#;

/// Review table. `seq` preserves insertion order.
pub const REVIEW_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS reviews (
    seq          BIGSERIAL,
    id           UUID PRIMARY KEY,
    user_id      TEXT NOT NULL,
    hotel_id     TEXT NOT NULL,
    rating       SMALLINT NOT NULL CHECK (rating BETWEEN 1 AND 5),
    review_text  TEXT NOT NULL DEFAULT '',
    status       TEXT NOT NULL DEFAULT 'pending'
                 CHECK (status IN ('pending', 'approved', 'rejected')),
    response     TEXT,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
    moderated_at TIMESTAMPTZ
)
"#;

/// Index backing per-hotel listings.
pub const REVIEW_HOTEL_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS reviews_hotel_seq_idx ON reviews (hotel_id, seq)";

const REVIEW_COLUMNS: &str =
    "id, user_id, hotel_id, rating, review_text, status, response, created_at, moderated_at";

/// Configuration for PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum connections in pool (default: 10).
    pub max_connections: u32,
    /// Minimum idle connections to keep warm (default: 2).
    pub min_connections: u32,
    /// Connection acquire timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds (default: 300 = 5 min).
    pub idle_timeout_secs: u64,
    /// Maximum connection lifetime in seconds (default: 1800 = 30 min).
    pub max_lifetime_secs: u64,
}

impl PostgresConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` when `DATABASE_URL` is not set.
    pub fn from_env() -> Option<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty())?;
        Some(Self {
            database_url,
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: env_or("DB_MIN_CONNECTIONS", 2),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 300),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 1800),
        })
    }
}

fn env_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Error type for PostgreSQL store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Domain rule violation or corrupt row.
    #[error(transparent)]
    Review(#[from] ReviewError),
}

impl From<PostgresError> for ReviewError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Database(e) => {
                tracing::error!(error = %e, "review store query failed");
                ReviewError::Internal("storage unavailable".to_string())
            }
            PostgresError::Review(e) => e,
        }
    }
}

/// PostgreSQL review store.
#[derive(Clone)]
pub struct PostgresReviewStore {
    pool: PgPool,
}

impl PostgresReviewStore {
    /// Connect a new pool with the given configuration.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, sqlx::Error> {
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            max_lifetime_secs = config.max_lifetime_secs,
            "Initializing PostgreSQL connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        for statement in [
            HOTEL_TABLE_SCHEMA,
            USER_TABLE_SCHEMA,
            REVIEW_TABLE_SCHEMA,
            REVIEW_HOTEL_INDEX,
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Parse a review from a database row.
    fn parse_review_row(row: &sqlx::postgres::PgRow) -> Result<Review, PostgresError> {
        let id: Uuid = row.try_get("id")?;
        let rating: i16 = row.try_get("rating")?;
        let status: String = row.try_get("status")?;
        let status = ReviewStatus::from_str(&status)
            .ok_or_else(|| {
                ReviewError::Internal(format!("unknown review status in row {}: {}", id, status))
            })?;

        Ok(Review {
            id: ReviewId::new(id),
            user_id: UserId::new(row.try_get::<String, _>("user_id")?),
            hotel_id: HotelId::new(row.try_get::<String, _>("hotel_id")?),
            rating: Rating::new(rating as i64)?,
            review_text: row.try_get("review_text")?,
            status,
            response: row.try_get("response")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            moderated_at: row.try_get::<Option<DateTime<Utc>>, _>("moderated_at")?,
        })
    }

    async fn fetch(&self, id: &ReviewId) -> Result<Option<Review>, PostgresError> {
        let row = sqlx::query(&format!("SELECT {} FROM reviews WHERE id = $1", REVIEW_COLUMNS))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::parse_review_row).transpose()
    }
}

#[async_trait]
impl ReviewStore for PostgresReviewStore {
    type Error = PostgresError;

    async fn insert(&self, draft: ReviewDraft) -> Result<Review, Self::Error> {
        let mut valid = draft.validate()?;
        let author_name = valid.author_name.take();
        let review = Review::from_valid_draft(valid);

        let mut tx = self.pool.begin().await?;

        if let Some(name) = &author_name {
            sqlx::query(
                r#"
                INSERT INTO users (id, username) VALUES ($1, $2)
                ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username
                "#,
            )
            .bind(review.user_id.as_str())
            .bind(name)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO reviews (id, user_id, hotel_id, rating, review_text, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(review.id.as_uuid())
        .bind(review.user_id.as_str())
        .bind(review.hotel_id.as_str())
        .bind(review.rating.value() as i16)
        .bind(&review.review_text)
        .bind(review.status.as_str())
        .bind(review.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(review)
    }

    async fn get(&self, id: &ReviewId) -> Result<Option<Review>, Self::Error> {
        self.fetch(id).await
    }

    async fn list_by_hotel(&self, hotel_id: &HotelId) -> Result<Vec<ReviewListing>, Self::Error> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.user_id, r.hotel_id, r.rating, r.review_text, r.status,
                   r.response, r.created_at, r.moderated_at, u.username
            FROM reviews r
            LEFT JOIN users u ON u.id = r.user_id
            WHERE r.hotel_id = $1
            ORDER BY r.seq
            "#,
        )
        .bind(hotel_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ReviewListing, PostgresError> {
                let username: Option<String> = row.try_get("username")?;
                Ok(ReviewListing::new(Self::parse_review_row(row)?, username))
            })
            .collect()
    }

    async fn ratings_by_hotel(
        &self,
        hotel_id: &HotelId,
    ) -> Result<Vec<(Rating, ReviewStatus)>, Self::Error> {
        let rows = sqlx::query(
            r#"
            SELECT rating, status
            FROM reviews
            WHERE hotel_id = $1
            ORDER BY seq
            "#,
        )
        .bind(hotel_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<(Rating, ReviewStatus), PostgresError> {
                let rating: i16 = row.try_get("rating")?;
                let status: String = row.try_get("status")?;
                let status = ReviewStatus::from_str(&status).ok_or_else(|| {
                    ReviewError::Internal(format!("unknown review status: {}", status))
                })?;
                Ok((Rating::new(rating as i64)?, status))
            })
            .collect()
    }

    async fn set_moderation(
        &self,
        id: &ReviewId,
        status: ReviewStatus,
        response: Option<String>,
    ) -> Result<Review, Self::Error> {
        if !status.is_terminal() {
            let current = self.fetch(id).await?.map(|r| r.status);
            return Err(moderation_rejected(id, current, status).into());
        }

        let row = sqlx::query(&format!(
            r#"
            UPDATE reviews
            SET status = $2, response = $3, moderated_at = now()
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            REVIEW_COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(status.as_str())
        .bind(response)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Self::parse_review_row(r),
            None => {
                let current = self.fetch(id).await?.map(|r| r.status);
                Err(moderation_rejected(id, current, status).into())
            }
        }
    }

    async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

/// PostgreSQL hotel catalog sharing the review store's pool.
#[derive(Clone)]
pub struct PostgresHotelCatalog {
    pool: PgPool,
}

impl PostgresHotelCatalog {
    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    fn parse_hotel_row(row: &sqlx::postgres::PgRow) -> Result<Hotel, sqlx::Error> {
        Ok(Hotel::new(
            HotelId::new(row.try_get::<String, _>("id")?),
            row.try_get::<String, _>("name")?,
            row.try_get::<String, _>("description")?,
            row.try_get::<String, _>("location")?,
        ))
    }
}

fn catalog_error(e: sqlx::Error) -> ReviewError {
    PostgresError::Database(e).into()
}

#[async_trait]
impl HotelCatalog for PostgresHotelCatalog {
    async fn get(&self, id: &HotelId) -> Result<Option<Hotel>, ReviewError> {
        let row = sqlx::query("SELECT id, name, description, location FROM hotels WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(catalog_error)?;

        row.as_ref()
            .map(Self::parse_hotel_row)
            .transpose()
            .map_err(catalog_error)
    }

    async fn list(&self) -> Result<Vec<Hotel>, ReviewError> {
        let rows = sqlx::query("SELECT id, name, description, location FROM hotels ORDER BY seq")
            .fetch_all(&self.pool)
            .await
            .map_err(catalog_error)?;

        rows.iter()
            .map(Self::parse_hotel_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(catalog_error)
    }

    async fn seed_if_empty(&self, hotels: Vec<Hotel>) -> Result<usize, ReviewError> {
        let mut tx = self.pool.begin().await.map_err(catalog_error)?;

        // Serialize concurrent seeders.
        sqlx::query("LOCK TABLE hotels IN EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .map_err(catalog_error)?;

        let existing: i64 = sqlx::query("SELECT COUNT(*) AS n FROM hotels")
            .fetch_one(&mut *tx)
            .await
            .and_then(|row| row.try_get("n"))
            .map_err(catalog_error)?;
        if existing > 0 {
            return Ok(0);
        }

        for hotel in &hotels {
            sqlx::query(
                "INSERT INTO hotels (id, name, description, location) VALUES ($1, $2, $3, $4)",
            )
            .bind(hotel.id.as_str())
            .bind(&hotel.name)
            .bind(&hotel.description)
            .bind(&hotel.location)
            .execute(&mut *tx)
            .await
            .map_err(catalog_error)?;
        }

        tx.commit().await.map_err(catalog_error)?;
        Ok(hotels.len())
    }
}
