use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;

use crate::models::{UserId, UserProfile};
use crate::services::cache::ProfileCache;

/// Errors surfaced by a profile store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("profile not found: {0}")]
    NotFound(UserId),

    #[error("profile store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Candidate pool query: the waiting users the engine wants profiles for.
/// The store drops banned users and the requester itself; the remaining
/// eligibility predicates are re-applied by the matchmaker.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    pub candidate_ids: Vec<UserId>,
    pub exclude: UserId,
}

/// Contract the matching engine requires from the profile store.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, id: UserId) -> Result<UserProfile, StoreError>;

    async fn query_candidates(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<UserProfile>, StoreError>;

    async fn update_reputation(&self, id: UserId, delta: i32) -> Result<(), StoreError>;

    /// Increment the report counter and return the new value.
    async fn increment_report_count(&self, id: UserId) -> Result<i32, StoreError>;

    async fn set_banned(&self, id: UserId) -> Result<(), StoreError>;

    async fn set_online(&self, id: UserId, online: bool) -> Result<(), StoreError>;

    async fn set_last_partner(&self, id: UserId, partner: UserId) -> Result<(), StoreError>;

    async fn append_blocked(&self, id: UserId, blocked: UserId) -> Result<(), StoreError>;

    async fn insert_report(
        &self,
        reporter: UserId,
        reported: UserId,
        reason: &str,
    ) -> Result<(), StoreError>;

    async fn mark_safety_notice_sent(&self, id: UserId) -> Result<(), StoreError>;

    /// Move every stored score one step toward zero; returns rows touched.
    async fn decay_reputation_step(&self) -> Result<u64, StoreError>;
}

const PROFILE_COLUMNS: &str = "user_id, gender, city, interests, is_banned, is_online, \
     blocked_users, report_count, reputation_score, premium_until, last_partner_id, \
     safety_notice_sent, created_at";

/// PostgreSQL-backed profile store with a moka L1 cache for point reads.
///
/// Candidate pool queries bypass the cache: matching decisions are made on
/// fresh rows. Every per-user write invalidates that user's cache entry.
pub struct PostgresProfileStore {
    pool: PgPool,
    cache: ProfileCache,
}

impl PostgresProfileStore {
    /// Connect, run migrations, and build the store.
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        cache: ProfileCache,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self { pool, cache })
    }

    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        cache: ProfileCache,
    ) -> Result<Self, StoreError> {
        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            cache,
        )
        .await
    }

    /// Health check for the database connection.
    pub async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }

    fn profile_from_row(row: &PgRow) -> Result<UserProfile, sqlx::Error> {
        Ok(UserProfile {
            user_id: row.try_get("user_id")?,
            gender: row.try_get("gender")?,
            city: row.try_get("city")?,
            interests: row.try_get("interests")?,
            is_banned: row.try_get("is_banned")?,
            is_online: row.try_get("is_online")?,
            blocked_users: row.try_get("blocked_users")?,
            report_count: row.try_get("report_count")?,
            reputation_score: row.try_get("reputation_score")?,
            premium_until: row.try_get("premium_until")?,
            last_partner_id: row.try_get("last_partner_id")?,
            safety_notice_sent: row.try_get("safety_notice_sent")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl ProfileStore for PostgresProfileStore {
    async fn get_profile(&self, id: UserId) -> Result<UserProfile, StoreError> {
        if let Some(profile) = self.cache.get(id).await {
            return Ok(profile);
        }

        let query = format!("SELECT {PROFILE_COLUMNS} FROM users WHERE user_id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        let profile = Self::profile_from_row(&row)?;
        self.cache.insert(profile.clone()).await;

        Ok(profile)
    }

    async fn query_candidates(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<UserProfile>, StoreError> {
        if filter.candidate_ids.is_empty() {
            return Ok(vec![]);
        }

        let query = format!(
            "SELECT {PROFILE_COLUMNS} FROM users \
             WHERE user_id = ANY($1) AND user_id <> $2 AND is_banned = FALSE"
        );
        let rows = sqlx::query(&query)
            .bind(&filter.candidate_ids)
            .bind(filter.exclude)
            .fetch_all(&self.pool)
            .await?;

        let profiles = rows
            .iter()
            .map(Self::profile_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            "candidate query returned {} of {} waiting users",
            profiles.len(),
            filter.candidate_ids.len()
        );

        Ok(profiles)
    }

    async fn update_reputation(&self, id: UserId, delta: i32) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET reputation_score = reputation_score + $2 WHERE user_id = $1")
            .bind(id)
            .bind(delta)
            .execute(&self.pool)
            .await?;

        self.cache.invalidate(id).await;
        tracing::debug!("reputation {} {:+}", id, delta);
        Ok(())
    }

    async fn increment_report_count(&self, id: UserId) -> Result<i32, StoreError> {
        let row = sqlx::query(
            "UPDATE users SET report_count = report_count + 1 \
             WHERE user_id = $1 RETURNING report_count",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))?;

        self.cache.invalidate(id).await;
        let count: i32 = row.try_get("report_count").map_err(StoreError::from)?;
        Ok(count)
    }

    async fn set_banned(&self, id: UserId) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET is_banned = TRUE WHERE user_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.cache.invalidate(id).await;
        tracing::info!("user {} banned", id);
        Ok(())
    }

    async fn set_online(&self, id: UserId, online: bool) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET is_online = $2 WHERE user_id = $1")
            .bind(id)
            .bind(online)
            .execute(&self.pool)
            .await?;

        self.cache.invalidate(id).await;
        Ok(())
    }

    async fn set_last_partner(&self, id: UserId, partner: UserId) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET last_partner_id = $2 WHERE user_id = $1")
            .bind(id)
            .bind(partner)
            .execute(&self.pool)
            .await?;

        self.cache.invalidate(id).await;
        Ok(())
    }

    async fn append_blocked(&self, id: UserId, blocked: UserId) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET blocked_users = array_append(blocked_users, $2) \
             WHERE user_id = $1 AND NOT ($2 = ANY(blocked_users))",
        )
        .bind(id)
        .bind(blocked)
        .execute(&self.pool)
        .await?;

        self.cache.invalidate(id).await;
        Ok(())
    }

    async fn insert_report(
        &self,
        reporter: UserId,
        reported: UserId,
        reason: &str,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO reports (reporter_id, reported_id, reason) VALUES ($1, $2, $3)")
            .bind(reporter)
            .bind(reported)
            .bind(reason)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn mark_safety_notice_sent(&self, id: UserId) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET safety_notice_sent = TRUE WHERE user_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.cache.invalidate(id).await;
        Ok(())
    }

    async fn decay_reputation_step(&self) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let positive = sqlx::query(
            "UPDATE users SET reputation_score = reputation_score - 1 WHERE reputation_score > 0",
        )
        .execute(&mut *tx)
        .await?;

        let negative = sqlx::query(
            "UPDATE users SET reputation_score = reputation_score + 1 WHERE reputation_score < 0",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.cache.invalidate_all();

        let touched = positive.rows_affected() + negative.rows_affected();
        tracing::info!("reputation decay sweep touched {} profiles", touched);
        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_from_sqlx() {
        let err: StoreError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn test_empty_candidate_filter_shape() {
        let filter = CandidateFilter { candidate_ids: vec![], exclude: 1 };
        assert!(filter.candidate_ids.is_empty());
    }
}
