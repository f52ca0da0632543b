//! Session persistence.
//!
//! Session state is stored as an opaque JSON blob; the typed view lives in
//! `auth::session`.

use super::DbPool;
use crate::Result;

/// A stored session row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRecord {
    pub id: String,
    pub data: String,
    /// Expiry as unix seconds.
    pub expires_at: i64,
}

/// Repository for sessions.
pub struct SessionRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Load a session that has not expired at `now`.
    pub async fn get_valid(&self, id: &str, now: i64) -> Result<Option<SessionRecord>> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT id, data, expires_at FROM sessions WHERE id = $1 AND expires_at > $2",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| crate::AppError::Database(e.to_string()))?;

        Ok(record)
    }

    /// Insert or replace a session.
    pub async fn upsert(&self, id: &str, data: &str, expires_at: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (id, data, expires_at, updated_at)
             VALUES ($1, $2, $3, datetime('now'))
             ON CONFLICT(id) DO UPDATE SET
                data = excluded.data,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at",
        )
        .bind(id)
        .bind(data)
        .bind(expires_at)
        .execute(self.pool)
        .await
        .map_err(|e| crate::AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Delete a session. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| crate::AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete sessions that expired at or before `now`.
    pub async fn cleanup_expired(&self, now: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(self.pool)
            .await
            .map_err(|e| crate::AppError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
