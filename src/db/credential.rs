//! Refresh credential store.
//!
//! One long-lived refresh token per teacher email. Absence is a normal state.

use super::DbPool;
use crate::Result;

/// Repository for refresh credentials.
pub struct CredentialRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> CredentialRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Store the refresh token for `email`, replacing any previous one.
    pub async fn save(&self, email: &str, refresh_token: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO refresh_credentials (email, refresh_token, updated_at)
             VALUES ($1, $2, datetime('now'))
             ON CONFLICT(email) DO UPDATE SET
                refresh_token = excluded.refresh_token,
                updated_at = excluded.updated_at",
        )
        .bind(email)
        .bind(refresh_token)
        .execute(self.pool)
        .await
        .map_err(|e| crate::AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Get the refresh token for `email`.
    pub async fn get(&self, email: &str) -> Result<Option<String>> {
        let token = sqlx::query_scalar::<_, String>(
            "SELECT refresh_token FROM refresh_credentials WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| crate::AppError::Database(e.to_string()))?;

        Ok(token)
    }

    /// Remove the refresh token for `email`. Returns whether one existed.
    pub async fn delete(&self, email: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM refresh_credentials WHERE email = $1")
            .bind(email)
            .execute(self.pool)
            .await
            .map_err(|e| crate::AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
