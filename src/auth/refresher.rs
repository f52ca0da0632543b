//! Just-in-time access tokens for teacher drive operations.

use std::sync::Arc;

use super::{AccessToken, IdentityProvider};
use crate::db::{CredentialRepository, Database};
use crate::{AppError, Result};

/// Exchanges a teacher's stored refresh credential for an access token.
///
/// Called right before each privileged drive operation. Nothing is cached and
/// a failed refresh is never retried.
#[derive(Clone)]
pub struct TokenRefresher {
    db: Database,
    provider: Arc<dyn IdentityProvider>,
}

impl TokenRefresher {
    pub fn new(db: Database, provider: Arc<dyn IdentityProvider>) -> Self {
        Self { db, provider }
    }

    /// Fresh access token for `email`.
    ///
    /// Returns [`AppError::ReauthenticationRequired`] when no refresh credential
    /// is stored or the provider rejects it.
    pub async fn access_token_for(&self, email: &str) -> Result<AccessToken> {
        let refresh_token = CredentialRepository::new(self.db.pool())
            .get(email)
            .await?
            .ok_or_else(|| {
                AppError::ReauthenticationRequired(format!("no refresh credential for {email}"))
            })?;

        match self.provider.refresh_access_token(&refresh_token).await {
            Ok(token) => {
                tracing::debug!(email, "Access token refreshed");
                Ok(token)
            }
            Err(e) => {
                tracing::warn!(email, error = %e, "Access token refresh failed");
                Err(e)
            }
        }
    }
}
