//! Service credentials for drive access on behalf of the application.
//!
//! Students never log in, so their uploads go through a Google service
//! account using the JWT bearer grant (RFC 7523).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::AccessToken;
use crate::config::ServiceAccountConfig;
use crate::{AppError, Result};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each signed assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens this close to expiry are replaced.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Source of access tokens for the application's own drive identity.
#[async_trait]
pub trait ServiceCredentials: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken>;
}

/// Fixed token, for the memory backend and tests.
pub struct StaticToken(AccessToken);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(AccessToken::new(token))
    }
}

#[async_trait]
impl ServiceCredentials for StaticToken {
    async fn access_token(&self) -> Result<AccessToken> {
        Ok(self.0.clone())
    }
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// The fields of a Google service account JSON key that matter here.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

struct CachedToken {
    token: AccessToken,
    expires_at: DateTime<Utc>,
}

/// Google service account.
pub struct ServiceAccount {
    client_email: String,
    token_uri: String,
    scope: String,
    key: EncodingKey,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccount {
    pub fn new(key: ServiceAccountKey, scopes: &[String], http: reqwest::Client) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| AppError::Config(format!("invalid service account private key: {e}")))?;

        Ok(Self {
            client_email: key.client_email,
            token_uri: key.token_uri,
            scope: scopes.join(" "),
            key: encoding_key,
            http,
            cached: Mutex::new(None),
        })
    }

    /// Parse a JSON key.
    pub fn from_json(json: &str, scopes: &[String], http: reqwest::Client) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(json)
            .map_err(|e| AppError::Config(format!("invalid service account key: {e}")))?;
        Self::new(key, scopes, http)
    }

    /// Build from configuration. `Ok(None)` when no key is configured.
    pub fn from_config(config: &ServiceAccountConfig, http: reqwest::Client) -> Result<Option<Self>> {
        if !config.key_json.is_empty() {
            return Self::from_json(&config.key_json, &config.scopes, http).map(Some);
        }
        if !config.key_path.is_empty() {
            let json = std::fs::read_to_string(&config.key_path)?;
            return Self::from_json(&json, &config.scopes, http).map(Some);
        }
        Ok(None)
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    /// Signed JWT asserting this account's identity.
    fn signed_assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| AppError::Auth(format!("failed to sign service account assertion: {e}")))
    }

    async fn request_token(&self) -> Result<CachedToken> {
        let now = Utc::now();
        let assertion = self.signed_assertion(now)?;

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("service token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "service token request returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("invalid service token response: {e}")))?;

        Ok(CachedToken {
            token: AccessToken::new(token.access_token),
            expires_at: now + Duration::seconds(token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS)),
        })
    }
}

#[async_trait]
impl ServiceCredentials for ServiceAccount {
    async fn access_token(&self) -> Result<AccessToken> {
        let mut cached = self.cached.lock().await;

        if let Some(current) = cached.as_ref() {
            if current.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > Utc::now() {
                return Ok(current.token.clone());
            }
        }

        let fresh = self.request_token().await?;
        tracing::debug!(account = %self.client_email, "Service account token issued");
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}
